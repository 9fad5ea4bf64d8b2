//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router with the relay and health handlers
//! - Wire up middleware (request ID, tracing)
//! - Serve on a bound listener until shutdown

use axum::{
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::http::request::request_id_layers;
use crate::lifecycle::ShutdownSignal;
use crate::relay::Relay;

/// Application state injected into handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub relay: Relay,
    pub shutdown: ShutdownSignal,
}

/// HTTP front end for the queue-paired relay.
pub struct HttpServer {
    router: Router,
    shutdown: ShutdownSignal,
}

impl HttpServer {
    /// Create a server over `relay`. Waiting consumers are released and the
    /// server stops accepting once `shutdown` fires.
    pub fn new(relay: Relay, shutdown: ShutdownSignal) -> Self {
        let state = AppState {
            relay,
            shutdown: shutdown.clone(),
        };
        Self {
            router: Self::build_router(state),
            shutdown,
        }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// No request timeout is applied: relay bodies are unbounded streams.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route(
                "/compressions",
                get(handlers::consume).put(handlers::produce),
            )
            .route("/_health", get(handlers::health))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
            .layer(request_id_layers())
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Returns after shutdown once in-flight transfers have completed.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(self.shutdown.recv())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}
