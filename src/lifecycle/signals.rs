//! OS signal handling.
//!
//! # Responsibilities
//! - Wait for SIGINT (Ctrl+C) and, on Unix, SIGTERM
//! - First signal triggers graceful shutdown
//! - Second signal or the drain deadline forces exit

use std::time::Duration;

use crate::lifecycle::Shutdown;

/// Wait for the next termination signal.
pub async fn terminate_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

/// Trigger `shutdown` on the first signal, then return once draining must
/// stop: on a second signal or after `drain_timeout`.
pub async fn watch_signals(shutdown: &Shutdown, drain_timeout: Duration) {
    terminate_signal().await;
    tracing::info!(
        drain_timeout_secs = drain_timeout.as_secs(),
        "Shutdown signal received, draining"
    );
    shutdown.trigger();

    tokio::select! {
        () = terminate_signal() => tracing::warn!("Second signal received, forcing exit"),
        () = tokio::time::sleep(drain_timeout) => tracing::warn!("Drain deadline reached, forcing exit"),
    }
}
