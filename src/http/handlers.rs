//! Request handlers.
//!
//! - `PUT /compressions`: the request body is a producer. The response is
//!   sent once the body has been drained into an admitted stream.
//! - `GET /compressions`: the caller is a consumer. The response body is the
//!   compressed stream of the oldest waiting producer.
//! - `GET /_health`: queue and transfer counters.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures_util::TryStreamExt;
use serde::Serialize;
use tokio_util::io::StreamReader;

use crate::http::request::request_id;
use crate::http::server::AppState;

/// Content type of every compressed response body.
pub const ZSTD_CONTENT_TYPE: &str = "application/zstd";

/// Header naming the transfer a consumer was paired with.
pub const X_TRANSFER_ID: &str = "x-transfer-id";

/// Drain the request body through the encoder into a newly admitted stream.
pub async fn produce(State(state): State<AppState>, headers: HeaderMap, body: Body) -> Response {
    let request_id = request_id(&headers).to_owned();
    let source = StreamReader::new(body.into_data_stream().map_err(std::io::Error::other));

    match state.relay.intake().accept(source).await {
        Ok(stats) => {
            tracing::debug!(
                request_id = %request_id,
                bytes_in = stats.bytes_in,
                bytes_out = stats.bytes_out,
                "Producer drained"
            );
            StatusCode::OK.into_response()
        }
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Producer failed");
            e.into_response()
        }
    }
}

/// Claim the next admitted stream and relay it as the response body.
pub async fn consume(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let request_id = request_id(&headers).to_owned();

    match state.relay.dispatch().claim(state.shutdown.clone().recv()).await {
        Ok(claimed) => {
            let id = claimed.id();
            tracing::debug!(request_id = %request_id, transfer_id = %id, "Consumer paired");
            (
                [
                    (header::CONTENT_TYPE, ZSTD_CONTENT_TYPE.to_string()),
                    (header::HeaderName::from_static(X_TRANSFER_ID), id.to_string()),
                ],
                Body::from_stream(claimed.into_stream()),
            )
                .into_response()
        }
        Err(_cancelled) => {
            tracing::debug!(request_id = %request_id, "Consumer released by shutdown");
            (StatusCode::SERVICE_UNAVAILABLE, "server is shutting down").into_response()
        }
    }
}

/// Body of `GET /_health`.
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub queued: usize,
    pub queue_capacity: usize,
    pub active_transfers: u64,
}

/// Report queue depth and activity; 503 while draining.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthStatus>) {
    let draining = state.shutdown.is_triggered();
    let queue = state.relay.queue();
    let body = HealthStatus {
        status: if draining { "draining" } else { "ok" },
        version: env!("CARGO_PKG_VERSION"),
        queued: queue.len(),
        queue_capacity: queue.capacity(),
        active_transfers: state.relay.tracker().active_count(),
    };
    let status = if draining {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (status, Json(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelayConfig;
    use crate::http::HttpServer;
    use crate::lifecycle::Shutdown;
    use crate::relay::Relay;
    use axum::http::Request;
    use axum::Router;
    use tower::ServiceExt;

    fn app(capacity: usize, shutdown: &Shutdown) -> Router {
        let mut config = RelayConfig::default();
        config.relay.queue_capacity = capacity;
        HttpServer::new(Relay::from_config(&config), shutdown.subscribe()).router()
    }

    fn put(body: &'static [u8]) -> Request<Body> {
        Request::put("/compressions").body(Body::from(body)).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let shutdown = Shutdown::new();
        let app = app(1, &shutdown);

        let put_response = app.clone().oneshot(put(b"hello world")).await.unwrap();
        assert_eq!(put_response.status(), StatusCode::OK);

        let response = app.oneshot(get("/compressions")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], ZSTD_CONTENT_TYPE);
        assert!(response.headers().contains_key(X_TRANSFER_ID));
        let compressed = body_bytes(response).await;
        assert_eq!(zstd::stream::decode_all(&compressed[..]).unwrap(), b"hello world");
    }

    #[tokio::test]
    async fn full_queue_reports_overwhelmed() {
        let shutdown = Shutdown::new();
        let app = app(1, &shutdown);

        assert_eq!(app.clone().oneshot(put(b"one")).await.unwrap().status(), StatusCode::OK);
        let response = app.oneshot(put(b"two")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_bytes(response).await, b"server is overwhelmed");
    }

    #[tokio::test]
    async fn empty_body_yields_valid_empty_frame() {
        let shutdown = Shutdown::new();
        let app = app(1, &shutdown);

        assert_eq!(app.clone().oneshot(put(b"")).await.unwrap().status(), StatusCode::OK);
        let compressed = body_bytes(app.oneshot(get("/compressions")).await.unwrap()).await;
        assert!(!compressed.is_empty());
        assert!(zstd::stream::decode_all(&compressed[..]).unwrap().is_empty());
    }

    #[tokio::test]
    async fn shutdown_releases_waiting_consumer() {
        let shutdown = Shutdown::new();
        let app = app(1, &shutdown);

        let waiting = tokio::spawn(app.oneshot(get("/compressions")));
        tokio::task::yield_now().await;
        shutdown.trigger();

        let response = waiting.await.unwrap().unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_bytes(response).await, b"server is shutting down");
    }

    #[tokio::test]
    async fn health_reports_queue_depth() {
        let shutdown = Shutdown::new();
        let app = app(3, &shutdown);
        app.clone().oneshot(put(b"queued")).await.unwrap();

        let response = app.oneshot(get("/_health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["queued"], 1);
        assert_eq!(body["queue_capacity"], 3);
    }

    #[tokio::test]
    async fn health_reports_draining() {
        let shutdown = Shutdown::new();
        let app = app(1, &shutdown);
        shutdown.trigger();

        let response = app.oneshot(get("/_health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body["status"], "draining");
    }
}
