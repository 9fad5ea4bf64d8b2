//! End-to-end tests for the queue-paired relay over HTTP.

use std::time::Duration;

use reqwest::StatusCode;

mod common;
use common::{decode, noise, TestRelay};

#[tokio::test]
async fn single_slot_queue_scenario() {
    let relay = TestRelay::start(1).await;

    let response = relay.put("hello world").await;
    assert_eq!(response.status(), StatusCode::OK);

    // The slot is taken until a consumer claims the stream.
    let response = relay.put("rejected").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.text().await.unwrap(), "server is overwhelmed");

    assert_eq!(relay.get_decoded().await, b"hello world");

    // Claiming frees the slot.
    assert_eq!(relay.put("again").await.status(), StatusCode::OK);
    assert_eq!(relay.get_decoded().await, b"again");
}

#[tokio::test]
async fn capacity_bounds_waiting_producers() {
    let relay = TestRelay::start(3).await;

    for i in 0..3 {
        assert_eq!(relay.put(format!("stream {i}")).await.status(), StatusCode::OK);
    }
    assert_eq!(
        relay.put("one too many").await.status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );

    relay.get_decoded().await;
    assert_eq!(relay.put("fits now").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn consumers_are_served_in_admission_order() {
    let relay = TestRelay::start(4).await;
    for name in ["alpha", "beta", "gamma"] {
        assert_eq!(relay.put(name).await.status(), StatusCode::OK);
    }

    for expected in ["alpha", "beta", "gamma"] {
        assert_eq!(relay.get_decoded().await, expected.as_bytes());
    }
}

#[tokio::test]
async fn waiting_consumer_receives_large_stream() {
    let relay = TestRelay::start(1).await;
    let payload = noise(8 * 1024 * 1024);

    let consumer = {
        let client = relay.client.clone();
        let url = relay.url("/compressions");
        tokio::spawn(async move {
            let response = client.get(url).send().await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.headers()["content-type"], "application/zstd");
            response.bytes().await.unwrap()
        })
    };
    // Let the consumer start waiting before the producer arrives.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let response = relay.put(payload.clone()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let compressed = consumer.await.unwrap();
    assert_eq!(decode(&compressed), payload);
}

#[tokio::test]
async fn empty_upload_yields_empty_stream() {
    let relay = TestRelay::start(1).await;
    assert_eq!(relay.put(Vec::<u8>::new()).await.status(), StatusCode::OK);
    assert!(relay.get_decoded().await.is_empty());
}

#[tokio::test]
async fn health_reports_queue_state() {
    let relay = TestRelay::start(2).await;
    relay.put("queued").await;

    let response = relay.client.get(relay.url("/_health")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["queued"], 1);
    assert_eq!(body["queue_capacity"], 2);
    assert_eq!(body["active_transfers"], 0);
}

#[tokio::test]
async fn request_id_is_returned() {
    let relay = TestRelay::start(1).await;
    let response = relay
        .client
        .get(relay.url("/_health"))
        .header("x-request-id", "integration-1")
        .send()
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "integration-1");

    let response = relay.client.get(relay.url("/_health")).send().await.unwrap();
    assert!(!response.headers()["x-request-id"].is_empty());
}

#[tokio::test]
async fn shutdown_releases_waiting_consumer() {
    let relay = TestRelay::start(1).await;
    let consumer = {
        let client = relay.client.clone();
        let url = relay.url("/compressions");
        tokio::spawn(async move { client.get(url).send().await.unwrap() })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    relay.shutdown.trigger();
    let response = consumer.await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.text().await.unwrap(), "server is shutting down");
}

#[tokio::test]
async fn disconnected_consumer_does_not_take_a_stream() {
    let relay = TestRelay::start(1).await;

    let impatient = reqwest::Client::builder()
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    let gave_up = impatient.get(relay.url("/compressions")).send().await;
    assert!(gave_up.unwrap_err().is_timeout());
    // Give the server a moment to drop the abandoned handler.
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(relay.put("hello world").await.status(), StatusCode::OK);
    assert_eq!(relay.get_decoded().await, b"hello world");
}

#[tokio::test]
async fn stale_streams_are_skipped() {
    let mut config = compression_relay::RelayConfig::default();
    config.relay.queue_capacity = 2;
    config.relay.unclaimed_timeout_secs = Some(1);
    let relay = TestRelay::start_with(config).await;

    assert_eq!(relay.put("stale").await.status(), StatusCode::OK);
    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert_eq!(relay.put("fresh").await.status(), StatusCode::OK);

    assert_eq!(relay.get_decoded().await, b"fresh");
}
