//! Shared harness for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;

use bytes::Bytes;
use compression_relay::config::RelayConfig;
use compression_relay::net::Listener;
use compression_relay::{HttpServer, RawCompressor, Relay, Shutdown};
use tokio::net::TcpListener;

/// A relay running on ephemeral ports. Dropping it leaves the tasks running
/// until the test runtime stops; call [`TestRelay::shutdown`] to drain.
pub struct TestRelay {
    pub http_addr: SocketAddr,
    pub raw_addr: SocketAddr,
    pub relay: Relay,
    pub shutdown: Shutdown,
    pub client: reqwest::Client,
}

impl TestRelay {
    pub async fn start(queue_capacity: usize) -> Self {
        let mut config = RelayConfig::default();
        config.relay.queue_capacity = queue_capacity;
        Self::start_with(config).await
    }

    pub async fn start_with(config: RelayConfig) -> Self {
        let shutdown = Shutdown::new();
        let relay = Relay::from_config(&config);

        let http_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let http_addr = http_listener.local_addr().unwrap();
        let server = HttpServer::new(relay.clone(), shutdown.subscribe());
        tokio::spawn(async move {
            let _ = server.run(http_listener).await;
        });

        let raw_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let raw_addr = raw_listener.local_addr().unwrap();
        let raw = RawCompressor::new(
            Listener::from_listener(raw_listener, config.raw.max_connections),
            relay.codec(),
            relay.tracker().clone(),
        );
        tokio::spawn(raw.run(shutdown.subscribe()));

        Self {
            http_addr,
            raw_addr,
            relay,
            shutdown,
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.http_addr, path)
    }

    pub async fn put(&self, body: impl Into<reqwest::Body>) -> reqwest::Response {
        self.client
            .put(self.url("/compressions"))
            .body(body)
            .send()
            .await
            .unwrap()
    }

    pub async fn get(&self) -> reqwest::Response {
        self.client
            .get(self.url("/compressions"))
            .send()
            .await
            .unwrap()
    }

    /// GET the next stream and return it decompressed.
    pub async fn get_decoded(&self) -> Vec<u8> {
        let response = self.get().await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        decode(&response.bytes().await.unwrap())
    }
}

pub fn decode(compressed: &[u8]) -> Vec<u8> {
    zstd::stream::decode_all(compressed).unwrap()
}

/// Deterministic, incompressible chunk `index` of a test payload.
pub fn noise_chunk(index: u64, len: usize) -> Bytes {
    let mut state = 0x9E37_79B9_7F4A_7C15u64 ^ index.wrapping_mul(0xBF58_476D_1CE4_E5B9);
    let mut out = Vec::with_capacity(len);
    for _ in 0..len {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        out.push(state as u8);
    }
    Bytes::from(out)
}

pub fn noise(len: usize) -> Vec<u8> {
    noise_chunk(0, len).to_vec()
}
