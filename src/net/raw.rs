//! Self-paired compression over raw TCP.
//!
//! A peer connects, writes raw bytes, and half-closes its write side. The
//! compressed stream comes back on the same connection, after which the
//! relay closes it.

use std::net::SocketAddr;

use tokio::net::TcpStream;

use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;
use crate::net::listener::{ConnectionPermit, Listener, ListenerError};
use crate::relay::{
    Codec, RelayResult, Transfer, TransferId, TransferKind, TransferStats, TransferTracker,
};

/// Accept loop for the raw-socket variant.
pub struct RawCompressor {
    listener: Listener,
    codec: Codec,
    tracker: TransferTracker,
}

impl RawCompressor {
    pub fn new(listener: Listener, codec: Codec, tracker: TransferTracker) -> Self {
        Self {
            listener,
            codec,
            tracker,
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.listener.local_addr()
    }

    /// Accept and serve connections until shutdown.
    pub async fn run(self, shutdown: ShutdownSignal) -> Result<(), ListenerError> {
        tracing::info!(
            address = ?self.listener.local_addr().ok(),
            max_connections = self.listener.max_connections(),
            "Raw compressor accepting"
        );
        let stop = shutdown.recv();
        tokio::pin!(stop);

        loop {
            let accepted = tokio::select! {
                () = &mut stop => break,
                accepted = self.listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, peer, permit)) => {
                    let codec = self.codec;
                    let tracker = self.tracker.clone();
                    tokio::spawn(async move {
                        if let Err(e) = serve_connection(stream, peer, permit, codec, tracker).await {
                            tracing::debug!(peer = %peer, reason = e.kind(), "Raw connection closed early");
                        }
                    });
                }
                Err(ListenerError::Accept(e)) => {
                    // Per-connection failures (e.g. reset before accept) are not fatal.
                    tracing::warn!(error = %e, "Raw accept failed");
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!("Raw listener stopped");
        Ok(())
    }
}

/// Compress everything the peer sends back to the same peer.
pub async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    _permit: ConnectionPermit,
    codec: Codec,
    tracker: TransferTracker,
) -> RelayResult<TransferStats> {
    let id = TransferId::next();
    let (source, sink) = stream.into_split();

    let encoder = match codec.encoder(sink) {
        Ok(encoder) => encoder,
        Err(e) => {
            // Dropping both halves closes the connection.
            tracing::error!(transfer_id = %id, peer = %peer, error = %e, "Error creating encoder");
            metrics::record_rejection(e.kind());
            return Err(e);
        }
    };

    tracing::debug!(transfer_id = %id, peer = %peer, "Raw transfer starting");
    Transfer::new(tracker.track(id), TransferKind::Raw, source, encoder)
        .run()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::RelayError;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn connected() -> (TcpStream, TcpStream, SocketAddr, ConnectionPermit) {
        let listener = Listener::bind("127.0.0.1:0", 4).await.unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).await.unwrap();
        let (server, peer, permit) = listener.accept().await.unwrap();
        (client, server, peer, permit)
    }

    #[tokio::test]
    async fn compresses_back_to_the_peer() {
        let (mut client, server, peer, permit) = connected().await;
        let served = tokio::spawn(serve_connection(
            server,
            peer,
            permit,
            Codec::default(),
            TransferTracker::new(),
        ));

        client.write_all(b"echo me").await.unwrap();
        client.shutdown().await.unwrap();
        let mut compressed = Vec::new();
        client.read_to_end(&mut compressed).await.unwrap();

        let stats = served.await.unwrap().unwrap();
        assert_eq!(stats.bytes_in, 7);
        assert_eq!(zstd::stream::decode_all(&compressed[..]).unwrap(), b"echo me");
    }

    #[tokio::test]
    async fn encoder_failure_closes_connection() {
        let (mut client, server, peer, permit) = connected().await;
        let tracker = TransferTracker::new();

        let err = serve_connection(server, peer, permit, Codec::zstd(1000), tracker.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::EncoderInit(_)));
        assert_eq!(tracker.active_count(), 0);

        let mut received = Vec::new();
        client.read_to_end(&mut received).await.unwrap();
        assert!(received.is_empty());
    }
}
