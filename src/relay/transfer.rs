//! Paired streaming transfer.
//!
//! A [`Transfer`] is one raw source paired with an encoder whose sink receives
//! the compressed output. How the pair was formed differs by topology:
//!
//! ```text
//! queue-paired:  request body ──▶ encoder ──▶ stream handle ──▶ (queue) ──▶ consumer
//! self-paired:   socket read  ──▶ encoder ──▶ socket write (same peer)
//! ```
//!
//! Both run through the same copy loop, and both finalize the encoder on every
//! exit path so the reading side sees end-of-stream instead of stalling.
//! A transfer cut short by an abort future finalizes only if the sink can
//! take the epilogue without waiting: nobody is reading an abandoned stream.

use std::future::Future;
use std::time::Instant;

use futures_util::FutureExt;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tracing::Instrument;

use crate::observability::metrics;
use crate::relay::encoder::Encoder;
use crate::relay::error::{RelayError, RelayResult};
use crate::relay::tracker::TransferGuard;

const COPY_BUFFER_BYTES: usize = 32 * 1024;

/// Pairing topology of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    /// Producer and consumer are independent peers matched by the queue.
    Queued,
    /// Producer and consumer are the same raw socket peer.
    Raw,
}

impl TransferKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferKind::Queued => "queued",
            TransferKind::Raw => "raw",
        }
    }
}

/// Byte counts for a finished transfer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferStats {
    /// Raw bytes read from the source.
    pub bytes_in: u64,
    /// Compressed bytes written to the sink.
    pub bytes_out: u64,
}

/// One source streamed through one encoder.
pub struct Transfer<R, W> {
    guard: TransferGuard,
    kind: TransferKind,
    source: R,
    encoder: Encoder<W>,
}

impl<R, W> Transfer<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(guard: TransferGuard, kind: TransferKind, source: R, encoder: Encoder<W>) -> Self {
        Self {
            guard,
            kind,
            source,
            encoder,
        }
    }

    /// Drain the source into the encoder, then finalize.
    pub async fn run(self) -> RelayResult<TransferStats> {
        self.run_until(std::future::pending()).await
    }

    /// Like [`Transfer::run`], but stop draining with the error `abort`
    /// resolves to, if it resolves first.
    pub async fn run_until<F>(self, abort: F) -> RelayResult<TransferStats>
    where
        F: Future<Output = RelayError>,
    {
        let span = tracing::info_span!(
            "transfer",
            transfer_id = %self.guard.id(),
            kind = self.kind.as_str()
        );
        self.run_inner(abort).instrument(span).await
    }

    async fn run_inner<F>(mut self, abort: F) -> RelayResult<TransferStats>
    where
        F: Future<Output = RelayError>,
    {
        let started = Instant::now();
        let mut bytes_in = 0u64;
        let (copied, aborted) = tokio::select! {
            copied = copy_into(&mut self.source, &mut self.encoder, &mut bytes_in) => (copied, false),
            err = abort => (Err(err), true),
        };

        // Finalize regardless of how the copy ended.
        let finalized = if aborted {
            self.encoder
                .finalize()
                .now_or_never()
                .unwrap_or_else(|| Err(std::io::ErrorKind::WouldBlock.into()))
        } else {
            self.encoder.finalize().await
        };

        let stats = TransferStats {
            bytes_in,
            bytes_out: self.encoder.bytes_out(),
        };
        let result = match (copied, finalized) {
            (Ok(()), Ok(())) => Ok(stats),
            (Ok(()), Err(e)) => Err(RelayError::sink_io(e)),
            (Err(e), finalized) => {
                if let Err(finalize_err) = finalized {
                    tracing::debug!(error = %finalize_err, "Finalize after failed copy also failed");
                }
                Err(e)
            }
        };

        match &result {
            Ok(stats) => {
                tracing::info!(
                    bytes_in = stats.bytes_in,
                    bytes_out = stats.bytes_out,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Transfer complete"
                );
                metrics::record_transfer(self.kind.as_str(), "ok", stats, started);
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    bytes_in = stats.bytes_in,
                    bytes_out = stats.bytes_out,
                    "Transfer aborted"
                );
                metrics::record_transfer(self.kind.as_str(), e.kind(), &stats, started);
            }
        }

        result
    }
}

async fn copy_into<R, W>(
    source: &mut R,
    encoder: &mut Encoder<W>,
    total: &mut u64,
) -> RelayResult<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; COPY_BUFFER_BYTES];
    loop {
        let n = source.read(&mut buf).await.map_err(RelayError::source_io)?;
        if n == 0 {
            return Ok(());
        }
        encoder
            .write_all(&buf[..n])
            .await
            .map_err(RelayError::sink_io)?;
        *total += n as u64;
    }
}
