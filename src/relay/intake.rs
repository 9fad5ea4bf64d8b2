//! Producer intake.
//!
//! # Responsibilities
//! - Build a stream handle and an encoder over its write end
//! - Admit the read end without waiting; reject when the queue is full
//! - Drain the inbound source through the encoder once admitted
//! - Optionally abort producers nobody claims in time
//!
//! # Design Decisions
//! - A rejected producer's source is never read
//! - The encoder is finalized on every exit path of the drain
//! - Success is reported when draining ends, not when the consumer finishes

use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncRead;
use tokio::time::Instant;

use crate::observability::metrics;
use crate::relay::encoder::Codec;
use crate::relay::error::{RelayError, RelayResult};
use crate::relay::handle::stream_handle;
use crate::relay::queue::{AdmissionQueue, ClaimTicket, QueuedStream};
use crate::relay::tracker::{TransferId, TransferTracker};
use crate::relay::transfer::{Transfer, TransferKind, TransferStats};

/// Accepts raw producer streams into the admission queue.
#[derive(Debug, Clone)]
pub struct ProducerIntake {
    queue: Arc<AdmissionQueue>,
    codec: Codec,
    pipe_buffer_bytes: usize,
    tracker: TransferTracker,
}

impl ProducerIntake {
    pub fn new(
        queue: Arc<AdmissionQueue>,
        codec: Codec,
        pipe_buffer_bytes: usize,
        tracker: TransferTracker,
    ) -> Self {
        Self {
            queue,
            codec,
            pipe_buffer_bytes,
            tracker,
        }
    }

    /// Compress `source` into a newly admitted stream.
    ///
    /// Returns once the source is exhausted and the encoder finalized.
    pub async fn accept<R>(&self, source: R) -> RelayResult<TransferStats>
    where
        R: AsyncRead + Unpin,
    {
        let id = TransferId::next();
        let (reader, writer) = stream_handle(self.pipe_buffer_bytes);

        let encoder = match self.codec.encoder(writer) {
            Ok(encoder) => encoder,
            Err(e) => {
                tracing::error!(transfer_id = %id, error = %e, "Error creating encoder");
                metrics::record_rejection(e.kind());
                return Err(e);
            }
        };

        let (entry, ticket) = QueuedStream::new(id, reader);
        let admitted_at = entry.admitted_at();
        self.queue.try_enqueue(entry)?;

        let transfer = Transfer::new(self.tracker.track(id), TransferKind::Queued, source, encoder);
        match self.queue.unclaimed_timeout() {
            None => transfer.run().await,
            Some(limit) => {
                let result = transfer
                    .run_until(unclaimed(ticket, admitted_at + limit, limit))
                    .await;
                if let Err(RelayError::Unclaimed(_)) = &result {
                    tracing::warn!(transfer_id = %id, limit_secs = limit.as_secs(), "No consumer claimed stream");
                }
                result
            }
        }
    }
}

/// Resolves only if nobody claimed the stream by `deadline`. The queue
/// treats the entry as stale from the same instant.
async fn unclaimed(ticket: ClaimTicket, deadline: Instant, limit: Duration) -> RelayError {
    tokio::time::sleep_until(deadline).await;
    if ticket.expire() {
        RelayError::Unclaimed(limit)
    } else {
        std::future::pending().await
    }
}
