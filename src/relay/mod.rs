//! Streaming compression relay.
//!
//! # Data Flow
//! ```text
//! Producer (request body / socket)
//!     → intake.rs (build stream handle + encoder, try to admit)
//!     → queue.rs (bounded FIFO of read ends)
//!     → dispatch.rs (one consumer claims one read end)
//!     → Consumer (response body)
//!
//! Raw socket peer
//!     → transfer.rs (socket read → encoder → socket write)
//! ```
//!
//! # Design Decisions
//! - The admission queue is the only state shared between tasks
//! - Admission never waits; a full queue rejects the producer outright
//! - Compression happens inline in the producer task, overlapped with the
//!   consumer's reads; memory is bounded by codec and pipe buffers
//! - Every transfer finalizes its encoder, whatever happens to the copy

pub mod dispatch;
pub mod encoder;
pub mod error;
pub mod handle;
pub mod intake;
pub mod queue;
pub mod tracker;
pub mod transfer;

use std::sync::Arc;

use crate::config::RelayConfig;

pub use dispatch::{ClaimedStream, ConsumerDispatch};
pub use encoder::{Codec, Encoder};
pub use error::{Cancelled, CopySide, RelayError, RelayResult};
pub use handle::{stream_handle, ReadEnd, WriteEnd};
pub use intake::ProducerIntake;
pub use queue::{AdmissionQueue, ClaimTicket, QueuedStream};
pub use tracker::{TransferGuard, TransferId, TransferTracker};
pub use transfer::{Transfer, TransferKind, TransferStats};

/// The shared relay state handed to every front end.
#[derive(Debug, Clone)]
pub struct Relay {
    queue: Arc<AdmissionQueue>,
    intake: ProducerIntake,
    dispatch: ConsumerDispatch,
    tracker: TransferTracker,
    codec: Codec,
}

impl Relay {
    /// Build the relay from a validated configuration.
    pub fn from_config(config: &RelayConfig) -> Self {
        let queue = Arc::new(AdmissionQueue::new(
            config.relay.queue_capacity,
            config.relay.unclaimed_timeout(),
        ));
        let tracker = TransferTracker::new();
        let codec = Codec::zstd(config.codec.level);
        let intake = ProducerIntake::new(
            queue.clone(),
            codec,
            config.relay.pipe_buffer_bytes,
            tracker.clone(),
        );
        let dispatch = ConsumerDispatch::new(queue.clone());

        Self {
            queue,
            intake,
            dispatch,
            tracker,
            codec,
        }
    }

    pub fn intake(&self) -> &ProducerIntake {
        &self.intake
    }

    pub fn dispatch(&self) -> &ConsumerDispatch {
        &self.dispatch
    }

    pub fn queue(&self) -> &AdmissionQueue {
        &self.queue
    }

    pub fn tracker(&self) -> &TransferTracker {
        &self.tracker
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }
}
