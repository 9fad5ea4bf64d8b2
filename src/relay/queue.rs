//! Bounded admission queue.
//!
//! Producers push with [`AdmissionQueue::try_enqueue`], which never waits: a
//! full queue is reported immediately as [`RelayError::Overwhelmed`].
//! Consumers pop with [`AdmissionQueue::dequeue_or_cancel`], which waits for
//! the next entry or for a cancellation future, whichever comes first.
//!
//! The queue is a bounded `mpsc` channel. Its receiver sits behind a fair
//! (FIFO) async mutex so several waiting consumers are served in arrival
//! order, and each entry is received by exactly one of them.
//!
//! When an unclaimed timeout is configured, every entry carries a
//! [`ClaimTicket`] shared with its producer. The ticket settles once, either
//! claimed by a consumer or expired, so a stream is never both handed out
//! and abandoned.

use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::time::Instant;

use crate::observability::metrics;
use crate::relay::error::{Cancelled, RelayError, RelayResult};
use crate::relay::handle::ReadEnd;
use crate::relay::tracker::TransferId;

const WAITING: u8 = 0;
const CLAIMED: u8 = 1;
const EXPIRED: u8 = 2;

/// Settles whether a queued stream was claimed or expired.
#[derive(Debug, Clone)]
pub struct ClaimTicket {
    state: Arc<AtomicU8>,
}

impl ClaimTicket {
    fn new() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(WAITING)),
        }
    }

    fn settle(&self, to: u8) -> Result<(), u8> {
        self.state
            .compare_exchange(WAITING, to, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
    }

    /// Mark the stream claimed. False if it already expired.
    pub fn claim(&self) -> bool {
        match self.settle(CLAIMED) {
            Ok(()) => true,
            Err(current) => current == CLAIMED,
        }
    }

    /// Mark the stream expired. False if a consumer already claimed it.
    pub fn expire(&self) -> bool {
        match self.settle(EXPIRED) {
            Ok(()) => {
                metrics::record_rejection("unclaimed");
                true
            }
            Err(current) => current == EXPIRED,
        }
    }

    pub fn is_claimed(&self) -> bool {
        self.state.load(Ordering::Acquire) == CLAIMED
    }
}

/// An admitted stream waiting for a consumer.
#[derive(Debug)]
pub struct QueuedStream {
    id: TransferId,
    reader: ReadEnd,
    admitted_at: Instant,
    ticket: ClaimTicket,
}

impl QueuedStream {
    /// Wrap a read end for admission. The producer keeps the returned ticket.
    pub fn new(id: TransferId, reader: ReadEnd) -> (Self, ClaimTicket) {
        let ticket = ClaimTicket::new();
        let entry = Self {
            id,
            reader,
            admitted_at: Instant::now(),
            ticket: ticket.clone(),
        };
        (entry, ticket)
    }

    pub fn id(&self) -> TransferId {
        self.id
    }

    pub fn admitted_at(&self) -> Instant {
        self.admitted_at
    }

    /// Time spent in the queue so far.
    pub fn waited(&self) -> Duration {
        self.admitted_at.elapsed()
    }

    /// Take ownership of the read end.
    pub fn into_parts(self) -> (TransferId, ReadEnd) {
        (self.id, self.reader)
    }
}

/// Capacity-bounded FIFO of streams awaiting a consumer.
#[derive(Debug)]
pub struct AdmissionQueue {
    tx: mpsc::Sender<QueuedStream>,
    rx: Mutex<mpsc::Receiver<QueuedStream>>,
    capacity: usize,
    unclaimed_timeout: Option<Duration>,
}

impl AdmissionQueue {
    /// Create a queue holding at most `capacity` streams.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize, unclaimed_timeout: Option<Duration>) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx,
            rx: Mutex::new(rx),
            capacity,
            unclaimed_timeout,
        }
    }

    /// Admit a stream if there is room, without waiting.
    pub fn try_enqueue(&self, entry: QueuedStream) -> RelayResult<()> {
        let id = entry.id;
        match self.tx.try_send(entry) {
            Ok(()) => {
                let depth = self.len();
                tracing::debug!(transfer_id = %id, depth, "Stream admitted");
                metrics::record_admission(depth);
                Ok(())
            }
            // Closed cannot happen while `self` owns the receiver.
            Err(_) => {
                tracing::warn!(transfer_id = %id, capacity = self.capacity, "Admission queue full");
                metrics::record_rejection(RelayError::Overwhelmed.kind());
                Err(RelayError::Overwhelmed)
            }
        }
    }

    /// Wait for the next stream, or give up when `cancel` completes.
    ///
    /// The returned entry is already claimed. Cancellation leaves the queue
    /// untouched. Expired entries, and entries that reached the unclaimed
    /// timeout, are discarded and the wait continues.
    pub async fn dequeue_or_cancel<F>(&self, cancel: F) -> Result<QueuedStream, Cancelled>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            () = cancel => Err(Cancelled),
            entry = self.next_live() => entry.ok_or(Cancelled),
        }
    }

    async fn next_live(&self) -> Option<QueuedStream> {
        let mut rx = self.rx.lock().await;
        loop {
            let entry = rx.recv().await?;
            metrics::set_queue_depth(self.len());
            if self.is_stale(&entry) {
                entry.ticket.expire();
            }
            if !entry.ticket.claim() {
                tracing::warn!(
                    transfer_id = %entry.id,
                    waited_ms = entry.waited().as_millis() as u64,
                    "Discarding unclaimed stream"
                );
                continue;
            }
            return Some(entry);
        }
    }

    /// An entry is stale from the instant its deadline is reached.
    fn is_stale(&self, entry: &QueuedStream) -> bool {
        self.unclaimed_timeout
            .is_some_and(|limit| entry.waited() >= limit)
    }

    /// Number of streams currently waiting.
    pub fn len(&self) -> usize {
        self.capacity - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn unclaimed_timeout(&self) -> Option<Duration> {
        self.unclaimed_timeout
    }
}
