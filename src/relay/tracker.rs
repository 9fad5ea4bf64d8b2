//! Transfer identity and lifecycle tracking.
//!
//! # Responsibilities
//! - Generate unique transfer IDs for tracing
//! - Count transfers currently moving bytes
//! - Release the count on every exit path (guard drop)
//! - Let shutdown wait for in-flight transfers to finish

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

use crate::observability::metrics;

/// Global atomic counter for transfer IDs.
/// Relaxed ordering is enough, the IDs only need to be unique.
static TRANSFER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransferId(u64);

impl TransferId {
    /// Generate a new unique transfer ID.
    pub fn next() -> Self {
        Self(TRANSFER_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for TransferId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "xfer-{}", self.0)
    }
}

/// Tracks transfers that are actively compressing.
#[derive(Debug, Clone, Default)]
pub struct TransferTracker {
    active_count: Arc<AtomicU64>,
    idle: Arc<Notify>,
}

impl TransferTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a transfer as active. Returns a guard that decrements on drop.
    pub fn track(&self, id: TransferId) -> TransferGuard {
        let active = self.active_count.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::set_active_transfers(active);
        TransferGuard {
            active_count: Arc::clone(&self.active_count),
            idle: Arc::clone(&self.idle),
            id,
        }
    }

    /// Get current active transfer count.
    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }

    /// Resolve once no transfer is active.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.active_count() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Guard that tracks a transfer's lifetime.
#[derive(Debug)]
pub struct TransferGuard {
    active_count: Arc<AtomicU64>,
    idle: Arc<Notify>,
    id: TransferId,
}

impl TransferGuard {
    /// Get this transfer's ID.
    pub fn id(&self) -> TransferId {
        self.id
    }
}

impl Drop for TransferGuard {
    fn drop(&mut self) {
        let active = self.active_count.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::set_active_transfers(active);
        if active == 0 {
            self.idle.notify_waiters();
        }
        tracing::trace!(transfer_id = %self.id, "Transfer released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_id_unique_and_increasing() {
        let id1 = TransferId::next();
        let id2 = TransferId::next();
        assert_ne!(id1, id2);
        assert!(id2 > id1);
        assert!(id1.to_string().starts_with("xfer-"));
    }

    #[test]
    fn tracker_counts() {
        let tracker = TransferTracker::new();
        assert_eq!(tracker.active_count(), 0);

        let guard1 = tracker.track(TransferId::next());
        assert_eq!(tracker.active_count(), 1);

        let guard2 = tracker.track(TransferId::next());
        assert_eq!(tracker.active_count(), 2);

        drop(guard1);
        assert_eq!(tracker.active_count(), 1);

        drop(guard2);
        assert_eq!(tracker.active_count(), 0);
    }

    #[tokio::test]
    async fn wait_idle_resolves_after_last_guard() {
        let tracker = TransferTracker::new();
        tracker.wait_idle().await;

        let guard = tracker.track(TransferId::next());
        let waiter = {
            let tracker = tracker.clone();
            tokio::spawn(async move { tracker.wait_idle().await })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
    }
}
