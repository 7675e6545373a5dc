//! Per-proposal serialization of writes.
//!
//! Two approvals for the same proposal signed by the same account can be
//! rejected by the chain if the second is submitted before the first is
//! mined. When enabled, the client holds one of these guards for the
//! whole submit and confirm cycle of a write.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use gasless_voting_core::ProposalId;

type Locks = Arc<DashMap<ProposalId, Arc<Mutex<()>>>>;

/// Held while a write to one proposal is in flight.
///
/// The proposal's lock is forgotten once the last holder or waiter is gone.
pub struct WriteGuard {
    id: ProposalId,
    locks: Locks,
    held: Option<OwnedMutexGuard<()>>,
}

impl Drop for WriteGuard {
    fn drop(&mut self) {
        // Release first so the map's handle can be the only one left
        drop(self.held.take());
        // Waiters clone the handle under the shard lock, so this cannot race them
        if self
            .locks
            .remove_if(&self.id, |_, lock| Arc::strong_count(lock) == 1)
            .is_some()
        {
            debug!("Write queue of proposal {} is empty", self.id);
        }
    }
}

impl std::fmt::Debug for WriteGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteGuard").field("id", &self.id).finish()
    }
}

/// Async FIFO lock per proposal id
#[derive(Debug, Clone, Default)]
pub struct WriteQueue {
    locks: Locks,
}

impl WriteQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for earlier writes to the proposal to finish
    pub async fn acquire(&self, id: &ProposalId) -> WriteGuard {
        let lock = self
            .locks
            .entry(*id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();

        debug!("Waiting for the write queue of proposal {}", id);
        let held = lock.lock_owned().await;
        WriteGuard {
            id: *id,
            locks: self.locks.clone(),
            held: Some(held),
        }
    }

    /// Whether a write to the proposal is currently in flight
    pub fn is_busy(&self, id: &ProposalId) -> bool {
        self.locks
            .get(id)
            .map(|lock| lock.try_lock().is_err())
            .unwrap_or(false)
    }

    /// Number of proposals with a write in flight or queued
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gasless_voting_core::Address;
    use std::time::Duration;
    use tokio_test::{assert_pending, assert_ready, task};

    fn id(n: u64) -> ProposalId {
        ProposalId::new(Address::from_bytes([1; 20]), n)
    }

    #[tokio::test]
    async fn test_same_proposal_waits() {
        let queue = WriteQueue::new();
        let guard = queue.acquire(&id(1)).await;
        assert!(queue.is_busy(&id(1)));

        let second = tokio::time::timeout(Duration::from_millis(50), queue.acquire(&id(1))).await;
        assert!(second.is_err());

        drop(guard);
        assert!(!queue.is_busy(&id(1)));
        let _guard = queue.acquire(&id(1)).await;
    }

    #[tokio::test]
    async fn test_other_proposals_do_not_wait() {
        let queue = WriteQueue::new();
        let _first = queue.acquire(&id(1)).await;
        let other = tokio::time::timeout(Duration::from_millis(50), queue.acquire(&id(2))).await;
        assert!(other.is_ok());
    }

    #[test]
    fn test_queued_write_resumes_after_release() {
        let queue = WriteQueue::new();
        let key = id(3);

        let mut first = task::spawn(queue.acquire(&key));
        let guard = assert_ready!(first.poll());

        let mut second = task::spawn(queue.acquire(&key));
        assert_pending!(second.poll());

        drop(guard);
        assert!(second.is_woken());
        let _guard = assert_ready!(second.poll());
    }

    #[tokio::test]
    async fn test_released_proposals_are_forgotten() {
        let queue = WriteQueue::new();
        for n in 0..16 {
            let _guard = queue.acquire(&id(n)).await;
            assert_eq!(queue.len(), 1);
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_lock_is_kept_while_a_write_waits() {
        let queue = WriteQueue::new();
        let key = id(4);

        let mut first = task::spawn(queue.acquire(&key));
        let guard = assert_ready!(first.poll());
        let mut second = task::spawn(queue.acquire(&key));
        assert_pending!(second.poll());

        // The waiter still needs the same lock
        drop(guard);
        assert_eq!(queue.len(), 1);

        let guard = assert_ready!(second.poll());
        assert!(queue.is_busy(&key));
        drop(guard);
        assert!(queue.is_empty());
        assert!(!queue.is_busy(&key));
    }

    #[tokio::test]
    async fn test_abandoned_wait_does_not_pin_the_lock() {
        let queue = WriteQueue::new();
        let guard = queue.acquire(&id(5)).await;
        let waited = tokio::time::timeout(Duration::from_millis(20), queue.acquire(&id(5))).await;
        assert!(waited.is_err());

        drop(guard);
        assert!(queue.is_empty());
    }
}
