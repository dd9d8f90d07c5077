//! One-shot timers tracked per connection
//!
//! Every delayed replay registers its timer id here. Closing the connection
//! cancels whatever is still pending, so no retry fires into a torn-down
//! session.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::oneshot;

/// Opaque handle of a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

type PendingTimers = Arc<Mutex<HashMap<TimerId, oneshot::Sender<()>>>>;

/// Set of outstanding timer ids.
#[derive(Debug, Default)]
pub struct TimerRegistry {
    next_id: AtomicU64,
    pending: PendingTimers,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a timer firing after `delay`. Nothing happens until it is awaited.
    pub fn schedule(&self, delay: Duration) -> ScheduledTimer {
        let id = TimerId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let (cancel_tx, cancel_rx) = oneshot::channel();
        lock(&self.pending).insert(id, cancel_tx);
        ScheduledTimer {
            id,
            delay,
            cancelled: cancel_rx,
            pending: Arc::clone(&self.pending),
        }
    }

    /// Cancel one timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&self, id: TimerId) -> bool {
        lock(&self.pending).remove(&id).is_some()
    }

    /// Cancel every pending timer, returning how many there were.
    pub fn cancel_all(&self) -> usize {
        let mut pending = lock(&self.pending);
        let count = pending.len();
        pending.clear();
        count
    }

    /// Ids of timers that have neither fired nor been cancelled, ascending.
    pub fn pending(&self) -> Vec<TimerId> {
        let mut ids: Vec<TimerId> = lock(&self.pending).keys().copied().collect();
        ids.sort();
        ids
    }
}

/// A registered timer. Dropping it unregisters the id.
#[derive(Debug)]
pub struct ScheduledTimer {
    id: TimerId,
    delay: Duration,
    cancelled: oneshot::Receiver<()>,
    pending: PendingTimers,
}

impl ScheduledTimer {
    pub fn id(&self) -> TimerId {
        self.id
    }

    /// Wait for the timer. `true` if it fired, `false` if it was cancelled.
    pub async fn wait(mut self) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(self.delay) => true,
            _ = &mut self.cancelled => false,
        }
    }
}

impl Drop for ScheduledTimer {
    fn drop(&mut self) {
        lock(&self.pending).remove(&self.id);
    }
}

// Lock poisoning only means another thread panicked mid-update of a plain map.
fn lock(pending: &PendingTimers) -> MutexGuard<'_, HashMap<TimerId, oneshot::Sender<()>>> {
    pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
