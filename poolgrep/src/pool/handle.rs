use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::errors::PoolError;

type Outcome<T> = Result<T, PoolError>;

struct Slot<T> {
    outcome: Mutex<Option<Outcome<T>>>,
    resolved: Condvar,
}

impl<T> Slot<T> {
    fn lock(&self) -> MutexGuard<'_, Option<Outcome<T>>> {
        self.outcome.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait_resolved(&self) -> MutexGuard<'_, Option<Outcome<T>>> {
        self.resolved
            .wait_while(self.lock(), |outcome| outcome.is_none())
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn set(&self, outcome: Outcome<T>) {
        let mut slot = self.lock();
        if slot.is_none() {
            *slot = Some(outcome);
        }
        drop(slot);
        self.resolved.notify_all();
    }
}

/// Creates the producer and consumer ends of a one-shot task result.
pub(crate) fn channel<T>() -> (Promise<T>, TaskHandle<T>) {
    let slot = Arc::new(Slot {
        outcome: Mutex::new(None),
        resolved: Condvar::new(),
    });
    (
        Promise {
            slot: Some(Arc::clone(&slot)),
        },
        TaskHandle { slot },
    )
}

/// Producer end, owned by the queued task.
///
/// Dropping a promise that was never resolved resolves its handle with
/// [`PoolError::TaskAbandoned`], so a waiter can never block on a task that
/// no longer exists.
pub(crate) struct Promise<T> {
    slot: Option<Arc<Slot<T>>>,
}

impl<T> Promise<T> {
    pub(crate) fn resolve(mut self, outcome: Outcome<T>) {
        if let Some(slot) = self.slot.take() {
            slot.set(outcome);
        }
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            slot.set(Err(PoolError::TaskAbandoned));
        }
    }
}

/// Handle to the eventual outcome of a task submitted to a
/// [`ThreadPool`](super::ThreadPool).
///
/// The outcome is written exactly once by the worker that ran the task.
/// [`wait`](Self::wait) may be called any number of times; [`get`](Self::get)
/// consumes the handle, so the value itself is retrieved exactly once.
pub struct TaskHandle<T> {
    slot: Arc<Slot<T>>,
}

impl<T> TaskHandle<T> {
    /// Blocks until the task has produced a value or a failure.
    pub fn wait(&self) {
        drop(self.slot.wait_resolved());
    }

    /// Blocks for at most `timeout`. Returns `true` if the task resolved.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (slot, _) = self
            .slot
            .resolved
            .wait_timeout_while(self.slot.lock(), timeout, |outcome| outcome.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        slot.is_some()
    }

    /// Returns `true` once the task has resolved, without blocking.
    pub fn is_resolved(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Blocks until the task resolves and returns its value, or the failure
    /// captured while running it.
    pub fn get(self) -> Result<T, PoolError> {
        let mut slot = self.slot.wait_resolved();
        slot.take().unwrap_or(Err(PoolError::TaskAbandoned))
    }
}

impl<T> fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("resolved", &self.is_resolved())
            .finish()
    }
}
