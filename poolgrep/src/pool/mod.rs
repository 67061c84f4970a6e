//! A fixed-size pool of worker threads fed from one shared FIFO queue.
//!
//! Every worker runs the same loop: wait until the queue is non-empty or the
//! pool is shutting down, pop the front task while holding the queue lock,
//! release the lock, then run the task. A task never runs under the queue
//! lock, so a slow task cannot stall `submit` or other workers.
//!
//! ```rust,ignore
//! let pool = ThreadPool::new(4)?;
//! let handle = pool.submit(|| 2 + 2)?;
//! assert_eq!(handle.get()?, 4);
//! pool.shutdown();
//! ```
//!
//! # Lifecycle
//!
//! A pool starts [`PoolState::Accepting`]. [`ThreadPool::shutdown`] (or
//! dropping the pool) moves it to [`PoolState::Draining`]: submissions are
//! refused with [`PoolError::Inactive`] but everything already queued still
//! runs. Once every worker has been joined the pool is [`PoolState::Stopped`].
//!
//! # Failures
//!
//! A panic inside a task is caught on the worker and stored in that task's
//! [`TaskHandle`] as [`PoolError::TaskPanicked`]. The worker moves on to the
//! next task.
mod handle;

pub use handle::TaskHandle;

use serde::Serialize;
use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, trace, warn};

use crate::errors::PoolError;
use crate::metrics::PoolMetrics;

type Job = Box<dyn FnOnce(WorkerId) + Send + 'static>;

/// Identifier of one pool worker, stable for the lifetime of the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct WorkerId(usize);

impl WorkerId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

/// Lifecycle of a [`ThreadPool`]. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    Accepting,
    Draining,
    Stopped,
}

struct Queue {
    tasks: VecDeque<Job>,
    state: PoolState,
}

struct Shared {
    queue: Mutex<Queue>,
    available: Condvar,
    stopped: Condvar,
    metrics: PoolMetrics,
}

impl Shared {
    fn lock_queue(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Fixed-size pool of long-lived worker threads.
pub struct ThreadPool {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    thread_count: usize,
}

impl ThreadPool {
    /// Starts `thread_count` workers. A count of zero is rejected.
    pub fn new(thread_count: usize) -> Result<Self, PoolError> {
        if thread_count == 0 {
            return Err(PoolError::InvalidThreadCount(thread_count));
        }

        let pool = Self {
            shared: Arc::new(Shared {
                queue: Mutex::new(Queue {
                    tasks: VecDeque::new(),
                    state: PoolState::Accepting,
                }),
                available: Condvar::new(),
                stopped: Condvar::new(),
                metrics: PoolMetrics::new(),
            }),
            workers: Mutex::new(Vec::with_capacity(thread_count)),
            thread_count,
        };

        for index in 0..thread_count {
            let id = WorkerId::new(index);
            let shared = Arc::clone(&pool.shared);
            // On error the pool is dropped here, which drains and joins the
            // workers that did start.
            let worker = thread::Builder::new()
                .name(format!("poolgrep-{}", id))
                .spawn(move || run_worker(id, shared))
                .map_err(PoolError::Spawn)?;
            pool.lock_workers().push(worker);
        }

        info!("Started worker pool with {} threads", thread_count);
        Ok(pool)
    }

    /// Queues `work` and returns a handle to its outcome without blocking.
    pub fn submit<F, T>(&self, work: F) -> Result<TaskHandle<T>, PoolError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        self.submit_with_worker(move |_| work())
    }

    /// Like [`submit`](Self::submit), but the task receives the id of the
    /// worker that runs it.
    pub fn submit_with_worker<F, T>(&self, work: F) -> Result<TaskHandle<T>, PoolError>
    where
        F: FnOnce(WorkerId) -> T + Send + 'static,
        T: Send + 'static,
    {
        let (promise, handle) = handle::channel();
        let metrics = self.shared.metrics.clone();

        let job: Job = Box::new(move |worker| {
            match panic::catch_unwind(AssertUnwindSafe(move || work(worker))) {
                Ok(value) => {
                    metrics.record_completed();
                    promise.resolve(Ok(value));
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    warn!("Task on {} panicked: {}", worker, message);
                    metrics.record_panicked();
                    promise.resolve(Err(PoolError::TaskPanicked(message)));
                }
            }
        });

        {
            let mut queue = self.shared.lock_queue();
            if queue.state != PoolState::Accepting {
                self.shared.metrics.record_rejected();
                debug!("Rejected submit while pool is {:?}", queue.state);
                return Err(PoolError::Inactive);
            }
            queue.tasks.push_back(job);
            // Counted before any worker can pop and complete it.
            self.shared.metrics.record_submitted();
        }
        self.shared.available.notify_one();
        Ok(handle)
    }

    /// Stops accepting work, lets the workers drain the queue, and joins them.
    ///
    /// Calling this more than once is harmless. The first call joins the
    /// workers; a call made while that join is in progress blocks until the
    /// pool is [`PoolState::Stopped`]. Calling it from inside a task of the
    /// same pool deadlocks.
    pub fn shutdown(&self) {
        {
            let mut queue = self.shared.lock_queue();
            let state = queue.state;
            match state {
                PoolState::Accepting => {
                    debug!(
                        "Shutting down pool with {} queued tasks",
                        queue.tasks.len()
                    );
                    queue.state = PoolState::Draining;
                }
                PoolState::Draining => {
                    let _stopped = self
                        .shared
                        .stopped
                        .wait_while(queue, |queue| queue.state != PoolState::Stopped)
                        .unwrap_or_else(PoisonError::into_inner);
                    return;
                }
                PoolState::Stopped => return,
            }
        }
        self.shared.available.notify_all();

        let workers = std::mem::take(&mut *self.lock_workers());
        for worker in workers {
            if worker.join().is_err() {
                warn!("Worker thread terminated abnormally");
            }
        }

        self.shared.lock_queue().state = PoolState::Stopped;
        self.shared.stopped.notify_all();
        self.shared.metrics.log_stats();
        info!("Worker pool stopped");
    }

    pub fn state(&self) -> PoolState {
        self.shared.lock_queue().state
    }

    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    /// Tasks waiting in the queue that no worker has picked up yet.
    pub fn queued_tasks(&self) -> usize {
        self.shared.lock_queue().tasks.len()
    }

    pub fn metrics(&self) -> &PoolMetrics {
        &self.shared.metrics
    }

    fn lock_workers(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.workers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadPool")
            .field("thread_count", &self.thread_count)
            .field("state", &self.state())
            .finish()
    }
}

fn run_worker(id: WorkerId, shared: Arc<Shared>) {
    debug!("{} started", id);
    loop {
        let job = {
            let mut queue = shared
                .available
                .wait_while(shared.lock_queue(), |queue| {
                    queue.tasks.is_empty() && queue.state == PoolState::Accepting
                })
                .unwrap_or_else(PoisonError::into_inner);
            match queue.tasks.pop_front() {
                Some(job) => job,
                // Empty and no longer accepting: nothing left to drain.
                None => break,
            }
        };
        trace!("{} running task", id);
        job(id);
    }
    debug!("{} exiting", id);
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
