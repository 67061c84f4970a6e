use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Tracks task throughput for a worker pool
#[derive(Debug, Clone)]
pub struct PoolMetrics {
    tasks_submitted: Arc<AtomicU64>,
    tasks_rejected: Arc<AtomicU64>,
    tasks_completed: Arc<AtomicU64>,
    tasks_panicked: Arc<AtomicU64>,
}

impl PoolMetrics {
    /// Creates a new PoolMetrics instance
    pub fn new() -> Self {
        Self {
            tasks_submitted: Arc::new(AtomicU64::new(0)),
            tasks_rejected: Arc::new(AtomicU64::new(0)),
            tasks_completed: Arc::new(AtomicU64::new(0)),
            tasks_panicked: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Records a task accepted into the queue
    pub fn record_submitted(&self) {
        let total = self.tasks_submitted.fetch_add(1, Ordering::Relaxed) + 1;
        debug!("Task submitted, total submitted: {}", total);
    }

    /// Records a submission refused because the pool is shutting down
    pub fn record_rejected(&self) {
        self.tasks_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a task that ran to completion
    pub fn record_completed(&self) {
        self.tasks_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a task whose body panicked
    pub fn record_panicked(&self) {
        self.tasks_panicked.fetch_add(1, Ordering::Relaxed);
    }

    /// Gets current task statistics
    pub fn get_stats(&self) -> PoolStats {
        PoolStats {
            submitted: self.tasks_submitted.load(Ordering::Relaxed),
            rejected: self.tasks_rejected.load(Ordering::Relaxed),
            completed: self.tasks_completed.load(Ordering::Relaxed),
            panicked: self.tasks_panicked.load(Ordering::Relaxed),
        }
    }

    /// Logs current task statistics
    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Pool task stats:\n\
             Submitted: {}\n\
             Rejected: {}\n\
             Completed/panicked: {}/{}",
            stats.submitted, stats.rejected, stats.completed, stats.panicked
        );
    }
}

impl Default for PoolMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of pool task counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub submitted: u64,
    pub rejected: u64,
    pub completed: u64,
    pub panicked: u64,
}

impl PoolStats {
    /// Tasks that have been accepted but have not finished yet
    pub fn in_flight(&self) -> u64 {
        self.submitted
            .saturating_sub(self.completed)
            .saturating_sub(self.panicked)
    }
}
