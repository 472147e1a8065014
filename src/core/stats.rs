//! Queue statistics and lifecycle state.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Acceptance lifecycle of a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    /// Accepting submissions.
    #[default]
    Active,
    /// `stop()` is waiting for running tasks to drain; submissions are rejected.
    Stopping,
    /// Drained and closed; submissions are rejected until `start()`.
    Stopped,
}

/// Point-in-time snapshot of queue state and totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Configured capacity.
    pub capacity: usize,
    /// Effective concurrency limit (clamped to capacity).
    pub concurrency_limit: usize,
    /// Tasks currently holding an execution slot.
    pub running: usize,
    /// Admitted tasks waiting for a slot.
    pub deferred: usize,
    /// Submitters suspended by backpressure.
    pub blocked: usize,
    /// Callers waiting for the queue to go idle.
    pub drain_waiters: usize,
    /// Current lifecycle state.
    pub lifecycle: Lifecycle,
    /// Total submissions admitted.
    pub submitted_tasks: u64,
    /// Total tasks invoked.
    pub started_tasks: u64,
    /// Total tasks finished successfully.
    pub completed_tasks: u64,
    /// Total tasks finished with an error or panic.
    pub failed_tasks: u64,
    /// Slot releases attempted with a running count of zero.
    pub underflows: u64,
}

impl QueueStats {
    /// `running + deferred`, the quantity bounded by capacity.
    pub const fn fullness(&self) -> usize {
        self.running + self.deferred
    }
}

/// Monotonic totals shared between the queue and its spawned tasks.
#[derive(Debug, Default)]
pub(crate) struct QueueCounters {
    pub submitted_tasks: AtomicU64,
    pub started_tasks: AtomicU64,
    pub completed_tasks: AtomicU64,
    pub failed_tasks: AtomicU64,
    pub underflows: AtomicU64,
}

impl QueueCounters {
    /// Copy totals into a stats snapshot.
    pub fn fill(&self, stats: &mut QueueStats) {
        stats.submitted_tasks = self.submitted_tasks.load(Ordering::Relaxed);
        stats.started_tasks = self.started_tasks.load(Ordering::Relaxed);
        stats.completed_tasks = self.completed_tasks.load(Ordering::Relaxed);
        stats.failed_tasks = self.failed_tasks.load(Ordering::Relaxed);
        stats.underflows = self.underflows.load(Ordering::Relaxed);
    }
}
