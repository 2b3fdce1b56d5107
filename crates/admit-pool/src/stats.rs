//! Pool counters.
//!
//! Relaxed `AtomicU64`s bumped by the pool as tasks move through it.
//! They are for reporting only; admission decisions never read them.

use std::sync::atomic::{AtomicU64, Ordering};

use admit_core::{Admission, RejectReason};

#[derive(Debug, Default)]
pub struct PoolStats {
    submitted: AtomicU64,
    dispatched: AtomicU64,
    queued: AtomicU64,
    rejected_saturated: AtomicU64,
    rejected_shutdown: AtomicU64,
    drained: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

/// Point-in-time copy of `PoolStats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStatsSnapshot {
    /// Calls to `submit`.
    pub submitted: u64,
    /// Handed straight to a free worker.
    pub dispatched: u64,
    /// Parked in the FIFO behind busy workers.
    pub queued: u64,
    /// Refused because every worker was busy and the queue full.
    pub rejected_saturated: u64,
    /// Refused because the pool was shutting down.
    pub rejected_shutdown: u64,
    /// Queued tasks invoked in rejected mode by `shutdown()`.
    pub drained: u64,
    /// Invocations that returned, in either mode.
    pub completed: u64,
    /// Invocations that returned `Err` or panicked.
    pub failed: u64,
}

impl PoolStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_admission(&self, admission: Admission) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
        let counter = match admission {
            Admission::Dispatched => &self.dispatched,
            Admission::Queued => &self.queued,
            Admission::Rejected(RejectReason::Saturated) => &self.rejected_saturated,
            Admission::Rejected(RejectReason::ShuttingDown) => &self.rejected_shutdown,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_drained(&self) {
        self.drained.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_completion(&self, ok: bool) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> PoolStatsSnapshot {
        PoolStatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            queued: self.queued.load(Ordering::Relaxed),
            rejected_saturated: self.rejected_saturated.load(Ordering::Relaxed),
            rejected_shutdown: self.rejected_shutdown.load(Ordering::Relaxed),
            drained: self.drained.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

impl PoolStatsSnapshot {
    /// Rejections for any reason.
    pub fn rejected(&self) -> u64 {
        self.rejected_saturated + self.rejected_shutdown
    }

    /// Dispatched or queued.
    pub fn accepted(&self) -> u64 {
        self.dispatched + self.queued
    }
}
