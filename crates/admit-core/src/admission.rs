//! Outcome of a single `submit` call.

use std::fmt;

/// Where a submitted task went.
///
/// Every variant is terminal from the submitter's point of view: the task
/// has been handed to a worker, parked in the FIFO, or already invoked in
/// rejected mode on the submitting thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Admission {
    /// A worker was free; the task will run with `rejected = false`.
    Dispatched,
    /// All workers busy but the queue had room; the task will run with
    /// `rejected = false` once a worker frees up.
    Queued,
    /// The task was run through the rejection policy before `submit` returned.
    Rejected(RejectReason),
}

/// Why a task was not admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    /// Every worker busy and the queue full.
    Saturated,
    /// The pool is shutting down or already stopped.
    ShuttingDown,
}

impl Admission {
    /// Dispatched or queued.
    #[inline]
    pub fn is_accepted(&self) -> bool {
        !self.is_rejected()
    }

    #[inline]
    pub fn is_rejected(&self) -> bool {
        matches!(self, Admission::Rejected(_))
    }

    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            Admission::Rejected(reason) => Some(*reason),
            _ => None,
        }
    }
}

impl RejectReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RejectReason::Saturated => "saturated",
            RejectReason::ShuttingDown => "shutting down",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Admission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Admission::Dispatched => write!(f, "dispatched"),
            Admission::Queued => write!(f, "queued"),
            Admission::Rejected(reason) => write!(f, "rejected ({})", reason),
        }
    }
}
