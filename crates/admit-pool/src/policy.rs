//! `InvokeRejected`, the default `RejectionPolicy`.
//!
//! Fail fast: the refused task is invoked with `rejected = true` on the
//! submitting thread so it can write its own failure response
//! (e.g. `503 Service Unavailable`). Nothing is queued, nothing dropped.

use admit_core::task::Mode;
use admit_core::{BoxTask, RejectReason, RejectionPolicy, TaskResult};
use tracing::debug;

use crate::boundary;

#[derive(Debug, Clone, Copy, Default)]
pub struct InvokeRejected;

impl RejectionPolicy for InvokeRejected {
    fn reject(&self, task: BoxTask, reason: RejectReason) -> TaskResult {
        debug!(task = task.label(), reason = %reason, "invoking task in rejected mode");
        boundary::invoke(task, Mode::Rejected)
    }
}
