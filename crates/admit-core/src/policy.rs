//! Rejection policy: what a saturated pool does with a task it cannot take.
//!
//! The pool makes the admit/reject decision; the policy only handles the
//! rejected task. It runs synchronously on the submitting thread, after the
//! pool has released its lock.
//!
//! # Implementors
//!
//! - `InvokeRejected` (admit-pool, default): calls `task.invoke(true)`
//!   behind the pool's error boundary so the task writes its own failure
//!   response.

use crate::admission::RejectReason;
use crate::task::{BoxTask, TaskResult};

/// Handles a task the pool refused.
///
/// **Contract:**
/// - Must invoke `task` exactly once (normally with `rejected = true`).
///   Dropping it without invoking leaves the client without a response.
/// - Must not block for long: it runs on the submitter's thread.
/// - Returns the task's own result. The pool logs and counts an `Err`
///   (and a panic) but never retries and never propagates it.
pub trait RejectionPolicy: Send + Sync {
    fn reject(&self, task: BoxTask, reason: RejectReason) -> TaskResult;
}

impl<P: RejectionPolicy + ?Sized> RejectionPolicy for Box<P> {
    fn reject(&self, task: BoxTask, reason: RejectReason) -> TaskResult {
        (**self).reject(task, reason)
    }
}

impl<P: RejectionPolicy + ?Sized> RejectionPolicy for std::sync::Arc<P> {
    fn reject(&self, task: BoxTask, reason: RejectReason) -> TaskResult {
        (**self).reject(task, reason)
    }
}
