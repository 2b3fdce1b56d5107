//! Error boundary around task invocation.
//!
//! Every invocation, on a worker or on the submitting thread, goes through
//! here. A returned `Err` and a panic both end up as a `TaskError`; neither
//! escapes into the pool, so worker threads stay alive and the pool's
//! counters stay consistent.

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

use admit_core::task::Mode;
use admit_core::{BoxTask, TaskError, TaskResult};
use tracing::error;

/// Where a failed invocation happened, for the log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// `invoke` failed on a worker or in the rejection path of `submit`.
    TaskInvocation,
    /// A queued task's forced rejection during `shutdown()` failed.
    ShutdownDrain,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::TaskInvocation => write!(f, "task invocation"),
            FailureKind::ShutdownDrain => write!(f, "shutdown drain"),
        }
    }
}

/// Invoke `task` in `mode`, turning a panic into `TaskError::Panicked`.
pub fn invoke(task: BoxTask, mode: Mode) -> TaskResult {
    catch(|| task.invoke(mode.is_rejected()))
}

/// Run `f`, turning a panic into `TaskError::Panicked`.
pub(crate) fn catch<F>(f: F) -> TaskResult
where
    F: FnOnce() -> TaskResult,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(TaskError::Panicked(panic_message(payload.as_ref()))),
    }
}

/// Log a failed invocation.
pub(crate) fn report(kind: FailureKind, label: &str, mode: Mode, err: &TaskError) {
    error!(task = label, mode = %mode, kind = %kind, error = %err, "task failed");
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
