//! The dual-mode unit of work.
//!
//! A `Task` stands for one accepted request. It is invoked exactly once,
//! either in normal mode (`rejected = false`, do the real work) or in
//! rejected mode (`rejected = true`, write an immediate failure response
//! and release the request's resources).
//!
//! `invoke` consumes the boxed task, so a second invocation cannot be
//! expressed. Any closure `FnOnce(bool) -> TaskResult` is a task.
//!
//! # Usage
//!
//! ```ignore
//! use admit_core::{Task, TaskResult};
//!
//! let task = move |rejected: bool| -> TaskResult {
//!     if rejected {
//!         stream.write_all(b"HTTP/1.1 503 Service Unavailable\r\n\r\n")?;
//!     } else {
//!         handle(stream)?;
//!     }
//!     Ok(())
//! };
//! pool.submit(task);
//! ```

use std::fmt;

use crate::error::TaskError;

/// Result of a single task invocation.
pub type TaskResult = Result<(), TaskError>;

/// A task after ownership has moved into the pool.
pub type BoxTask = Box<dyn Task>;

/// Deferred work for one in-flight request.
pub trait Task: Send + 'static {
    /// Run the task.
    ///
    /// `rejected == false`: the task was admitted, do the normal work.
    /// `rejected == true`: the task was not admitted, produce the failure
    /// response without doing the normal work. This path may run on the
    /// submitting thread and should be fast.
    fn invoke(self: Box<Self>, rejected: bool) -> TaskResult;

    /// Short name for log records.
    fn label(&self) -> &str {
        "task"
    }
}

impl<F> Task for F
where
    F: FnOnce(bool) -> TaskResult + Send + 'static,
{
    fn invoke(self: Box<Self>, rejected: bool) -> TaskResult {
        (*self)(rejected)
    }
}

/// A closure task carrying a label.
pub struct Named<F> {
    label: &'static str,
    f: F,
}

/// Wrap a closure so its log records carry `label`.
pub fn named<F>(label: &'static str, f: F) -> Named<F>
where
    F: FnOnce(bool) -> TaskResult + Send + 'static,
{
    Named { label, f }
}

impl<F> Task for Named<F>
where
    F: FnOnce(bool) -> TaskResult + Send + 'static,
{
    fn invoke(self: Box<Self>, rejected: bool) -> TaskResult {
        let Named { f, .. } = *self;
        f(rejected)
    }

    fn label(&self) -> &str {
        self.label
    }
}

/// The mode a task was invoked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Normal,
    Rejected,
}

impl Mode {
    #[inline]
    pub fn from_rejected(rejected: bool) -> Self {
        if rejected {
            Mode::Rejected
        } else {
            Mode::Normal
        }
    }

    /// The flag passed to `Task::invoke`.
    #[inline]
    pub fn is_rejected(self) -> bool {
        matches!(self, Mode::Rejected)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Normal => "normal",
            Mode::Rejected => "rejected",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================
