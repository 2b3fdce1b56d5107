//! Error types for admit.

use std::io;

/// Failure returned from `Task::invoke`.
///
/// The pool never retries on these; it logs and counts them.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// Writing the response or reading the request failed.
    #[error("task I/O: {0}")]
    Io(#[from] io::Error),

    /// Any other task-defined failure.
    #[error("task failed: {0}")]
    Failed(String),

    /// The task panicked; the payload message, if it had one.
    #[error("task panicked: {0}")]
    Panicked(String),
}

impl TaskError {
    pub fn failed(msg: impl Into<String>) -> Self {
        TaskError::Failed(msg.into())
    }
}

/// Errors from building or running the pool itself.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// Configuration rejected by `validate()`.
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),

    /// The OS refused to spawn a worker thread.
    #[error("failed to spawn worker thread {worker}: {source}")]
    Spawn {
        worker: usize,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, PoolError>;
