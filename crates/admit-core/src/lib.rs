//! # admit-core
//!
//! Core types for the admit bounded worker pool.
//!
//! This crate has no threads and no I/O. It defines the contract between
//! the request-acceptance layer, the pool, and the work itself.
//! The pool implementation lives in `admit-pool`.
//!
//! ## Modules
//!
//! - `task` - The dual-mode `Task` trait (normal vs rejected invocation)
//! - `admission` - Tagged outcome of a submission
//! - `policy` - What a saturated pool does with a task it cannot take
//! - `error` - Error types
//! - `env` - Environment variable utilities

pub mod task;
pub mod admission;
pub mod policy;
pub mod error;
pub mod env;

// Re-exports for convenience
pub use task::{named, BoxTask, Mode, Task, TaskResult};
pub use admission::{Admission, RejectReason};
pub use policy::RejectionPolicy;
pub use error::{PoolError, TaskError};
pub use env::{env_get, env_get_str};
