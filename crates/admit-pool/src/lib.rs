//! # admit-pool
//!
//! A bounded worker pool that never blocks and never drops.
//!
//! `W` worker threads plus a FIFO of capacity `Q`. A submission that finds
//! every worker busy and the queue full is not parked and not discarded:
//! the task is invoked right away, on the submitting thread, with
//! `rejected = true`, so it can answer its client with an immediate
//! failure response.
//!
//! ```ignore
//! use admit_pool::{BoundedWorkerPool, PoolConfig};
//!
//! let pool = BoundedWorkerPool::new(PoolConfig::from_env().workers(8).queue_capacity(32))?;
//! match pool.submit(task) {
//!     Admission::Dispatched | Admission::Queued => {}
//!     Admission::Rejected(reason) => eprintln!("overloaded: {}", reason),
//! }
//! ```
//!
//! ## Modules
//!
//! - `pool` - `BoundedWorkerPool` and the admission decision
//! - `policy` - `InvokeRejected`, the default rejection policy
//! - `boundary` - Error boundary around every task invocation
//! - `config` - `PoolConfig` with env overrides
//! - `stats` - Submission and completion counters

pub mod pool;
pub mod policy;
pub mod boundary;
pub mod config;
pub mod stats;

// Re-exports for convenience
pub use pool::BoundedWorkerPool;
pub use policy::InvokeRejected;
pub use boundary::FailureKind;
pub use config::PoolConfig;
pub use stats::{PoolStats, PoolStatsSnapshot};

pub use admit_core::{
    Admission, BoxTask, PoolError, RejectReason, RejectionPolicy, Task, TaskError, TaskResult,
};
