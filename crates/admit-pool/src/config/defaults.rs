//! Library defaults for `PoolConfig`.
//!
//! Environment variables override these at runtime (see `PoolConfig::from_env`).

/// Pending tasks allowed beyond the busy workers.
pub const QUEUE_CAPACITY: usize = 64;

/// Prefix for worker thread names; the worker index is appended.
pub const THREAD_NAME: &str = "admit-worker";

/// Worker count when the platform cannot report its parallelism.
pub const FALLBACK_WORKERS: usize = 4;

/// Upper bound accepted by `validate()`.
pub const MAX_WORKERS: usize = 1024;

/// One worker per available CPU.
pub fn workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(FALLBACK_WORKERS)
}
