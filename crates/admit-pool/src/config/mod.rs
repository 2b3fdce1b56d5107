//! Pool Configuration
//!
//! Provides library defaults with runtime environment overrides.
//!
//! # Configuration Priority (highest wins)
//!
//! 1. Builder calls (programmatic, e.g. from CLI flags)
//! 2. Environment variables (runtime)
//! 3. Library defaults
//!
//! # Example
//!
//! ```rust,ignore
//! use admit_pool::config::PoolConfig;
//!
//! // Use defaults with env overrides
//! let config = PoolConfig::from_env();
//!
//! // Or customize programmatically
//! let config = PoolConfig::from_env()
//!     .workers(8)
//!     .queue_capacity(0);
//! ```

pub mod defaults;

use admit_core::env::{env_get, env_get_str};
use admit_core::error::{PoolError, Result};
use tracing::info;

/// Pool configuration with builder pattern.
///
/// `workers` and `queue_capacity` together are the pool's admission
/// capacity: at most `workers` tasks run, at most `queue_capacity` wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of worker threads (`W`)
    pub workers: usize,
    /// Tasks allowed to wait once every worker is busy (`Q`); 0 = no queue
    pub queue_capacity: usize,
    /// Worker thread name prefix
    pub thread_name: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl PoolConfig {
    /// Create config from library defaults with environment overrides.
    ///
    /// Environment variables (all optional):
    /// - `ADMIT_WORKERS` - Number of worker threads
    /// - `ADMIT_QUEUE_CAPACITY` - Queue capacity beyond busy workers
    /// - `ADMIT_THREAD_NAME` - Worker thread name prefix
    pub fn from_env() -> Self {
        Self {
            workers: env_get("ADMIT_WORKERS", defaults::workers()),
            queue_capacity: env_get("ADMIT_QUEUE_CAPACITY", defaults::QUEUE_CAPACITY),
            thread_name: env_get_str("ADMIT_THREAD_NAME", defaults::THREAD_NAME),
        }
    }

    /// Create config with explicit defaults (no env override).
    /// Useful for testing or when you want full control.
    pub fn new() -> Self {
        Self {
            workers: defaults::workers(),
            queue_capacity: defaults::QUEUE_CAPACITY,
            thread_name: defaults::THREAD_NAME.to_string(),
        }
    }

    /// Fixed sizes, default thread name.
    pub fn with_capacity(workers: usize, queue_capacity: usize) -> Self {
        Self::new().workers(workers).queue_capacity(queue_capacity)
    }

    // Builder methods

    pub fn workers(mut self, n: usize) -> Self {
        self.workers = n;
        self
    }

    pub fn queue_capacity(mut self, cap: usize) -> Self {
        self.queue_capacity = cap;
        self
    }

    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Total tasks the pool holds before it starts rejecting.
    pub fn capacity(&self) -> usize {
        self.workers.saturating_add(self.queue_capacity)
    }

    /// Validate configuration and return errors if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(PoolError::InvalidConfig("workers must be > 0"));
        }
        if self.workers > defaults::MAX_WORKERS {
            return Err(PoolError::InvalidConfig("workers must be <= 1024"));
        }
        if self.thread_name.is_empty() {
            return Err(PoolError::InvalidConfig("thread_name must not be empty"));
        }
        Ok(())
    }

    /// Log configuration at info level.
    pub fn log(&self) {
        info!(
            workers = self.workers,
            queue_capacity = self.queue_capacity,
            thread_name = %self.thread_name,
            "pool configuration"
        );
    }
}
