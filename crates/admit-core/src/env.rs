//! Environment variable utilities
//!
//! Typed lookups with defaults, used by `PoolConfig::from_env()`.
//!
//! # Usage
//!
//! ```ignore
//! use admit_core::env::{env_get, env_get_str};
//!
//! let workers: usize = env_get("ADMIT_WORKERS", 4);
//! let name = env_get_str("ADMIT_THREAD_NAME", "admit-worker");
//! ```

use std::str::FromStr;

/// Get environment variable parsed as type T, or return default.
///
/// Unset, empty, and unparseable values all fall back to `default`.
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    env_get_opt(key).unwrap_or(default)
}

/// Get environment variable parsed as type T, `None` if unset or invalid.
#[inline]
pub fn env_get_opt<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Get environment variable as string, or return default.
///
/// An empty value counts as unset.
#[inline]
pub fn env_get_str(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => default.to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================
