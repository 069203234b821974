//! Storage backends for rate limiting.

use std::time::Duration;

pub mod memory;

pub use memory::InMemoryStorage;

/// Result type for rate limit admission checks.
pub struct RateLimitResult {
    /// Whether a slot was reserved for the request.
    pub allowed: bool,
    /// Time to wait before retrying if not allowed.
    pub retry_after: Option<Duration>,
}

/// Trait for rate limit storage backends.
///
/// Admission is two-phase: `check_and_reserve` takes a slot atomically, and
/// the caller settles every granted reservation with exactly one `commit`
/// (the slot counts against quota) or `release` (the slot is returned).
#[allow(async_fn_in_trait)]
pub trait RateLimitStorage: Send + Sync {
    /// Atomically check the counter for the given key and reserve a slot
    /// when the active window has capacity left.
    async fn check_and_reserve(
        &self,
        key: &str,
        limit: u32,
        window: Duration,
    ) -> Result<RateLimitResult, StorageError>;

    /// Turn a reserved slot into a committed deduction.
    async fn commit(&self, key: &str) -> Result<(), StorageError>;

    /// Return a reserved slot without consuming quota.
    async fn release(&self, key: &str) -> Result<(), StorageError>;

    /// Drop counters whose window has expired, returning how many were
    /// removed.
    async fn prune_expired(&self) -> Result<usize, StorageError>;
}

/// Errors that can occur in storage backends.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Internal storage error.
    #[error("Storage error: {0}")]
    Internal(String),
}
