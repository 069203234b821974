//! Error types for rate limiting.

use crate::storage::StorageError;
use std::time::Duration;

/// Errors that can occur during rate limiting.
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    /// Route-specific rate limit exceeded for a client.
    #[error("Rate limit exceeded for {route}")]
    RouteLimitExceeded {
        /// Name of the route that exceeded the limit.
        route: String,
        /// Time to wait before retrying.
        retry_after: Duration,
    },

    /// Storage backend error.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl RateLimitError {
    /// Get the retry-after duration if available.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RouteLimitExceeded { retry_after, .. } => Some(*retry_after),
            Self::Storage(_) => None,
        }
    }
}
