//! Rate limit manager implementation.

use std::collections::BTreeMap;
use std::net::IpAddr;

use config::{RateLimitConfig, RateLimitQuota};
use http::StatusCode;

use crate::error::RateLimitError;
use crate::storage::{InMemoryStorage, RateLimitStorage};

/// A slot reserved at admission time.
///
/// The reservation holds capacity in the client's window while the request
/// is in flight and must be settled with exactly one call to
/// [`RateLimitManager::record_outcome`].
#[derive(Debug)]
#[must_use = "reservations must be settled with record_outcome"]
pub struct Reservation {
    key: String,
}

/// Manager for per-client, per-route rate limiting.
pub struct RateLimitManager {
    config: RateLimitConfig,
    /// Quota rules by route name, immutable after startup.
    routes: BTreeMap<String, RateLimitQuota>,
    storage: InMemoryStorage,
}

impl RateLimitManager {
    /// Create a new rate limit manager with in-memory storage.
    pub fn new(config: RateLimitConfig, routes: BTreeMap<String, RateLimitQuota>) -> Self {
        Self {
            config,
            routes,
            storage: InMemoryStorage::new(),
        }
    }

    /// Check whether any rate limiting is in effect.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled && !self.routes.is_empty()
    }

    /// Check the route's quota for a client and reserve a slot.
    ///
    /// Returns `Ok(None)` when rate limiting is disabled or the route has no
    /// configured rule. A granted reservation counts against the window
    /// until it is settled, so concurrent requests cannot be admitted past
    /// the quota.
    pub async fn check_and_reserve(
        &self,
        ip: IpAddr,
        route: &str,
    ) -> Result<Option<Reservation>, RateLimitError> {
        if !self.config.enabled {
            return Ok(None);
        }

        let Some(quota) = self.routes.get(route) else {
            log::debug!("No rate limit configured for route {route} - skipping");
            return Ok(None);
        };

        let key = format!("ip:{ip}:route:{route}");

        let result = self
            .storage
            .check_and_reserve(&key, quota.limit, quota.interval)
            .await?;

        if !result.allowed {
            return Err(RateLimitError::RouteLimitExceeded {
                route: route.to_string(),
                retry_after: result.retry_after.unwrap_or_default(),
            });
        }

        Ok(Some(Reservation { key }))
    }

    /// Settle a reservation with the final response status.
    ///
    /// Both shipped routes share the same deduction rule: only a 200
    /// response consumes quota. Any other outcome returns the reserved slot,
    /// so rejected, failed, and fixture responses are free.
    pub async fn record_outcome(
        &self,
        reservation: Reservation,
        status: StatusCode,
    ) -> Result<(), RateLimitError> {
        if status == StatusCode::OK {
            self.storage.commit(&reservation.key).await?;
        } else {
            self.storage.release(&reservation.key).await?;
        }

        Ok(())
    }

    /// Drop counters whose window has expired, returning how many were
    /// removed.
    pub async fn prune_expired(&self) -> Result<usize, RateLimitError> {
        Ok(self.storage.prune_expired().await?)
    }
}
