//! In-memory fixed-window rate limit storage.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use super::{RateLimitResult, RateLimitStorage, StorageError};

/// Counter state for one (client, route) pair within its current window.
#[derive(Debug)]
struct WindowCounter {
    /// Deductions committed in the active window.
    committed: u32,
    /// Slots reserved by requests whose outcome is not yet known.
    reserved: u32,
    window_start: Instant,
    window: Duration,
}

impl WindowCounter {
    fn new(window: Duration) -> Self {
        Self {
            committed: 0,
            reserved: 0,
            window_start: Instant::now(),
            window,
        }
    }

    fn expired(&self) -> bool {
        self.window_start.elapsed() >= self.window
    }

    fn reset(&mut self, window: Duration) {
        self.committed = 0;
        self.reserved = 0;
        self.window_start = Instant::now();
        self.window = window;
    }

    fn in_use(&self) -> u32 {
        self.committed + self.reserved
    }

    fn remaining(&self) -> Duration {
        self.window.saturating_sub(self.window_start.elapsed())
    }
}

/// In-memory rate limit storage implementation.
///
/// Counters are created lazily per key and live until pruned. Per-key
/// atomicity comes from the map's shard locks: an admission check and the
/// reservation it grants happen under the same lock, so concurrent requests
/// from one client can never reserve past the limit.
pub struct InMemoryStorage {
    counters: DashMap<String, WindowCounter>,
}

impl InMemoryStorage {
    /// Create a new in-memory storage instance.
    pub fn new() -> Self {
        Self {
            counters: DashMap::new(),
        }
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimitStorage for InMemoryStorage {
    async fn check_and_reserve(
        &self,
        key: &str,
        limit: u32,
        window: Duration,
    ) -> Result<RateLimitResult, StorageError> {
        let mut entry = self
            .counters
            .entry(key.to_owned())
            .or_insert_with(|| WindowCounter::new(window));
        let counter = entry.value_mut();

        if counter.expired() {
            counter.reset(window);
        }

        if counter.in_use() < limit {
            counter.reserved += 1;

            log::debug!(
                "Reserved rate limit slot for key '{key}': {} of {limit} in use",
                counter.in_use()
            );

            Ok(RateLimitResult {
                allowed: true,
                retry_after: None,
            })
        } else {
            let retry_after = counter.remaining();

            log::debug!("Rate limit window full for key '{key}', retry after {retry_after:?}");

            Ok(RateLimitResult {
                allowed: false,
                retry_after: Some(retry_after),
            })
        }
    }

    async fn commit(&self, key: &str) -> Result<(), StorageError> {
        if let Some(mut entry) = self.counters.get_mut(key) {
            let counter = entry.value_mut();
            counter.reserved = counter.reserved.saturating_sub(1);

            // A commit landing after its window expired is dropped; the
            // counter resets at the next admission anyway.
            if !counter.expired() {
                counter.committed += 1;
            }
        }

        Ok(())
    }

    async fn release(&self, key: &str) -> Result<(), StorageError> {
        if let Some(mut entry) = self.counters.get_mut(key) {
            let counter = entry.value_mut();
            counter.reserved = counter.reserved.saturating_sub(1);
        }

        Ok(())
    }

    async fn prune_expired(&self) -> Result<usize, StorageError> {
        let before = self.counters.len();

        // Keep entries with in-flight reservations even when expired, so a
        // late settle still finds its counter.
        self.counters
            .retain(|_, counter| counter.reserved > 0 || !counter.expired());

        Ok(before.saturating_sub(self.counters.len()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    const WINDOW: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn reserves_up_to_limit() {
        let storage = InMemoryStorage::new();

        for _ in 0..2 {
            let result = storage.check_and_reserve("ip:1.1.1.1:route:search", 2, WINDOW).await.unwrap();
            assert!(result.allowed);
        }

        let result = storage.check_and_reserve("ip:1.1.1.1:route:search", 2, WINDOW).await.unwrap();
        assert!(!result.allowed);

        let retry_after = result.retry_after.unwrap();
        assert!(retry_after <= WINDOW);
        assert!(retry_after > Duration::from_secs(50));
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let storage = InMemoryStorage::new();

        let result = storage.check_and_reserve("ip:1.1.1.1:route:search", 1, WINDOW).await.unwrap();
        assert!(result.allowed);

        let result = storage.check_and_reserve("ip:2.2.2.2:route:search", 1, WINDOW).await.unwrap();
        assert!(result.allowed);

        let result = storage.check_and_reserve("ip:1.1.1.1:route:ingredients", 1, WINDOW).await.unwrap();
        assert!(result.allowed);
    }

    #[tokio::test]
    async fn release_returns_capacity() {
        let storage = InMemoryStorage::new();

        assert!(storage.check_and_reserve("key", 1, WINDOW).await.unwrap().allowed);
        assert!(!storage.check_and_reserve("key", 1, WINDOW).await.unwrap().allowed);

        storage.release("key").await.unwrap();

        assert!(storage.check_and_reserve("key", 1, WINDOW).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn commit_consumes_quota() {
        let storage = InMemoryStorage::new();

        assert!(storage.check_and_reserve("key", 1, WINDOW).await.unwrap().allowed);
        storage.commit("key").await.unwrap();

        assert!(!storage.check_and_reserve("key", 1, WINDOW).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn settling_unknown_keys_is_a_no_op() {
        let storage = InMemoryStorage::new();

        storage.commit("missing").await.unwrap();
        storage.release("missing").await.unwrap();
    }

    #[tokio::test]
    async fn window_expiry_resets_counter() {
        let storage = InMemoryStorage::new();
        let window = Duration::from_millis(50);

        assert!(storage.check_and_reserve("key", 1, window).await.unwrap().allowed);
        storage.commit("key").await.unwrap();
        assert!(!storage.check_and_reserve("key", 1, window).await.unwrap().allowed);

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(storage.check_and_reserve("key", 1, window).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn late_commit_does_not_charge_the_new_window() {
        let storage = InMemoryStorage::new();
        let window = Duration::from_millis(50);

        assert!(storage.check_and_reserve("key", 1, window).await.unwrap().allowed);

        tokio::time::sleep(Duration::from_millis(80)).await;

        storage.commit("key").await.unwrap();

        assert!(storage.check_and_reserve("key", 1, window).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn prune_drops_expired_entries() {
        let storage = InMemoryStorage::new();
        let window = Duration::from_millis(50);

        assert!(storage.check_and_reserve("stale", 1, window).await.unwrap().allowed);
        storage.commit("stale").await.unwrap();
        assert!(storage.check_and_reserve("fresh", 1, WINDOW).await.unwrap().allowed);
        storage.commit("fresh").await.unwrap();

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert_eq!(1, storage.prune_expired().await.unwrap());
        assert_eq!(0, storage.prune_expired().await.unwrap());
    }

    #[tokio::test]
    async fn prune_keeps_in_flight_reservations() {
        let storage = InMemoryStorage::new();
        let window = Duration::from_millis(50);

        assert!(storage.check_and_reserve("key", 1, window).await.unwrap().allowed);

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert_eq!(0, storage.prune_expired().await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_reserves_cap_at_limit() {
        let storage = Arc::new(InMemoryStorage::new());

        let mut handles = Vec::new();

        for _ in 0..20 {
            let storage = storage.clone();

            handles.push(tokio::spawn(async move {
                storage.check_and_reserve("key", 5, WINDOW).await.unwrap().allowed
            }));
        }

        let mut allowed = 0;

        for handle in handles {
            if handle.await.unwrap() {
                allowed += 1;
            }
        }

        assert_eq!(5, allowed);
    }
}
