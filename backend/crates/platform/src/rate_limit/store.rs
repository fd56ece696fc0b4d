//! Rate-limit counter storage

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::{RateLimitEntry, RateLimitKey, RateLimitPolicy};

#[derive(Debug, Clone, thiserror::Error)]
pub enum RateLimitStoreError {
    #[error("Rate-limit store unavailable: {0}")]
    Unavailable(String),
}

/// Result of counting one request against a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitOutcome {
    pub allowed: bool,
    /// Entry state after the hit
    pub entry: RateLimitEntry,
}

/// Storage backend for fixed-window counters.
///
/// `hit` must be atomic per key: the read, the window check and the
/// increment happen under one lock, so concurrent hits on the same key
/// can never admit more than `policy.limit` requests per window.
#[trait_variant::make(RateLimitStore: Send)]
pub trait LocalRateLimitStore {
    /// Count one request and decide admission.
    async fn hit(
        &self,
        key: &RateLimitKey,
        policy: &RateLimitPolicy,
        now_ms: i64,
    ) -> Result<HitOutcome, RateLimitStoreError>;

    async fn get(&self, key: &RateLimitKey) -> Result<Option<RateLimitEntry>, RateLimitStoreError>;

    async fn remove(&self, key: &RateLimitKey)
    -> Result<Option<RateLimitEntry>, RateLimitStoreError>;

    /// Drop every entry whose window has ended. Returns the number removed.
    async fn sweep_expired(&self, now_ms: i64) -> Result<usize, RateLimitStoreError>;

    async fn len(&self) -> Result<usize, RateLimitStoreError>;
}

/// In-process store backed by a sharded `DashMap`.
///
/// Same-key hits serialize on the shard's write lock; other keys only
/// contend when they land in the same shard.
#[derive(Debug, Default)]
pub struct MemoryRateLimitStore {
    entries: DashMap<RateLimitKey, RateLimitEntry>,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateLimitStore for MemoryRateLimitStore {
    async fn hit(
        &self,
        key: &RateLimitKey,
        policy: &RateLimitPolicy,
        now_ms: i64,
    ) -> Result<HitOutcome, RateLimitStoreError> {
        let outcome = match self.entries.entry(key.clone()) {
            Entry::Vacant(vacant) => {
                let entry = RateLimitEntry::fresh(now_ms, policy);
                vacant.insert(entry);
                HitOutcome {
                    allowed: true,
                    entry,
                }
            }
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                let allowed = if entry.is_expired(now_ms) {
                    *entry = RateLimitEntry::fresh(now_ms, policy);
                    true
                } else if entry.count < policy.limit {
                    entry.count += 1;
                    true
                } else {
                    false
                };
                HitOutcome {
                    allowed,
                    entry: *entry,
                }
            }
        };
        Ok(outcome)
    }

    async fn get(&self, key: &RateLimitKey) -> Result<Option<RateLimitEntry>, RateLimitStoreError> {
        Ok(self.entries.get(key).map(|entry| *entry))
    }

    async fn remove(
        &self,
        key: &RateLimitKey,
    ) -> Result<Option<RateLimitEntry>, RateLimitStoreError> {
        Ok(self.entries.remove(key).map(|(_, entry)| entry))
    }

    async fn sweep_expired(&self, now_ms: i64) -> Result<usize, RateLimitStoreError> {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now_ms));
        Ok(before.saturating_sub(self.entries.len()))
    }

    async fn len(&self) -> Result<usize, RateLimitStoreError> {
        Ok(self.entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::{MemoryRateLimitStore, RateLimitKey, RateLimitPolicy, RateLimitStore};
    use crate::rate_limit::OperationClass;

    fn key(client: &str) -> RateLimitKey {
        RateLimitKey::new(client, OperationClass::Authentication)
    }

    fn policy() -> RateLimitPolicy {
        RateLimitPolicy::new(2, 10)
    }

    #[tokio::test]
    async fn test_hit_counts_until_limit() {
        let store = MemoryRateLimitStore::new();

        let first = store.hit(&key("a"), &policy(), 0).await.unwrap();
        assert!(first.allowed);
        assert_eq!(first.entry.count, 1);
        assert_eq!(first.entry.reset_at_ms, 10_000);

        assert!(store.hit(&key("a"), &policy(), 1).await.unwrap().allowed);

        let third = store.hit(&key("a"), &policy(), 2).await.unwrap();
        assert!(!third.allowed);
        assert_eq!(third.entry.count, 2);
    }

    #[tokio::test]
    async fn test_hit_at_reset_instant_starts_new_window() {
        let store = MemoryRateLimitStore::new();
        store.hit(&key("a"), &policy(), 0).await.unwrap();
        store.hit(&key("a"), &policy(), 0).await.unwrap();

        let reborn = store.hit(&key("a"), &policy(), 10_000).await.unwrap();
        assert!(reborn.allowed);
        assert_eq!(reborn.entry.count, 1);
        assert_eq!(reborn.entry.reset_at_ms, 20_000);
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired_entries() {
        let store = MemoryRateLimitStore::new();
        store.hit(&key("old"), &policy(), 0).await.unwrap();
        store.hit(&key("new"), &policy(), 5_000).await.unwrap();

        let removed = store.sweep_expired(10_000).await.unwrap();

        assert_eq!(removed, 1);
        assert_eq!(store.len().await.unwrap(), 1);
        assert!(store.get(&key("old")).await.unwrap().is_none());
        assert!(store.get(&key("new")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_remove_forgets_key() {
        let store = MemoryRateLimitStore::new();
        store.hit(&key("a"), &policy(), 0).await.unwrap();

        assert!(store.remove(&key("a")).await.unwrap().is_some());
        assert_eq!(store.len().await.unwrap(), 0);
    }
}
