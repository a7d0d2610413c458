//! Commute Cache: normalized postcode pair → travel minutes, consulted before any
//! external distance call.
//!
//! `CommuteCache` owns the freshness policy; the durable part sits behind the
//! `CommuteStore` trait (Postgres, Redis, or in-memory for tests and local runs).
//! Stores must make `save` atomic per key with last-write-wins semantics.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::commute::postcode::PostcodePair;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Stored value out of range for {pair}: {value}")]
    OutOfRange { pair: PostcodePair, value: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommuteCacheEntry {
    pub pair: PostcodePair,
    pub minutes: u32,
    pub retrieved_at: DateTime<Utc>,
}

impl CommuteCacheEntry {
    pub fn new(pair: PostcodePair, minutes: u32) -> Self {
        Self {
            pair,
            minutes,
            retrieved_at: Utc::now(),
        }
    }

    /// An entry is trusted only while it is younger than `max_age`.
    /// `None` means entries never go stale.
    pub fn is_fresh(&self, now: DateTime<Utc>, max_age: Option<Duration>) -> bool {
        match max_age {
            Some(max_age) => now - self.retrieved_at <= max_age,
            None => true,
        }
    }
}

/// Durable key/value backend for commute entries.
#[async_trait]
pub trait CommuteStore: Send + Sync {
    /// Returns the stored entries for the requested pairs; missing pairs are omitted.
    async fn load(&self, pairs: &[PostcodePair]) -> Result<Vec<CommuteCacheEntry>, CacheError>;

    /// Inserts or overwrites the entry for `entry.pair`. Never merges.
    async fn save(&self, entry: &CommuteCacheEntry) -> Result<(), CacheError>;

    fn name(&self) -> &'static str;
}

/// The cache the resolver and generator talk to.
#[derive(Clone)]
pub struct CommuteCache {
    store: Arc<dyn CommuteStore>,
    max_age: Option<Duration>,
}

impl CommuteCache {
    pub fn new(store: Arc<dyn CommuteStore>, max_age: Option<Duration>) -> Self {
        Self { store, max_age }
    }

    /// In-memory cache with no expiry.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCommuteStore::default()), None)
    }

    pub fn backend(&self) -> &'static str {
        self.store.name()
    }

    pub async fn get(&self, pair: &PostcodePair) -> Result<Option<u32>, CacheError> {
        let hits = self.get_many(std::slice::from_ref(pair)).await?;
        Ok(hits.get(pair).copied())
    }

    pub async fn put(&self, pair: &PostcodePair, minutes: u32) -> Result<(), CacheError> {
        self.store
            .save(&CommuteCacheEntry::new(pair.clone(), minutes))
            .await
    }

    /// Returns only fresh hits; misses and stale entries are omitted.
    pub async fn get_many(
        &self,
        pairs: &[PostcodePair],
    ) -> Result<HashMap<PostcodePair, u32>, CacheError> {
        if pairs.is_empty() {
            return Ok(HashMap::new());
        }

        let now = Utc::now();
        let entries = self.store.load(pairs).await?;
        Ok(entries
            .into_iter()
            .filter(|entry| entry.is_fresh(now, self.max_age))
            .map(|entry| (entry.pair, entry.minutes))
            .collect())
    }
}

/// Process-local store. Used by tests and `COMMUTE_CACHE_BACKEND=memory`.
#[derive(Default)]
pub struct MemoryCommuteStore {
    entries: RwLock<HashMap<PostcodePair, CommuteCacheEntry>>,
}

#[cfg(test)]
impl MemoryCommuteStore {
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Seeds an entry with an explicit timestamp.
    pub async fn insert(&self, entry: CommuteCacheEntry) {
        self.entries.write().await.insert(entry.pair.clone(), entry);
    }
}

#[async_trait]
impl CommuteStore for MemoryCommuteStore {
    async fn load(&self, pairs: &[PostcodePair]) -> Result<Vec<CommuteCacheEntry>, CacheError> {
        let entries = self.entries.read().await;
        Ok(pairs
            .iter()
            .filter_map(|pair| entries.get(pair).cloned())
            .collect())
    }

    async fn save(&self, entry: &CommuteCacheEntry) -> Result<(), CacheError> {
        self.entries
            .write()
            .await
            .insert(entry.pair.clone(), entry.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_then_get_round_trip() {
        let cache = CommuteCache::in_memory();
        let pair = PostcodePair::new("SW1A 1AA", "M1 1AE");

        cache.put(&pair, 42).await.unwrap();

        assert_eq!(cache.get(&pair).await.unwrap(), Some(42));
        // Same key regardless of spacing/case.
        let respelled = PostcodePair::new("sw1a1aa", "m11ae");
        assert_eq!(cache.get(&respelled).await.unwrap(), Some(42));
    }

    #[tokio::test]
    async fn test_get_many_omits_misses() {
        let cache = CommuteCache::in_memory();
        let hit = PostcodePair::new("A1", "B1");
        let miss = PostcodePair::new("A1", "C1");
        cache.put(&hit, 12).await.unwrap();

        let hits = cache.get_many(&[hit.clone(), miss.clone()]).await.unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits.get(&hit), Some(&12));
        assert!(!hits.contains_key(&miss));
    }

    #[tokio::test]
    async fn test_put_overwrites_existing_entry() {
        let cache = CommuteCache::in_memory();
        let pair = PostcodePair::new("A1", "B1");
        cache.put(&pair, 30).await.unwrap();
        cache.put(&pair, 25).await.unwrap();
        assert_eq!(cache.get(&pair).await.unwrap(), Some(25));
    }

    #[tokio::test]
    async fn test_stale_entries_are_misses() {
        let store = Arc::new(MemoryCommuteStore::default());
        let pair = PostcodePair::new("A1", "B1");
        store
            .insert(CommuteCacheEntry {
                pair: pair.clone(),
                minutes: 15,
                retrieved_at: Utc::now() - Duration::days(40),
            })
            .await;

        let expiring = CommuteCache::new(store.clone(), Some(Duration::days(30)));
        assert_eq!(expiring.get(&pair).await.unwrap(), None);

        let permanent = CommuteCache::new(store, None);
        assert_eq!(permanent.get(&pair).await.unwrap(), Some(15));
    }

    #[tokio::test]
    async fn test_concurrent_writers_last_write_wins() {
        let store = Arc::new(MemoryCommuteStore::default());
        let cache = CommuteCache::new(store.clone(), None);
        let pair = PostcodePair::new("A1", "B1");

        let mut handles = Vec::new();
        for minutes in 0..16u32 {
            let cache = cache.clone();
            let pair = pair.clone();
            handles.push(tokio::spawn(async move { cache.put(&pair, minutes).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.len().await, 1);
        let stored = cache.get(&pair).await.unwrap().unwrap();
        assert!(stored < 16);
    }

    #[test]
    fn test_entry_freshness_boundary() {
        let now = Utc::now();
        let entry = CommuteCacheEntry {
            pair: PostcodePair::new("A1", "B1"),
            minutes: 10,
            retrieved_at: now - Duration::days(7),
        };
        assert!(entry.is_fresh(now, Some(Duration::days(7))));
        assert!(!entry.is_fresh(now, Some(Duration::days(6))));
        assert!(entry.is_fresh(now, None));
    }
}
