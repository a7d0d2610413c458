use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};

use crate::commute::cache::{CacheError, CommuteCacheEntry, CommuteStore};
use crate::commute::postcode::PostcodePair;

const KEY_PREFIX: &str = "commute";

/// Value stored under each key. The pair itself lives in the key.
#[derive(Debug, Serialize, Deserialize)]
struct StoredCommute {
    minutes: u32,
    retrieved_at: DateTime<Utc>,
}

fn cache_key(pair: &PostcodePair) -> String {
    format!("{KEY_PREFIX}:{}:{}", pair.origin(), pair.destination())
}

/// Redis-backed store. `SET` replaces the whole value, so last write wins.
pub struct RedisCommuteStore {
    client: redis::Client,
}

impl RedisCommuteStore {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CommuteStore for RedisCommuteStore {
    async fn load(&self, pairs: &[PostcodePair]) -> Result<Vec<CommuteCacheEntry>, CacheError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let keys: Vec<String> = pairs.iter().map(cache_key).collect();

        let values: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut conn)
            .await?;

        let mut entries = Vec::new();
        for (pair, value) in pairs.iter().zip(values) {
            let Some(raw) = value else { continue };
            let stored: StoredCommute = serde_json::from_str(&raw)?;
            entries.push(CommuteCacheEntry {
                pair: pair.clone(),
                minutes: stored.minutes,
                retrieved_at: stored.retrieved_at,
            });
        }
        Ok(entries)
    }

    async fn save(&self, entry: &CommuteCacheEntry) -> Result<(), CacheError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let value = serde_json::to_string(&StoredCommute {
            minutes: entry.minutes,
            retrieved_at: entry.retrieved_at,
        })?;
        conn.set::<_, _, ()>(cache_key(&entry.pair), value).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
