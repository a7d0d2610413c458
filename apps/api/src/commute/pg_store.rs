use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use crate::commute::cache::{CacheError, CommuteCacheEntry, CommuteStore};
use crate::commute::postcode::PostcodePair;

#[derive(Debug, FromRow)]
struct CommuteCacheRow {
    origin: String,
    destination: String,
    minutes: i32,
    retrieved_at: DateTime<Utc>,
}

impl TryFrom<CommuteCacheRow> for CommuteCacheEntry {
    type Error = CacheError;

    fn try_from(row: CommuteCacheRow) -> Result<Self, Self::Error> {
        let pair = PostcodePair::new(&row.origin, &row.destination);
        let minutes = u32::try_from(row.minutes).map_err(|_| CacheError::OutOfRange {
            pair: pair.clone(),
            value: i64::from(row.minutes),
        })?;
        Ok(CommuteCacheEntry {
            pair,
            minutes,
            retrieved_at: row.retrieved_at,
        })
    }
}

/// `commute_cache` table, keyed by (origin, destination).
pub struct PgCommuteStore {
    pool: PgPool,
}

impl PgCommuteStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommuteStore for PgCommuteStore {
    async fn load(&self, pairs: &[PostcodePair]) -> Result<Vec<CommuteCacheEntry>, CacheError> {
        let origins: Vec<String> = pairs.iter().map(|p| p.origin().to_string()).collect();
        let destinations: Vec<String> = pairs
            .iter()
            .map(|p| p.destination().to_string())
            .collect();

        let rows = sqlx::query_as::<_, CommuteCacheRow>(
            r#"
            SELECT c.origin, c.destination, c.minutes, c.retrieved_at
            FROM commute_cache c
            JOIN UNNEST($1::text[], $2::text[]) AS k(origin, destination)
              ON c.origin = k.origin AND c.destination = k.destination
            "#,
        )
        .bind(origins)
        .bind(destinations)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CommuteCacheEntry::try_from).collect()
    }

    async fn save(&self, entry: &CommuteCacheEntry) -> Result<(), CacheError> {
        let minutes = i32::try_from(entry.minutes).map_err(|_| CacheError::OutOfRange {
            pair: entry.pair.clone(),
            value: i64::from(entry.minutes),
        })?;

        // Single-statement upsert: readers see the old row or the new one, never a mix.
        sqlx::query(
            r#"
            INSERT INTO commute_cache (origin, destination, minutes, retrieved_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (origin, destination)
            DO UPDATE SET minutes = EXCLUDED.minutes, retrieved_at = EXCLUDED.retrieved_at
            "#,
        )
        .bind(entry.pair.origin())
        .bind(entry.pair.destination())
        .bind(minutes)
        .bind(entry.retrieved_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
