//! Snapshot reads of one operator's candidates and clients. Read-only.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::candidate::CandidateRow;
use crate::models::client::ClientRow;

pub async fn load_candidates(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<CandidateRow>, sqlx::Error> {
    sqlx::query_as::<_, CandidateRow>("SELECT * FROM candidates WHERE user_id = $1 ORDER BY id")
        .bind(user_id)
        .fetch_all(pool)
        .await
}

pub async fn load_clients(pool: &PgPool, user_id: Uuid) -> Result<Vec<ClientRow>, sqlx::Error> {
    sqlx::query_as::<_, ClientRow>("SELECT * FROM clients WHERE user_id = $1 ORDER BY id")
        .bind(user_id)
        .fetch_all(pool)
        .await
}
