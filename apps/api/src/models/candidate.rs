use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A candidate as stored by the CRUD layer. Only `id`, `role` and `postcode` matter
/// for matching; the rest are display fields carried through untouched.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CandidateRow {
    pub id: String,
    pub user_id: Uuid,
    pub role: Option<String>,
    pub postcode: Option<String>,
    pub salary: Option<String>,
    pub availability: Option<String>,
    pub experience: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}
