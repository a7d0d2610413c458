use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A client posting (surgery/site looking for staff). `role` and `postcode` are required
/// for matching; rows missing either are skipped by the match generator.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClientRow {
    pub id: String,
    pub user_id: Uuid,
    pub surgery: Option<String>,
    pub role: Option<String>,
    pub postcode: Option<String>,
    pub budget: Option<String>,
    pub requirement: Option<String>,
    pub system: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}
