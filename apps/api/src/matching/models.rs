use serde::{Deserialize, Serialize};

use crate::models::candidate::CandidateRow;
use crate::models::client::ClientRow;

/// The slice of a candidate the match engine reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub id: String,
    pub role: String,
    pub postcode: String,
}

/// The slice of a client the match engine reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchClient {
    pub id: String,
    pub role: String,
    pub postcode: String,
}

/// One viable pairing. Derived on every request, never persisted.
///
/// Any record that leaves the generator has `commute_minutes <= 80`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub candidate_id: String,
    pub client_id: String,
    pub commute_minutes: u32,
    /// `false` means a location-only match: close enough, different (or unknown) role.
    pub role_match: bool,
}

impl From<CandidateRow> for MatchCandidate {
    fn from(row: CandidateRow) -> Self {
        Self {
            id: row.id,
            role: row.role.unwrap_or_default(),
            postcode: row.postcode.unwrap_or_default(),
        }
    }
}

impl From<ClientRow> for MatchClient {
    fn from(row: ClientRow) -> Self {
        Self {
            id: row.id,
            role: row.role.unwrap_or_default(),
            postcode: row.postcode.unwrap_or_default(),
        }
    }
}
