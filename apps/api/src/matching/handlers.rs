//! Axum route handlers for the Match API.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

use crate::errors::AppError;
use crate::matching::generator::{generate_matches, MAX_COMMUTE_MINUTES};
use crate::matching::models::{MatchCandidate, MatchClient, MatchRecord};
use crate::matching::source::{load_candidates, load_clients};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MatchQuery {
    pub user_id: Uuid,
}

/// The list is already in its final order; the counts back the "role matches" and
/// "location-only matches" tabs without the UI having to re-filter anything.
#[derive(Debug, Serialize)]
pub struct MatchListResponse {
    pub matches: Vec<MatchRecord>,
    pub total: usize,
    pub role_matches: usize,
    pub location_only: usize,
    pub max_commute_minutes: u32,
}

impl From<Vec<MatchRecord>> for MatchListResponse {
    fn from(matches: Vec<MatchRecord>) -> Self {
        let role_matches = matches.iter().filter(|m| m.role_match).count();
        Self {
            total: matches.len(),
            role_matches,
            location_only: matches.len() - role_matches,
            matches,
            max_commute_minutes: MAX_COMMUTE_MINUTES,
        }
    }
}

/// GET /api/v1/matches?user_id=
///
/// Recomputes matches from the operator's current candidates and clients.
/// An empty list is a valid answer; a broken distance integration is a 503.
pub async fn handle_get_matches(
    State(state): State<AppState>,
    Query(params): Query<MatchQuery>,
) -> Result<Json<MatchListResponse>, AppError> {
    let candidates: Vec<MatchCandidate> = load_candidates(&state.db, params.user_id)
        .await?
        .into_iter()
        .map(MatchCandidate::from)
        .collect();
    let clients: Vec<MatchClient> = load_clients(&state.db, params.user_id)
        .await?
        .into_iter()
        .map(MatchClient::from)
        .collect();

    let deadline = Instant::now() + state.config.match_deadline;
    let matches = generate_matches(
        &state.resolver,
        &state.taxonomy,
        &candidates,
        &clients,
        Some(deadline),
    )
    .await?;

    Ok(Json(MatchListResponse::from(matches)))
}
