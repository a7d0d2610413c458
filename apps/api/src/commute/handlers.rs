//! Axum route handler for single-pair commute lookups.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::warn;

use crate::commute::postcode::PostcodePair;
use crate::distance::DistanceError;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CommuteQuery {
    pub origin: String,
    pub destination: String,
}

#[derive(Debug, Serialize)]
pub struct CommuteResponse {
    pub origin: String,
    pub destination: String,
    pub commute_minutes: u32,
    /// "cache" or "provider".
    pub source: &'static str,
}

/// GET /api/v1/commute?origin=&destination=
///
/// Cache first, then the distance resolver (which caches the answer).
pub async fn handle_get_commute(
    State(state): State<AppState>,
    Query(params): Query<CommuteQuery>,
) -> Result<Json<CommuteResponse>, AppError> {
    let pair = PostcodePair::try_new(&params.origin, &params.destination).ok_or_else(|| {
        AppError::Validation("origin and destination postcodes are required".to_string())
    })?;

    let cached = match state.resolver.cache().get(&pair).await {
        Ok(cached) => cached,
        Err(e) => {
            warn!("Commute cache read failed for {pair}: {e}");
            None
        }
    };

    let (commute_minutes, source) = match cached {
        Some(minutes) => (minutes, "cache"),
        None => {
            let deadline = Instant::now() + state.config.match_deadline;
            let mut resolution = state
                .resolver
                .resolve_until(std::slice::from_ref(&pair), Some(deadline))
                .await?;
            let outcome = resolution.remove(&pair).unwrap_or_else(|| {
                Err(DistanceError::ProviderUnavailable(
                    "pair missing from resolution".to_string(),
                ))
            });
            (outcome?, "provider")
        }
    };

    Ok(Json(CommuteResponse {
        origin: pair.origin().to_string(),
        destination: pair.destination().to_string(),
        commute_minutes,
        source,
    }))
}
