//! Axum route handlers for the role taxonomy.

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::errors::AppError;
use crate::roles::normalizer::{explain, RoleResolution};
use crate::roles::taxonomy::RoleTaxonomy;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NormalizeRequest {
    pub role: String,
}

/// GET /api/v1/roles/taxonomy
///
/// Returns the taxonomy version and its ordered categories, so the grid can flag
/// client roles that will never match anything.
pub async fn handle_get_taxonomy(State(state): State<AppState>) -> Json<RoleTaxonomy> {
    Json(state.taxonomy.as_ref().clone())
}

/// POST /api/v1/roles/normalize
pub async fn handle_normalize(
    State(state): State<AppState>,
    Json(request): Json<NormalizeRequest>,
) -> Result<Json<RoleResolution>, AppError> {
    if request.role.len() > 256 {
        return Err(AppError::Validation(
            "role must be at most 256 characters".to_string(),
        ));
    }

    Ok(Json(explain(&state.taxonomy, &request.role)))
}
