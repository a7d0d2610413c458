use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service status plus the pieces an operator needs to debug matching:
/// which commute cache backend is active, the taxonomy version, and whether
/// distance credentials are present.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "staffmatch-api",
        "commute_cache": state.resolver.cache().backend(),
        "taxonomy_version": state.taxonomy.version,
        "distance_configured": state.config.distance.api_key.is_some()
    }))
}
