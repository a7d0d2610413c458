pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::commute::handlers as commute;
use crate::matching::handlers as matching;
use crate::roles::handlers as roles;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Match API
        .route("/api/v1/matches", get(matching::handle_get_matches))
        .route("/api/v1/commute", get(commute::handle_get_commute))
        // Role taxonomy
        .route("/api/v1/roles/taxonomy", get(roles::handle_get_taxonomy))
        .route("/api/v1/roles/normalize", post(roles::handle_normalize))
        .with_state(state)
}
