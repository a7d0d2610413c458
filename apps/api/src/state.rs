use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::distance::DistanceResolver;
use crate::roles::RoleTaxonomy;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Owns the commute cache; reach it through `resolver.cache()`.
    pub resolver: DistanceResolver,
    /// Injected so taxonomy revisions never touch matching code.
    pub taxonomy: Arc<RoleTaxonomy>,
    pub config: Config,
}
