mod commute;
mod config;
mod db;
mod distance;
mod errors;
mod matching;
mod models;
mod roles;
mod routes;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::commute::cache::MemoryCommuteStore;
use crate::commute::pg_store::PgCommuteStore;
use crate::commute::redis_store::RedisCommuteStore;
use crate::commute::{CommuteCache, CommuteStore};
use crate::config::{CacheBackend, Config};
use crate::db::{create_pool, run_migrations};
use crate::distance::{DistanceMatrixClient, DistanceResolver};
use crate::roles::RoleTaxonomy;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting StaffMatch API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url, config.database_max_connections).await?;
    run_migrations(&db).await?;

    // Initialize commute cache
    let store = build_commute_store(&config, &db)?;
    let cache = CommuteCache::new(store, config.cache.max_age);
    info!(
        "Commute cache initialized (backend: {}, max age: {})",
        cache.backend(),
        config
            .cache
            .max_age
            .map(|age| format!("{} days", age.num_days()))
            .unwrap_or_else(|| "unbounded".to_string())
    );

    // Initialize distance provider
    if config.distance.api_key.is_none() {
        warn!("GOOGLE_MAPS_API_KEY is not set; commute lookups will fail with a configuration error");
    }
    let client = DistanceMatrixClient::new(config.distance.clone())
        .context("failed to build Distance Matrix HTTP client")?;
    let resolver = DistanceResolver::new(client, cache);
    info!(
        "Distance resolver initialized (mode: {}, concurrency: {}, {} req/s)",
        config.distance.travel_mode.as_str(),
        config.distance.max_concurrency,
        config.distance.requests_per_second
    );

    let taxonomy = Arc::new(RoleTaxonomy::default());
    info!(
        "Role taxonomy v{} loaded ({} categories)",
        taxonomy.version,
        taxonomy.categories.len()
    );

    // Build app state
    let state = AppState {
        db,
        resolver,
        taxonomy,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS once the frontend origin is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Picks the commute cache store named by `COMMUTE_CACHE_BACKEND`.
fn build_commute_store(config: &Config, db: &sqlx::PgPool) -> Result<Arc<dyn CommuteStore>> {
    let store: Arc<dyn CommuteStore> = match config.cache.backend {
        CacheBackend::Postgres => Arc::new(PgCommuteStore::new(db.clone())),
        CacheBackend::Redis => {
            let url = config
                .redis_url
                .as_deref()
                .context("REDIS_URL is required for the redis commute cache")?;
            Arc::new(RedisCommuteStore::new(redis::Client::open(url)?))
        }
        CacheBackend::Memory => Arc::new(MemoryCommuteStore::default()),
    };
    Ok(store)
}
