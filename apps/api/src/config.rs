use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Google Distance Matrix JSON endpoint. Overridable so staging can point at a proxy.
pub const DEFAULT_DISTANCE_MATRIX_URL: &str =
    "https://maps.googleapis.com/maps/api/distancematrix/json";

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub redis_url: Option<String>,
    pub port: u16,
    pub rust_log: String,
    pub distance: DistanceSettings,
    pub cache: CacheSettings,
    /// Overall budget for one match generation call.
    pub match_deadline: Duration,
}

/// Travel mode passed to the distance provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TravelMode {
    Driving,
    Transit,
    Walking,
    Bicycling,
}

impl TravelMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelMode::Driving => "driving",
            TravelMode::Transit => "transit",
            TravelMode::Walking => "walking",
            TravelMode::Bicycling => "bicycling",
        }
    }
}

impl FromStr for TravelMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "driving" => Ok(TravelMode::Driving),
            "transit" => Ok(TravelMode::Transit),
            "walking" => Ok(TravelMode::Walking),
            "bicycling" => Ok(TravelMode::Bicycling),
            other => bail!("unknown travel mode '{other}'"),
        }
    }
}

/// Everything the distance client and resolver need. The API key is optional here:
/// a missing key is reported by the resolver as a configuration error at call time.
#[derive(Debug, Clone)]
pub struct DistanceSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub travel_mode: TravelMode,
    pub region: Option<String>,
    pub max_origins_per_request: usize,
    pub max_destinations_per_request: usize,
    pub max_elements_per_request: usize,
    pub max_concurrency: usize,
    pub requests_per_second: u32,
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub quota_backoff_multiplier: u32,
    pub request_timeout: Duration,
}

impl Default for DistanceSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_DISTANCE_MATRIX_URL.to_string(),
            travel_mode: TravelMode::Driving,
            region: Some("uk".to_string()),
            max_origins_per_request: 25,
            max_destinations_per_request: 25,
            max_elements_per_request: 100,
            max_concurrency: 4,
            requests_per_second: 10,
            max_attempts: 4,
            backoff_base: Duration::from_millis(500),
            quota_backoff_multiplier: 4,
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Postgres,
    Redis,
    Memory,
}

impl FromStr for CacheBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" => Ok(CacheBackend::Postgres),
            "redis" => Ok(CacheBackend::Redis),
            "memory" => Ok(CacheBackend::Memory),
            other => bail!("unknown commute cache backend '{other}'"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub backend: CacheBackend,
    /// `None` means cached commute times never expire.
    pub max_age: Option<chrono::Duration>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = DistanceSettings::default();

        let distance = DistanceSettings {
            api_key: optional_env("GOOGLE_MAPS_API_KEY"),
            base_url: optional_env("DISTANCE_MATRIX_URL").unwrap_or(defaults.base_url),
            travel_mode: parse_env("DISTANCE_TRAVEL_MODE", defaults.travel_mode)?,
            region: optional_env("DISTANCE_REGION").or(defaults.region),
            max_concurrency: parse_env("DISTANCE_MAX_CONCURRENCY", defaults.max_concurrency)?,
            requests_per_second: parse_env(
                "DISTANCE_REQUESTS_PER_SECOND",
                defaults.requests_per_second,
            )?,
            max_attempts: parse_env("DISTANCE_MAX_ATTEMPTS", defaults.max_attempts)?,
            backoff_base: parse_duration_env(
                "DISTANCE_BACKOFF_MS",
                defaults.backoff_base,
                Duration::from_millis,
            )?,
            quota_backoff_multiplier: parse_env(
                "DISTANCE_QUOTA_BACKOFF_MULTIPLIER",
                defaults.quota_backoff_multiplier,
            )?,
            request_timeout: parse_duration_env(
                "DISTANCE_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout,
                Duration::from_secs,
            )?,
            ..defaults
        };

        if distance.max_concurrency == 0 || distance.requests_per_second == 0 {
            bail!("DISTANCE_MAX_CONCURRENCY and DISTANCE_REQUESTS_PER_SECOND must be positive");
        }
        if distance.max_attempts == 0 {
            bail!("DISTANCE_MAX_ATTEMPTS must be at least 1");
        }

        let backend: CacheBackend = parse_env("COMMUTE_CACHE_BACKEND", CacheBackend::Postgres)?;
        let redis_url = optional_env("REDIS_URL");
        if backend == CacheBackend::Redis && redis_url.is_none() {
            bail!("REDIS_URL is required when COMMUTE_CACHE_BACKEND=redis");
        }

        let max_age = optional_env("COMMUTE_CACHE_MAX_AGE_DAYS")
            .map(|raw| parse_max_age_days(&raw))
            .transpose()?;

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            database_max_connections: parse_env("DATABASE_MAX_CONNECTIONS", 10u32)?,
            redis_url,
            port: parse_env("PORT", 8080u16)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            distance,
            cache: CacheSettings { backend, max_age },
            match_deadline: Duration::from_secs(parse_env("MATCH_DEADLINE_SECS", 25u64)?),
        })
    }
}

/// Commute cache freshness window. Must be a positive number of days that
/// `chrono::Duration` can represent.
fn parse_max_age_days(raw: &str) -> Result<chrono::Duration> {
    let days = raw
        .parse::<i64>()
        .context("COMMUTE_CACHE_MAX_AGE_DAYS must be a whole number of days")?;
    if days <= 0 {
        bail!("COMMUTE_CACHE_MAX_AGE_DAYS must be positive, got {days}");
    }
    chrono::Duration::try_days(days)
        .with_context(|| format!("COMMUTE_CACHE_MAX_AGE_DAYS is out of range: {days}"))
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{key} has an invalid value '{raw}': {e}")),
        None => Ok(default),
    }
}

fn parse_duration_env(
    key: &str,
    default: Duration,
    from_raw: fn(u64) -> Duration,
) -> Result<Duration> {
    match optional_env(key) {
        Some(raw) => raw
            .parse::<u64>()
            .map(from_raw)
            .map_err(|e| anyhow::anyhow!("{key} has an invalid value '{raw}': {e}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_travel_mode_parses_case_insensitively() {
        assert_eq!("Transit".parse::<TravelMode>().unwrap(), TravelMode::Transit);
        assert_eq!(" driving ".parse::<TravelMode>().unwrap(), TravelMode::Driving);
        assert!("teleport".parse::<TravelMode>().is_err());
    }

    #[test]
    fn test_cache_backend_parses() {
        assert_eq!("REDIS".parse::<CacheBackend>().unwrap(), CacheBackend::Redis);
        assert!("sqlite".parse::<CacheBackend>().is_err());
    }

    #[test]
    fn test_distance_defaults_respect_provider_limits() {
        let defaults = DistanceSettings::default();
        assert_eq!(defaults.max_elements_per_request, 100);
        assert_eq!(defaults.max_origins_per_request, 25);
        assert_eq!(defaults.max_destinations_per_request, 25);
        assert!(defaults.api_key.is_none());
    }

    #[test]
    fn test_cache_max_age_accepts_positive_days() {
        assert_eq!(parse_max_age_days("30").unwrap(), chrono::Duration::days(30));
    }

    #[test]
    fn test_cache_max_age_rejects_zero_negative_and_huge() {
        assert!(parse_max_age_days("0").is_err());
        assert!(parse_max_age_days("-7").is_err());
        assert!(parse_max_age_days(&i64::MAX.to_string()).is_err());
        assert!(parse_max_age_days("soon").is_err());
    }

    #[test]
    fn test_duration_env_falls_back_to_settings_default() {
        let defaults = DistanceSettings::default();
        let backoff = parse_duration_env(
            "STAFFMATCH_TEST_UNSET_BACKOFF_MS",
            defaults.backoff_base,
            Duration::from_millis,
        )
        .unwrap();
        assert_eq!(backoff, defaults.backoff_base);
    }
}
