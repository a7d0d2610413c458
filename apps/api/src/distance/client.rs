/// Distance Matrix client: the single source of commute times.
///
/// ARCHITECTURAL RULE: No other module may call a travel-time API directly, and no
/// module may substitute another computation (straight-line distance, estimates) for a
/// missing result. All travel times MUST come from this client via `DistanceResolver`.
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::commute::postcode::PostcodePair;
use crate::config::DistanceSettings;
use crate::distance::error::DistanceError;

pub type PairOutcome = Result<u32, DistanceError>;

#[derive(Debug, Deserialize)]
struct MatrixResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    rows: Vec<MatrixRow>,
}

#[derive(Debug, Deserialize)]
struct MatrixRow {
    #[serde(default)]
    elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
struct MatrixElement {
    status: String,
    duration: Option<MatrixValue>,
}

#[derive(Debug, Deserialize)]
struct MatrixValue {
    /// Seconds.
    value: u64,
}

#[derive(Clone)]
pub struct DistanceMatrixClient {
    client: Client,
    settings: Arc<DistanceSettings>,
}

impl DistanceMatrixClient {
    pub fn new(settings: DistanceSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(settings.request_timeout).build()?;
        Ok(Self {
            client,
            settings: Arc::new(settings),
        })
    }

    pub fn settings(&self) -> &DistanceSettings {
        &self.settings
    }

    /// Fails fast when no credentials are configured.
    pub fn ensure_configured(&self) -> Result<&str, DistanceError> {
        self.settings
            .api_key
            .as_deref()
            .ok_or_else(|| DistanceError::Configuration("GOOGLE_MAPS_API_KEY is not set".into()))
    }

    /// One provider call covering every pair in `pairs`.
    ///
    /// `Err` means the whole request failed (transport, HTTP status, top-level provider
    /// status). `Ok` carries one outcome per requested pair.
    pub async fn travel_minutes(
        &self,
        pairs: &[PostcodePair],
    ) -> Result<HashMap<PostcodePair, PairOutcome>, DistanceError> {
        let api_key = self.ensure_configured()?;

        let origins: Vec<&str> = pairs
            .iter()
            .map(|p| p.origin())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let destinations: Vec<&str> = pairs
            .iter()
            .map(|p| p.destination())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut params = vec![
            ("origins", origins.join("|")),
            ("destinations", destinations.join("|")),
            ("mode", self.settings.travel_mode.as_str().to_string()),
            ("units", "metric".to_string()),
            ("key", api_key.to_string()),
        ];
        if let Some(region) = &self.settings.region {
            params.push(("region", region.clone()));
        }

        debug!(
            "Distance Matrix request: {} origins x {} destinations ({} pairs)",
            origins.len(),
            destinations.len(),
            pairs.len()
        );

        let response = self
            .client
            .get(&self.settings.base_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| DistanceError::ProviderUnavailable(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_http_status(status, body));
        }

        let body: MatrixResponse = response
            .json()
            .await
            .map_err(|e| DistanceError::ProviderUnavailable(format!("malformed response: {e}")))?;

        interpret_response(body, &origins, &destinations, pairs)
    }
}

fn classify_http_status(status: StatusCode, body: String) -> DistanceError {
    let message = format!("HTTP {}: {}", status.as_u16(), body);
    match status {
        StatusCode::TOO_MANY_REQUESTS => DistanceError::QuotaExceeded(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => DistanceError::Configuration(message),
        _ => DistanceError::ProviderUnavailable(message),
    }
}

/// Rounds provider seconds to the nearest minute (half up).
fn seconds_to_minutes(seconds: u64) -> u32 {
    u32::try_from(seconds.saturating_add(30) / 60).unwrap_or(u32::MAX)
}

fn interpret_response(
    body: MatrixResponse,
    origins: &[&str],
    destinations: &[&str],
    pairs: &[PostcodePair],
) -> Result<HashMap<PostcodePair, PairOutcome>, DistanceError> {
    let detail = || {
        body.error_message
            .clone()
            .unwrap_or_else(|| body.status.clone())
    };

    match body.status.as_str() {
        "OK" => {}
        "OVER_QUERY_LIMIT" | "OVER_DAILY_LIMIT" => {
            return Err(DistanceError::QuotaExceeded(detail()))
        }
        "REQUEST_DENIED" => return Err(DistanceError::Configuration(detail())),
        "INVALID_REQUEST" | "MAX_ELEMENTS_EXCEEDED" | "MAX_DIMENSIONS_EXCEEDED" => {
            let reason = detail();
            return Ok(pairs
                .iter()
                .map(|p| {
                    (
                        p.clone(),
                        Err(DistanceError::InvalidPostcode(format!("{p}: {reason}"))),
                    )
                })
                .collect());
        }
        _ => return Err(DistanceError::ProviderUnavailable(detail())),
    }

    let origin_index: HashMap<&str, usize> =
        origins.iter().enumerate().map(|(i, o)| (*o, i)).collect();
    let destination_index: HashMap<&str, usize> = destinations
        .iter()
        .enumerate()
        .map(|(i, d)| (*d, i))
        .collect();

    let mut outcomes = HashMap::with_capacity(pairs.len());
    for pair in pairs {
        let element = origin_index
            .get(pair.origin())
            .zip(destination_index.get(pair.destination()))
            .and_then(|(&i, &j)| body.rows.get(i).and_then(|row| row.elements.get(j)));

        let outcome = match element {
            None => Err(DistanceError::ProviderUnavailable(format!(
                "{pair}: element missing from response"
            ))),
            Some(element) => match element.status.as_str() {
                "OK" => element
                    .duration
                    .as_ref()
                    .map(|d| seconds_to_minutes(d.value))
                    .ok_or_else(|| {
                        DistanceError::ProviderUnavailable(format!("{pair}: duration missing"))
                    }),
                "NOT_FOUND" | "ZERO_RESULTS" | "MAX_ROUTE_LENGTH_EXCEEDED" => Err(
                    DistanceError::InvalidPostcode(format!("{pair}: {}", element.status)),
                ),
                other => Err(DistanceError::ProviderUnavailable(format!(
                    "{pair}: element status {other}"
                ))),
            },
        };
        outcomes.insert(pair.clone(), outcome);
    }

    Ok(outcomes)
}
