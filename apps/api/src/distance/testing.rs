//! In-process stand-in for the Distance Matrix endpoint.
//!
//! Serves the same JSON shape as the real API on a random local port, so tests drive the
//! production `DistanceMatrixClient` over HTTP instead of a mock trait.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};

use crate::commute::cache::CommuteCache;
use crate::config::DistanceSettings;
use crate::distance::client::DistanceMatrixClient;
use crate::distance::resolver::DistanceResolver;

const MATRIX_PATH: &str = "/maps/api/distancematrix/json";

/// A response the fake returns before falling back to its configured data.
#[derive(Debug, Clone)]
pub enum Scripted {
    Http(u16),
    Status(&'static str),
}

#[derive(Default)]
pub struct FakeDistanceMatrix {
    seconds: Mutex<HashMap<(String, String), u64>>,
    element_statuses: Mutex<HashMap<(String, String), String>>,
    scripted: Mutex<VecDeque<Scripted>>,
    delay: Mutex<Option<Duration>>,
    elements: Mutex<Vec<(String, String)>>,
    requests: AtomicUsize,
    pub max_origins_seen: AtomicUsize,
}

impl FakeDistanceMatrix {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_minutes(&self, origin: &str, destination: &str, minutes: u64) {
        self.seconds
            .lock()
            .unwrap()
            .insert((origin.to_string(), destination.to_string()), minutes * 60);
    }

    pub fn set_element_status(&self, origin: &str, destination: &str, status: &str) {
        self.element_statuses.lock().unwrap().insert(
            (origin.to_string(), destination.to_string()),
            status.to_string(),
        );
    }

    pub fn script(&self, response: Scripted) {
        self.scripted.lock().unwrap().push_back(response);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Every (origin, destination) element the client has paid for, in request order.
    pub fn requested_elements(&self) -> Vec<(String, String)> {
        self.elements.lock().unwrap().clone()
    }

    fn element(&self, origin: &str, destination: &str) -> Value {
        let key = (origin.to_string(), destination.to_string());
        self.elements.lock().unwrap().push(key.clone());

        if let Some(status) = self.element_statuses.lock().unwrap().get(&key) {
            return json!({ "status": status });
        }
        match self.seconds.lock().unwrap().get(&key) {
            Some(seconds) => json!({
                "status": "OK",
                "duration": { "value": seconds, "text": format!("{} mins", seconds / 60) },
                "distance": { "value": 1000, "text": "1 km" }
            }),
            None => json!({ "status": "NOT_FOUND" }),
        }
    }
}

async fn matrix_handler(
    State(fake): State<Arc<FakeDistanceMatrix>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    fake.requests.fetch_add(1, Ordering::SeqCst);

    let delay = *fake.delay.lock().unwrap();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let scripted = fake.scripted.lock().unwrap().pop_front();
    match scripted {
        Some(Scripted::Http(code)) => {
            let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            return (status, "scripted failure").into_response();
        }
        Some(Scripted::Status(status)) => {
            return Json(json!({ "status": status, "rows": [] })).into_response();
        }
        None => {}
    }

    let split = |key: &str| -> Vec<String> {
        params
            .get(key)
            .map(|v| v.split('|').map(str::to_string).collect())
            .unwrap_or_default()
    };
    let origins = split("origins");
    let destinations = split("destinations");
    fake.max_origins_seen.fetch_max(origins.len(), Ordering::SeqCst);

    let rows: Vec<Value> = origins
        .iter()
        .map(|o| {
            let elements: Vec<Value> = destinations.iter().map(|d| fake.element(o, d)).collect();
            json!({ "elements": elements })
        })
        .collect();

    Json(json!({
        "status": "OK",
        "origin_addresses": origins,
        "destination_addresses": destinations,
        "rows": rows
    }))
    .into_response()
}

/// Starts the fake on 127.0.0.1 and returns its endpoint URL.
pub async fn spawn(fake: Arc<FakeDistanceMatrix>) -> String {
    let app = Router::new()
        .route(MATRIX_PATH, get(matrix_handler))
        .with_state(fake);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}{MATRIX_PATH}")
}

/// Fast settings for tests: millisecond backoff, three attempts, generous rate ceiling.
pub fn test_settings(base_url: String) -> DistanceSettings {
    DistanceSettings {
        api_key: Some("test-key".to_string()),
        base_url,
        max_attempts: 3,
        backoff_base: Duration::from_millis(1),
        requests_per_second: 1000,
        ..DistanceSettings::default()
    }
}

pub async fn resolver_with(
    fake: &Arc<FakeDistanceMatrix>,
    customize: impl FnOnce(&mut DistanceSettings),
) -> (DistanceResolver, CommuteCache) {
    let mut settings = test_settings(spawn(fake.clone()).await);
    customize(&mut settings);
    let client = DistanceMatrixClient::new(settings).unwrap();
    let cache = CommuteCache::in_memory();
    (DistanceResolver::new(client, cache.clone()), cache)
}

pub async fn resolver_for(fake: &Arc<FakeDistanceMatrix>) -> (DistanceResolver, CommuteCache) {
    resolver_with(fake, |_| {}).await
}
