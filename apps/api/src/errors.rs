use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::distance::DistanceError;
use crate::matching::generator::MatchError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Distance error: {0}")]
    Distance(#[from] DistanceError),

    #[error("Match generation failed: {0}")]
    Match(#[from] MatchError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Distance(e) => distance_response(e),
            AppError::Match(MatchError::Configuration(msg)) => {
                tracing::error!("Match generation failed, distance provider misconfigured: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "DISTANCE_CONFIGURATION_ERROR",
                    "Commute times are unavailable: the distance provider is not configured"
                        .to_string(),
                )
            }
            AppError::Match(e @ MatchError::ProviderOutage { .. }) => {
                tracing::error!("{e}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "DISTANCE_PROVIDER_UNAVAILABLE",
                    "Commute times are unavailable: the distance provider is not responding"
                        .to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

fn distance_response(e: &DistanceError) -> (StatusCode, &'static str, String) {
    match e {
        DistanceError::InvalidPostcode(msg) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "DISTANCE_UNRESOLVED",
            msg.clone(),
        ),
        DistanceError::Configuration(msg) => {
            tracing::error!("Distance provider misconfigured: {msg}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "DISTANCE_CONFIGURATION_ERROR",
                "Commute times are unavailable: the distance provider is not configured"
                    .to_string(),
            )
        }
        other => {
            tracing::warn!("Distance lookup failed: {other}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "DISTANCE_PROVIDER_UNAVAILABLE",
                other.to_string(),
            )
        }
    }
}
