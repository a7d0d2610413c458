use thiserror::Error;

/// Why a postcode pair (or a whole resolve call) has no travel time.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DistanceError {
    /// Network failure, provider 5xx, or a transient per-element failure.
    #[error("Distance provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Provider rate limit or daily quota. Retried with a longer backoff.
    #[error("Distance provider quota exceeded: {0}")]
    QuotaExceeded(String),

    /// The provider cannot geocode or route one side of the pair. Terminal for that pair.
    #[error("Invalid postcode: {0}")]
    InvalidPostcode(String),

    /// Missing or rejected credentials. No pair can succeed, so the whole call aborts.
    #[error("Distance configuration error: {0}")]
    Configuration(String),

    /// The caller's deadline passed before this pair was resolved.
    #[error("Distance resolution deadline exceeded")]
    DeadlineExceeded,
}

impl DistanceError {
    /// Worth asking again, now (within the retry budget) or on a later call.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DistanceError::ProviderUnavailable(_)
                | DistanceError::QuotaExceeded(_)
                | DistanceError::DeadlineExceeded
        )
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, DistanceError::Configuration(_))
    }
}
