//! Error types for the bus approach tracker

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when fetching the approach page
#[derive(Debug, Error)]
pub enum FetchError {
    /// Endpoint URL could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Network request failed
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Timeout waiting for response
    #[error("Request timeout")]
    Timeout,

    /// Server answered with a non-success status
    #[error("HTTP {status}")]
    HttpStatus { status: u16 },

    /// Response body is not valid UTF-8
    #[error("Undecodable response body: {0}")]
    Decode(String),
}

impl FetchError {
    /// Classifies a reqwest error, separating timeouts from other failures
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::NetworkError(err)
        }
    }

    /// True for failures the next scheduled tick may recover from
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::InvalidUrl(_))
    }
}

/// Errors that can occur when reading the latest snapshot
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApproachError {
    /// No poll has completed yet
    #[error("Approach data not available yet")]
    NotAvailable,

    /// The most recent poll failed
    #[error("Fetch failed: {0}")]
    FetchFailed(String),

    /// The snapshot is older than the stale threshold
    #[error("Approach data is stale (age: {age:?})")]
    Stale { age: Duration },
}

impl ApproachError {
    /// Creates a FetchFailed error
    pub fn fetch_failed(msg: impl Into<String>) -> Self {
        Self::FetchFailed(msg.into())
    }

    /// Creates a Stale error
    pub fn stale(age: Duration) -> Self {
        Self::Stale { age }
    }
}
