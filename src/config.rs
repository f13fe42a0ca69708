//! Tracker configuration built from the compile-time constants

use crate::constants::{
    BUS_VISION_APPROACH_URL, DEFAULT_STOP_FROM, DEFAULT_STOP_TO, ENDPOINT_ENV_VAR,
    REFRESH_INTERVAL_SECS, REQUEST_TIMEOUT_SECS, STALE_THRESHOLD_SECS, STOP_CODE_FROM,
    STOP_CODE_TO,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Stop names used when the page does not name the stops itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopNames {
    pub from: String,
    pub to: String,
}

impl Default for StopNames {
    fn default() -> Self {
        Self {
            from: DEFAULT_STOP_FROM.to_string(),
            to: DEFAULT_STOP_TO.to_string(),
        }
    }
}

/// Named configuration values for one tracked route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Full approach page URL, including the stop-code query
    pub endpoint: String,
    /// Fallback stop names
    pub stops: StopNames,
    /// Period of the recurring poll
    pub poll_interval: Duration,
    /// Per-request timeout enforced by the fetcher
    pub request_timeout: Duration,
    /// Age after which `latest_snapshot` reports the data as stale
    pub stale_threshold: Duration,
}

impl TrackerConfig {
    /// Builds the approach page URL for a pair of stop codes
    pub fn endpoint_for(stop_from: u32, stop_to: u32) -> String {
        format!(
            "{}?stopCdFrom={}&stopCdTo={}",
            BUS_VISION_APPROACH_URL, stop_from, stop_to
        )
    }

    /// Default configuration, with `BUS_APPROACH_URL` overriding the endpoint
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV_VAR) {
            if !endpoint.trim().is_empty() {
                config.endpoint = endpoint.trim().to_string();
            }
        }
        config
    }

    /// Replaces the endpoint URL
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Replaces the per-request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Replaces the poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            endpoint: Self::endpoint_for(STOP_CODE_FROM, STOP_CODE_TO),
            stops: StopNames::default(),
            poll_interval: Duration::from_secs(REFRESH_INTERVAL_SECS),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            stale_threshold: Duration::from_secs(STALE_THRESHOLD_SECS),
        }
    }
}
