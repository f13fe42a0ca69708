//! Types for the bus approach tracker

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One completed poll of the approach page
///
/// When `has_data` is false every bus-record field is empty and
/// `error_message` carries the page's no-data phrase. When `has_data` is
/// true `error_message` is `None`, and each record field may still be empty
/// on its own if the page did not carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproachSnapshot {
    /// Server-reported refresh time, or the unknown sentinel
    pub update_time: String,
    /// Departure stop name
    pub stop_from: String,
    /// Arrival stop name
    pub stop_to: String,
    /// True if at least one approaching bus was listed
    pub has_data: bool,
    /// Why there is no data, only set when `has_data` is false
    pub error_message: Option<String>,

    // Nearest (first-listed) bus
    /// Approach status, e.g. "あと3分で到着予定"
    pub approach: String,
    pub route: String,
    pub destination: String,
    /// Scheduled pass time
    pub pass_time: String,
    /// Delay / status note
    pub delay: String,
    /// Stop the bus is currently at
    pub current_location: String,
    /// Position relative to the departure stop, e.g. "5個前"
    pub relative_position: String,
}

impl ApproachSnapshot {
    /// Snapshot for a page that reported no approaching bus
    pub fn no_data(
        update_time: String,
        stop_from: String,
        stop_to: String,
        message: impl Into<String>,
    ) -> Self {
        Self {
            update_time,
            stop_from,
            stop_to,
            has_data: false,
            error_message: Some(message.into()),
            approach: String::new(),
            route: String::new(),
            destination: String::new(),
            pass_time: String::new(),
            delay: String::new(),
            current_location: String::new(),
            relative_position: String::new(),
        }
    }

    /// Status of the nearest bus, `None` when no bus is listed
    pub fn status(&self) -> Option<ApproachStatus> {
        self.has_data.then(|| ApproachStatus::classify(&self.approach))
    }
}

/// Coarse classification of the approach status text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApproachStatus {
    /// Bus is on its way, e.g. "あと3分で到着予定"
    Approaching,
    /// Bus has not left its origin yet, e.g. "発車予定"
    BeforeDeparture,
    /// Anything else the page reports
    Other,
}

impl ApproachStatus {
    /// Classifies an approach status text
    pub fn classify(approach: &str) -> Self {
        if approach.contains("あと") && approach.contains("分") {
            ApproachStatus::Approaching
        } else if approach.contains("発車予定") {
            ApproachStatus::BeforeDeparture
        } else {
            ApproachStatus::Other
        }
    }
}

impl std::fmt::Display for ApproachSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {} → {}: ", self.update_time, self.stop_from, self.stop_to)?;
        if !self.has_data {
            return write!(f, "{}", self.error_message.as_deref().unwrap_or_default());
        }
        write!(f, "{}", self.approach)?;
        if !self.route.is_empty() {
            write!(f, " ({} {})", self.route, self.destination)?;
        }
        if !self.delay.is_empty() {
            write!(f, " {}", self.delay)?;
        }
        Ok(())
    }
}

/// Outcome of one poll cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum PollResult {
    /// Page fetched and extracted, possibly with `has_data == false`
    Success(ApproachSnapshot),
    /// Page could not be fetched; carries the transport error text
    Failure(String),
}

impl PollResult {
    pub fn is_success(&self) -> bool {
        matches!(self, PollResult::Success(_))
    }

    /// The snapshot, if this is a success
    pub fn snapshot(&self) -> Option<&ApproachSnapshot> {
        match self {
            PollResult::Success(snapshot) => Some(snapshot),
            PollResult::Failure(_) => None,
        }
    }

    /// The failure reason, if this is a failure
    pub fn failure(&self) -> Option<&str> {
        match self {
            PollResult::Success(_) => None,
            PollResult::Failure(reason) => Some(reason),
        }
    }
}

/// Read-only view of the store handed to observers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreView {
    /// Latest published result, `None` until the first cycle completes
    pub result: Option<PollResult>,
    /// True while at least one cycle is in flight
    pub is_loading: bool,
    /// Last successful snapshot, kept across failures for display
    pub last_snapshot: Option<ApproachSnapshot>,
    /// When `result` was published
    pub updated_at: Option<DateTime<Utc>>,
}

impl StoreView {
    /// Error text of the current result, if the latest cycle failed
    pub fn last_error(&self) -> Option<&str> {
        self.result.as_ref().and_then(PollResult::failure)
    }
}

/// Events broadcast to subscribers on every publish
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApproachEvent {
    /// A poll completed and produced a snapshot
    SnapshotUpdated {
        id: Uuid,
        snapshot: ApproachSnapshot,
        timestamp: DateTime<Utc>,
    },

    /// A poll failed at the transport level
    PollFailed {
        id: Uuid,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

impl ApproachEvent {
    /// Builds the event describing a published result
    pub fn from_result(result: &PollResult, timestamp: DateTime<Utc>) -> Self {
        match result {
            PollResult::Success(snapshot) => ApproachEvent::SnapshotUpdated {
                id: Uuid::new_v4(),
                snapshot: snapshot.clone(),
                timestamp,
            },
            PollResult::Failure(reason) => ApproachEvent::PollFailed {
                id: Uuid::new_v4(),
                error_message: reason.clone(),
                timestamp,
            },
        }
    }

    /// Get the event ID
    pub fn id(&self) -> Uuid {
        match self {
            ApproachEvent::SnapshotUpdated { id, .. } => *id,
            ApproachEvent::PollFailed { id, .. } => *id,
        }
    }

    /// Get the event type as string
    pub fn event_type(&self) -> &'static str {
        match self {
            ApproachEvent::SnapshotUpdated { .. } => "SNAPSHOT_UPDATED",
            ApproachEvent::PollFailed { .. } => "POLL_FAILED",
        }
    }
}

impl std::fmt::Display for ApproachEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApproachEvent::SnapshotUpdated { snapshot, .. } => {
                write!(f, "Approach updated: {}", snapshot)
            }
            ApproachEvent::PollFailed { error_message, .. } => {
                write!(f, "Approach poll failed: {}", error_message)
            }
        }
    }
}

/// Overall system health status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// Fresh data from the latest poll
    Healthy,
    /// Latest poll failed or data is stale, but something was fetched before
    Degraded,
    /// Nothing usable has been fetched
    Unhealthy,
}

/// Component health information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Optional status message
    pub message: Option<String>,
    /// Component-specific details
    pub details: std::collections::HashMap<String, serde_json::Value>,
    /// Last checked timestamp
    pub last_checked: DateTime<Utc>,
}
