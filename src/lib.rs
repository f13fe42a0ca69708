//! # Bus Approach Tracker
//!
//! Tracks the real-time approach status of one bus route between two fixed
//! stops by polling the Bus Vision approach page and extracting the nearest
//! bus from its markup.
//!
//! ## Usage
//!
//! The tracker uses a singleton pattern for easy access throughout the application:
//!
//! ```no_run
//! use bus_approach_tracker::{ApproachTracker, PollResult};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Get the global tracker instance (starts polling every 15s)
//! let tracker = ApproachTracker::global().await?;
//!
//! // Ask for a refresh, e.g. from a button
//! tracker.trigger_manual_refresh();
//!
//! // Read whatever was published last
//! let view = tracker.current_snapshot().await;
//! match view.result {
//!     Some(PollResult::Success(snapshot)) => println!("{}", snapshot),
//!     Some(PollResult::Failure(reason)) => eprintln!("接続エラー: {}", reason),
//!     None => println!("最新データを取得中..."),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! All settings are compile-time constants in the `constants` module,
//! exposed as named values through `TrackerConfig`:
//!
//! - Poll interval: 15 seconds
//! - Request timeout: 10 seconds
//! - Stops: 69 (茨城高専前) → 76 (勝田駅前)
//!
//! `BUS_APPROACH_URL` overrides the endpoint.
//!
//! ## Architecture
//!
//! ```text
//! ApproachTracker (timer tick / manual refresh)
//!     ↓
//! ApproachFetcher (Bus Vision over HTTP)
//!     ↓
//! extractor (one probe per field)
//!     ↓
//! ApproachStore (latest result + loading flag)
//!     ↓
//! Your Code (current_snapshot, subscribe)
//! ```
//!
//! ## Errors
//!
//! A page saying no bus is coming is a successful poll with
//! `has_data == false`. Only transport problems (bad URL, connection,
//! timeout, HTTP status, undecodable body) produce `PollResult::Failure`.
//! Fields the page does not carry come back empty.

pub mod config;
pub mod constants;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod fetchers;
pub mod metrics;
pub mod store;
pub mod tracker;
pub mod types;

// Re-export commonly used types
pub use config::{StopNames, TrackerConfig};
pub use error::{ApproachError, FetchError};
pub use metrics::FetcherMetrics;
pub use tracker::ApproachTracker;
pub use types::{
    ApproachEvent, ApproachSnapshot, ApproachStatus, ComponentHealth, HealthStatus, PollResult,
    StoreView,
};
