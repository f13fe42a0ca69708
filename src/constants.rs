//! Constants for the bus approach tracker
//!
//! All configuration for the tracker is centralized here. `TrackerConfig`
//! exposes these as named values; nothing here is editable at runtime.

/// How often to poll the approach page (in seconds)
pub const REFRESH_INTERVAL_SECS: u64 = 15;

/// HTTP request timeout when fetching the approach page (in seconds)
///
/// Must stay below `REFRESH_INTERVAL_SECS` so a stalled request cannot
/// starve the next cycle.
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// How long before a published snapshot is considered stale (in seconds)
pub const STALE_THRESHOLD_SECS: u64 = 120;

/// Bus Vision approach page (without query)
pub const BUS_VISION_APPROACH_URL: &str = "https://mc.bus-vision.jp/ibako/view/approach.html";

/// Stop code of the departure stop
pub const STOP_CODE_FROM: u32 = 69;

/// Stop code of the arrival stop
pub const STOP_CODE_TO: u32 = 76;

/// Name shown for the departure stop when the page omits it
pub const DEFAULT_STOP_FROM: &str = "茨城高専前";

/// Name shown for the arrival stop when the page omits it
pub const DEFAULT_STOP_TO: &str = "勝田駅前";

/// Phrase the page renders when no bus is approaching
pub const NO_APPROACH_MARKER: &str = "該当する接近情報はありません";

/// Update time reported when the page carries no timestamp
pub const UNKNOWN_UPDATE_TIME: &str = "不明";

/// Environment variable that overrides the endpoint URL
pub const ENDPOINT_ENV_VAR: &str = "BUS_APPROACH_URL";

/// Capacity of the event broadcast channel
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// User agent for HTTP requests
pub const USER_AGENT: &str = "bus-approach-tracker/0.1.0";
