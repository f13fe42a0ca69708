//! Bus approach tracker service
//!
//! Drives the fetch → extract → publish cycle on a fixed schedule and on
//! demand, and exposes the latest result to observers.

use crate::{
    config::TrackerConfig,
    error::{ApproachError, FetchError},
    extractor::ApproachExtractor,
    fetcher::ApproachFetcher,
    fetchers::BusVisionFetcher,
    metrics::{FetcherMetrics, MetricsCollector},
    store::{ApproachStore, LoadingGuard},
    types::{
        ApproachEvent, ApproachSnapshot, ComponentHealth, HealthStatus, PollResult, StoreView,
    },
};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, OnceCell};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

static GLOBAL_TRACKER: OnceCell<Arc<ApproachTracker>> = OnceCell::const_new();

/// Everything one poll cycle needs, cheap to clone into a task
#[derive(Clone)]
struct PollCycle {
    fetcher: Arc<dyn ApproachFetcher>,
    extractor: Arc<ApproachExtractor>,
    store: Arc<ApproachStore>,
    metrics: Arc<MetricsCollector>,
    /// Runtime cycles are spawned on, `None` if built outside one
    runtime: Option<Handle>,
}

impl PollCycle {
    /// Runs one fetch-extract-publish cycle
    async fn run(&self) -> PollResult {
        self.run_loading(self.store.begin_loading()).await
    }

    /// Runs a cycle that was already marked as loading
    ///
    /// The store reports loading until `_loading` drops at the end of this
    /// future, including when it is cancelled or unwinds.
    async fn run_loading(&self, _loading: LoadingGuard) -> PollResult {
        let start = Instant::now();

        let result = match self.fetcher.fetch_page().await {
            Ok(body) => {
                let snapshot = self.extractor.extract(&body);
                tracing::debug!(
                    fetcher = self.fetcher.fetcher_name(),
                    latency_ms = start.elapsed().as_millis() as u64,
                    has_data = snapshot.has_data,
                    "Fetched approach snapshot"
                );
                PollResult::Success(snapshot)
            }
            Err(e) => {
                tracing::warn!(
                    fetcher = self.fetcher.fetcher_name(),
                    transient = e.is_transient(),
                    error = %e,
                    "Failed to fetch approach page"
                );
                PollResult::Failure(e.to_string())
            }
        };

        self.metrics
            .record_request(start.elapsed(), result.is_success())
            .await;
        self.store.publish(result.clone()).await;
        result
    }

    /// Runs a cycle on its own task
    ///
    /// Loading is marked before this returns, not when the task first runs.
    /// Callable from any thread; without a runtime nothing is spawned.
    fn spawn(&self) -> Option<JoinHandle<PollResult>> {
        let Some(runtime) = self.runtime.as_ref() else {
            tracing::warn!("No tokio runtime available, skipping poll cycle");
            return None;
        };
        let loading = self.store.begin_loading();
        let cycle = self.clone();
        Some(runtime.spawn(async move { cycle.run_loading(loading).await }))
    }
}

/// Bus approach tracker
///
/// Polls the approach page every `poll_interval` once started, and on every
/// manual refresh. Cycles are independent: a manual refresh while another
/// cycle is in flight starts a second one, and whichever publishes last
/// wins.
///
/// # Example
/// ```no_run
/// use bus_approach_tracker::ApproachTracker;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let tracker = ApproachTracker::global().await?;
/// tracker.trigger_manual_refresh();
///
/// let view = tracker.current_snapshot().await;
/// if let Some(snapshot) = view.last_snapshot {
///     println!("{}", snapshot);
/// }
/// # Ok(())
/// # }
/// ```
pub struct ApproachTracker {
    config: TrackerConfig,
    cycle: PollCycle,
    cancel: CancellationToken,
    schedule: Mutex<Option<JoinHandle<()>>>,
}

impl ApproachTracker {
    /// Returns the global singleton instance
    ///
    /// On first call, this initializes the tracker and starts the schedule.
    /// Subsequent calls return the same instance.
    pub async fn global() -> Result<Arc<Self>, FetchError> {
        GLOBAL_TRACKER
            .get_or_try_init(|| async {
                let tracker = Self::new()?;
                tracker.start();
                Ok::<_, FetchError>(Arc::new(tracker))
            })
            .await
            .cloned()
    }

    /// Creates a new tracker for the Bus Vision page
    ///
    /// Uses the default configuration, with the endpoint taken from
    /// `BUS_APPROACH_URL` when set. Use `global()` in production code.
    pub fn new() -> Result<Self, FetchError> {
        let config = TrackerConfig::from_env();
        let fetcher = Arc::new(BusVisionFetcher::from_config(&config)?);
        Ok(Self::with_fetcher(fetcher, config))
    }

    /// Creates a new tracker with a custom fetcher
    ///
    /// Cycles run on the tokio runtime current at construction time. When
    /// built outside a runtime, supply one with `with_runtime`.
    pub fn with_fetcher(fetcher: Arc<dyn ApproachFetcher>, config: TrackerConfig) -> Self {
        let metrics = Arc::new(MetricsCollector::new(fetcher.fetcher_name()));
        let cycle = PollCycle {
            fetcher,
            extractor: Arc::new(ApproachExtractor::new(config.stops.clone())),
            store: Arc::new(ApproachStore::new()),
            metrics,
            runtime: Handle::try_current().ok(),
        };

        Self {
            config,
            cycle,
            cancel: CancellationToken::new(),
            schedule: Mutex::new(None),
        }
    }

    /// Runs cycles and the schedule on the given runtime
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.cycle.runtime = Some(runtime);
        self
    }

    /// Starts the recurring schedule
    ///
    /// The first poll fires immediately. Each tick spawns its own cycle, so a
    /// slow request never delays the next tick. Calling this again, or after
    /// `shutdown`, does nothing.
    pub fn start(&self) {
        let mut schedule = self.schedule.lock().unwrap_or_else(|e| e.into_inner());
        if schedule.is_some() || self.cancel.is_cancelled() {
            return;
        }

        let Some(runtime) = self.cycle.runtime.clone() else {
            tracing::warn!("No tokio runtime available, schedule not started");
            return;
        };
        let cycle = self.cycle.clone();
        let cancel = self.cancel.clone();
        // interval() panics on a zero period
        let period = self.config.poll_interval.max(Duration::from_millis(1));

        *schedule = Some(runtime.spawn(async move {
            tracing::info!(
                poll_interval_ms = period.as_millis() as u64,
                fetcher = cycle.fetcher.fetcher_name(),
                "Starting approach tracker schedule"
            );

            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        cycle.spawn();
                    }
                    _ = cancel.cancelled() => {
                        tracing::info!("Approach tracker schedule stopped");
                        break;
                    }
                }
            }
        }));
    }

    /// Requests an out-of-schedule refresh
    ///
    /// Fire-and-forget. Safe to call from any thread and while a cycle is
    /// already loading; the schedule is not reset. `is_loading` is true by
    /// the time this returns.
    pub fn trigger_manual_refresh(&self) {
        if self.cancel.is_cancelled() {
            tracing::debug!("Tracker shut down, ignoring manual refresh");
            return;
        }
        tracing::debug!("Manual refresh requested");
        self.cycle.spawn();
    }

    /// Runs one cycle immediately and waits for it
    ///
    /// # Returns
    /// The result of this cycle, which is also published to the store
    pub async fn refresh_now(&self) -> PollResult {
        self.cycle.run().await
    }

    /// Returns the current result and loading state
    pub async fn current_snapshot(&self) -> StoreView {
        self.cycle.store.read().await
    }

    /// True while at least one cycle is in flight
    pub fn is_loading(&self) -> bool {
        self.cycle.store.is_loading()
    }

    /// Gets the snapshot from the latest poll
    ///
    /// # Returns
    /// The snapshot, or an error if nothing was fetched yet, the latest poll
    /// failed, or the data is older than the stale threshold
    pub async fn latest_snapshot(&self) -> Result<ApproachSnapshot, ApproachError> {
        self.cycle
            .store
            .latest_snapshot(self.config.stale_threshold)
            .await
    }

    /// Subscribes to snapshot and failure events
    pub fn subscribe(&self) -> broadcast::Receiver<ApproachEvent> {
        self.cycle.store.subscribe()
    }

    /// Cancels the schedule and closes the store
    ///
    /// Cycles already in flight may still finish, but their results are
    /// discarded.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.cycle.store.close().await;

        let handle = self
            .schedule
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Approach tracker schedule ended abnormally");
            }
        }
    }

    /// Returns the name of the current fetcher
    pub fn fetcher_name(&self) -> &str {
        self.cycle.fetcher.fetcher_name()
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// URL of the tracked page, for opening it in a browser
    pub fn page_url(&self) -> &str {
        &self.config.endpoint
    }

    /// Gets fetcher metrics including latency percentiles and success rate
    pub async fn get_fetcher_metrics(&self) -> FetcherMetrics {
        self.cycle.metrics.get_metrics().await
    }

    /// Perform a health check on the tracker
    ///
    /// # Returns
    /// ComponentHealth indicating the status of the tracker
    pub async fn health_check(&self) -> ComponentHealth {
        let mut details = std::collections::HashMap::new();
        let view = self.current_snapshot().await;
        let metrics = self.get_fetcher_metrics().await;
        let latest = self.latest_snapshot().await;

        details.insert(
            "fetcher_name".to_string(),
            serde_json::json!(self.fetcher_name()),
        );
        details.insert("endpoint".to_string(), serde_json::json!(self.page_url()));
        details.insert("is_loading".to_string(), serde_json::json!(view.is_loading));
        details.insert(
            "last_error".to_string(),
            serde_json::json!(view.last_error()),
        );
        details.insert(
            "has_data".to_string(),
            serde_json::json!(view.last_snapshot.as_ref().map(|s| s.has_data)),
        );
        details.insert(
            "consecutive_failures".to_string(),
            serde_json::json!(metrics.consecutive_failures),
        );
        details.insert(
            "success_rate".to_string(),
            serde_json::json!(metrics.success_rate),
        );

        let (status, message) = match (&latest, &view.last_snapshot) {
            (Ok(_), _) => (
                HealthStatus::Healthy,
                "Approach tracker is operational with fresh data".to_string(),
            ),
            (Err(e), Some(_)) => (
                HealthStatus::Degraded,
                format!("Approach tracker is serving old data: {}", e),
            ),
            (Err(e), None) => (
                HealthStatus::Unhealthy,
                format!("Approach tracker has no approach data: {}", e),
            ),
        };

        ComponentHealth {
            name: "bus_approach_tracker".to_string(),
            status,
            message: Some(message),
            details,
            last_checked: chrono::Utc::now(),
        }
    }
}

impl Drop for ApproachTracker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
