//! In-memory snapshot store with broadcast capabilities

use crate::{
    constants::EVENT_CHANNEL_CAPACITY,
    error::ApproachError,
    types::{ApproachEvent, ApproachSnapshot, PollResult, StoreView},
};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};

/// Published state, only written by `publish`
#[derive(Debug, Default)]
struct StoreState {
    result: Option<PollResult>,
    last_snapshot: Option<ApproachSnapshot>,
    updated_at: Option<chrono::DateTime<Utc>>,
}

/// In-memory store for the latest poll result
///
/// Holds one result at a time. Readers get clones; nothing hands out a
/// reference into the store. Subscribers receive an [`ApproachEvent`] on
/// every publish, and may miss events if they lag (a later event always
/// supersedes an earlier one).
pub struct ApproachStore {
    state: RwLock<StoreState>,
    /// Number of cycles currently in flight
    in_flight: Arc<AtomicUsize>,
    closed: AtomicBool,
    events: broadcast::Sender<ApproachEvent>,
}

impl ApproachStore {
    /// Creates a new, empty store
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: RwLock::new(StoreState::default()),
            in_flight: Arc::new(AtomicUsize::new(0)),
            closed: AtomicBool::new(false),
            events,
        }
    }

    /// Replaces the current result
    ///
    /// A success also becomes the retained `last_snapshot`; a failure leaves
    /// the retained snapshot alone.
    ///
    /// # Returns
    /// False if the store is closed and the result was dropped
    pub async fn publish(&self, result: PollResult) -> bool {
        if self.is_closed() {
            tracing::debug!("Store closed, dropping late poll result");
            return false;
        }

        let mut state = self.state.write().await;
        // close() may have landed while waiting for the lock
        if self.is_closed() {
            tracing::debug!("Store closed, dropping late poll result");
            return false;
        }

        let now = Utc::now();
        let event = ApproachEvent::from_result(&result, now);
        if let PollResult::Success(snapshot) = &result {
            state.last_snapshot = Some(snapshot.clone());
        }
        state.result = Some(result);
        state.updated_at = Some(now);

        // No subscribers is fine
        let _ = self.events.send(event);
        true
    }

    /// Returns the current view of the store
    pub async fn read(&self) -> StoreView {
        let state = self.state.read().await;
        StoreView {
            result: state.result.clone(),
            is_loading: self.is_loading(),
            last_snapshot: state.last_snapshot.clone(),
            updated_at: state.updated_at,
        }
    }

    /// Marks a cycle as in flight until the guard is dropped
    pub fn begin_loading(&self) -> LoadingGuard {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        LoadingGuard {
            in_flight: self.in_flight.clone(),
        }
    }

    /// True while at least one cycle is in flight
    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Gets the snapshot from the latest poll
    ///
    /// # Arguments
    /// * `stale_threshold` - Maximum age of the published snapshot
    ///
    /// # Returns
    /// The snapshot, or an error if nothing was fetched, the latest poll
    /// failed, or the snapshot is older than the threshold
    pub async fn latest_snapshot(
        &self,
        stale_threshold: Duration,
    ) -> Result<ApproachSnapshot, ApproachError> {
        let state = self.state.read().await;
        let snapshot = match state.result.as_ref().ok_or(ApproachError::NotAvailable)? {
            PollResult::Success(snapshot) => snapshot.clone(),
            PollResult::Failure(reason) => return Err(ApproachError::fetch_failed(reason.clone())),
        };

        if let Some(updated_at) = state.updated_at {
            let age = Utc::now()
                .signed_duration_since(updated_at)
                .to_std()
                .unwrap_or_default();
            if age > stale_threshold {
                return Err(ApproachError::stale(age));
            }
        }

        Ok(snapshot)
    }

    /// Subscribes to publish events
    pub fn subscribe(&self) -> broadcast::Receiver<ApproachEvent> {
        self.events.subscribe()
    }

    /// Stops accepting results; later publishes are ignored
    ///
    /// Waits out a publish already holding the lock, so nothing is written
    /// or broadcast once this returns.
    pub async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        drop(self.state.write().await);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Default for ApproachStore {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard for an in-flight cycle
pub struct LoadingGuard {
    in_flight: Arc<AtomicUsize>,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
