// ── Update coordinator ──
//
// Owns the polling schedule for one pool: periodic fetches, single-flight
// guarding, fan-out of each snapshot to the entity registry, restore-state
// persistence, and availability tracking. Fetch failures never escape the
// background task; they clear the available flag and are kept for
// diagnostics.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use poolmath_api::{FetchErrorKind, FetchOutcome, FetchSource, PoolMathClient, Snapshot, TransportConfig};
use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::diagnostics::{self, Diagnostics};
use crate::error::CoreError;
use crate::model::{PoolSource, validate_poll_interval};
use crate::store::{EntityRegistry, RestoreStore, StoredPoolState};
use crate::stream::MeasurementStream;

// ── SnapshotSource ───────────────────────────────────────────────

/// Anything that can produce pool snapshots.
///
/// Implemented by [`PoolMathClient`]; tests substitute scripted sources.
pub trait SnapshotSource: Send + Sync + 'static {
    fn fetch(&self) -> impl Future<Output = Result<FetchOutcome, poolmath_api::Error>> + Send;
}

impl SnapshotSource for PoolMathClient {
    fn fetch(&self) -> impl Future<Output = Result<FetchOutcome, poolmath_api::Error>> + Send {
        PoolMathClient::fetch(self)
    }
}

// ── State ────────────────────────────────────────────────────────

/// Coordinator state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CoordinatorState {
    Idle,
    Fetching,
    Applying,
    Failed,
}

/// What one refresh attempt did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A snapshot was pushed to the entities.
    Applied(FetchSource),
    /// The fetch failed; entity values were kept.
    Failed {
        kind: Option<FetchErrorKind>,
        message: String,
    },
    /// Another refresh was already in flight.
    Skipped,
    /// The coordinator shut down before the result could be applied.
    Discarded,
}

/// The last failed fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    pub at: DateTime<Utc>,
    pub kind: Option<FetchErrorKind>,
    pub message: String,
}

// ── Coordinator ──────────────────────────────────────────────────

/// Polling coordinator for one pool.
///
/// Cheaply cloneable via `Arc`. Call [`start()`](Self::start) to restore
/// state, run the first refresh and spawn the timer; [`shutdown()`](Self::shutdown)
/// to stop it.
pub struct Coordinator<S: SnapshotSource = PoolMathClient> {
    inner: Arc<CoordinatorInner<S>>,
}

impl<S: SnapshotSource> Clone for Coordinator<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct CoordinatorInner<S> {
    source: PoolSource,
    restore_key: String,
    client: S,
    registry: Arc<EntityRegistry>,
    restore: Arc<dyn RestoreStore>,
    state: watch::Sender<CoordinatorState>,
    poll_interval: watch::Sender<Duration>,
    in_flight: AtomicBool,
    started: AtomicBool,
    last_success: ArcSwapOption<DateTime<Utc>>,
    last_failure: ArcSwapOption<FailureRecord>,
    last_snapshot: ArcSwapOption<Snapshot>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Coordinator<PoolMathClient> {
    /// Build a coordinator backed by the public API, using the source's timeout.
    pub fn for_source(source: PoolSource, restore: Arc<dyn RestoreStore>) -> Result<Self, CoreError> {
        let ids = source.require_ids()?.clone();
        let transport = TransportConfig::default().with_timeout(source.timeout);
        let client = PoolMathClient::new(ids, &transport)?;
        Self::new(source, client, restore)
    }
}

impl<S: SnapshotSource> Coordinator<S> {
    /// Create a coordinator. Does NOT start polling.
    ///
    /// Legacy sources are rejected with [`CoreError::MigrationRequired`].
    pub fn new(
        source: PoolSource,
        client: S,
        restore: Arc<dyn RestoreStore>,
    ) -> Result<Self, CoreError> {
        let restore_key = source.require_ids()?.key();
        validate_poll_interval(source.poll_interval)?;

        let (state, _) = watch::channel(CoordinatorState::Idle);
        let (poll_interval, _) = watch::channel(source.poll_interval);
        let registry = Arc::new(EntityRegistry::new(source.clone()));

        Ok(Self {
            inner: Arc::new(CoordinatorInner {
                source,
                restore_key,
                client,
                registry,
                restore,
                state,
                poll_interval,
                in_flight: AtomicBool::new(false),
                started: AtomicBool::new(false),
                last_success: ArcSwapOption::empty(),
                last_failure: ArcSwapOption::empty(),
                last_snapshot: ArcSwapOption::empty(),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        })
    }

    pub fn source(&self) -> &PoolSource {
        &self.inner.source
    }

    pub fn client(&self) -> &S {
        &self.inner.client
    }

    pub fn registry(&self) -> &Arc<EntityRegistry> {
        &self.inner.registry
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Restore entity state, run the first refresh, then spawn the timer.
    ///
    /// A failing first refresh is not an error; it is reported in the
    /// returned outcome and through diagnostics.
    pub async fn start(&self) -> Result<RefreshOutcome, CoreError> {
        if self.inner.started.swap(true, Ordering::AcqRel) {
            return Err(CoreError::Internal(format!(
                "coordinator for '{}' already started",
                self.inner.source.name
            )));
        }

        self.restore_state();
        let outcome = self.refresh().await;

        let handle = tokio::spawn(refresh_task(self.clone(), self.inner.cancel.clone()));
        self.inner.task_handles.lock().await.push(handle);

        info!(
            pool = %self.inner.source.name,
            interval_secs = self.poll_interval().as_secs(),
            "coordinator started"
        );
        Ok(outcome)
    }

    /// Stop the timer. An in-flight fetch may still complete, but its
    /// result is discarded.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        let _ = self.inner.state.send_replace(CoordinatorState::Idle);
        debug!(pool = %self.inner.source.name, "coordinator stopped");
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// Seed the registry from the restore store. Failures are logged.
    ///
    /// Reads synchronously; this runs once, before polling starts.
    pub fn restore_state(&self) -> usize {
        match self.inner.restore.load(&self.inner.restore_key) {
            Ok(Some(state)) => {
                let restored = self.inner.registry.restore(&state);
                debug!(pool = %self.inner.source.name, restored, "restored entity state");
                restored
            }
            Ok(None) => 0,
            Err(e) => {
                warn!(pool = %self.inner.source.name, error = %e, "cannot restore entity state");
                0
            }
        }
    }

    // ── Refresh ──────────────────────────────────────────────────

    /// Fetch once and apply the result. Skipped if a refresh is in flight.
    pub async fn refresh(&self) -> RefreshOutcome {
        if self.is_shut_down() {
            return RefreshOutcome::Discarded;
        }
        if self
            .inner
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(pool = %self.inner.source.name, "refresh already in flight, skipping");
            return RefreshOutcome::Skipped;
        }
        let _guard = InFlightGuard(&self.inner.in_flight);

        self.set_state(CoordinatorState::Fetching);
        let result = self.inner.client.fetch().await;

        if self.is_shut_down() {
            debug!(pool = %self.inner.source.name, "discarding fetch result after shutdown");
            return RefreshOutcome::Discarded;
        }

        let outcome = match result {
            Ok(fetched) => self.apply(fetched).await,
            Err(e) => self.record_failure(&e),
        };
        self.set_state(CoordinatorState::Idle);
        outcome
    }

    async fn apply(&self, fetched: FetchOutcome) -> RefreshOutcome {
        self.set_state(CoordinatorState::Applying);
        let registry = &self.inner.registry;

        let report = registry.apply_snapshot(&fetched.snapshot);
        self.persist(registry.stored_state()).await;

        self.inner.last_snapshot.store(Some(Arc::clone(&fetched.snapshot)));
        self.inner.last_success.store(Some(Arc::new(Utc::now())));
        registry.set_available(true);

        debug!(
            pool = %self.inner.source.name,
            source = %fetched.source,
            updated = report.updated.len(),
            "applied snapshot"
        );
        RefreshOutcome::Applied(fetched.source)
    }

    /// Restore stores may touch the filesystem, so saves run on the
    /// blocking pool.
    async fn persist(&self, state: StoredPoolState) {
        let store = Arc::clone(&self.inner.restore);
        let key = self.inner.restore_key.clone();
        let saved = tokio::task::spawn_blocking(move || store.save(&key, &state)).await;

        let error = match saved {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e.to_string(),
            Err(e) => e.to_string(),
        };
        warn!(pool = %self.inner.source.name, %error, "cannot persist entity state");
    }

    fn record_failure(&self, err: &poolmath_api::Error) -> RefreshOutcome {
        self.set_state(CoordinatorState::Failed);
        self.inner.registry.set_available(false);

        let kind = err.fetch_kind();
        let message = err.to_string();
        self.inner.last_failure.store(Some(Arc::new(FailureRecord {
            at: Utc::now(),
            kind,
            message: message.clone(),
        })));

        debug!(pool = %self.inner.source.name, error = %message, "fetch failed");
        RefreshOutcome::Failed { kind, message }
    }

    fn set_state(&self, state: CoordinatorState) {
        let _ = self.inner.state.send_replace(state);
    }

    // ── Configuration ────────────────────────────────────────────

    /// Change the poll interval. The tick already scheduled keeps its
    /// deadline; the new interval applies from the next one.
    pub fn set_poll_interval(&self, interval: Duration) -> Result<(), CoreError> {
        validate_poll_interval(interval)?;
        let _ = self.inner.poll_interval.send_replace(interval);
        info!(
            pool = %self.inner.source.name,
            interval_secs = interval.as_secs(),
            "poll interval changed"
        );
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        *self.inner.poll_interval.borrow()
    }

    // ── Observation ──────────────────────────────────────────────

    pub fn state(&self) -> watch::Receiver<CoordinatorState> {
        self.inner.state.subscribe()
    }

    pub fn current_state(&self) -> CoordinatorState {
        *self.inner.state.borrow()
    }

    pub fn is_available(&self) -> bool {
        self.inner.registry.is_available()
    }

    pub fn last_success(&self) -> Option<DateTime<Utc>> {
        self.inner.last_success.load_full().map(|t| *t)
    }

    pub fn last_failure(&self) -> Option<Arc<FailureRecord>> {
        self.inner.last_failure.load_full()
    }

    pub fn last_snapshot(&self) -> Option<Arc<Snapshot>> {
        self.inner.last_snapshot.load_full()
    }

    pub fn entities(&self) -> MeasurementStream {
        self.inner.registry.stream()
    }

    pub fn diagnostics(&self) -> Diagnostics {
        diagnostics::collect(self)
    }
}

/// Clears the in-flight flag when the refresh ends, even on early return.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// ── Background task ──────────────────────────────────────────────

/// Fire a refresh on every tick. Each refresh runs in its own task, so a
/// slow fetch makes the next tick skip rather than delay the schedule.
async fn refresh_task<S: SnapshotSource>(coordinator: Coordinator<S>, cancel: CancellationToken) {
    let mut next = Instant::now() + coordinator.poll_interval();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep_until(next) => {
                let tick = coordinator.clone();
                tokio::spawn(async move {
                    if let RefreshOutcome::Skipped = tick.refresh().await {
                        debug!(pool = %tick.source().name, "tick skipped");
                    }
                });
                next = Instant::now() + coordinator.poll_interval();
            }
        }
    }
}
