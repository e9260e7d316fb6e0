//! Restart orchestration.
//!
//! [`RestartCoordinator`] validates restart requests, enforces
//! one-attempt-at-a-time, and drives accepted attempts through the
//! lifecycle on a spawned task: pre-restart callbacks, request drain,
//! configuration reload, post-restart callbacks, and rollback on failure.
//!
//! The coordinator's mutex guards only the state machine and the identity
//! of the current attempt. It is never held across an `.await`; callbacks,
//! the drain wait, and provider calls all run without it. Status reads go
//! through a `watch` channel and never touch the mutex at all.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use uuid::Uuid;

use crate::callbacks::CallbackRegistry;
use crate::config::{ConfigProvider, ConfigSnapshot, NullConfigProvider};
use crate::error::CoreError;
use crate::history::{RestartAttempt, RestartHistory, DEFAULT_HISTORY_CAPACITY};
use crate::state::{RestartState, StateMachine};
use crate::tracker::RequestTracker;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Drain timeout used when the caller does not supply one.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Smallest accepted drain timeout.
pub const MIN_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Largest accepted drain timeout.
pub const MAX_DRAIN_TIMEOUT: Duration = Duration::from_secs(600);

/// Reason recorded when the caller does not give one.
pub const DEFAULT_REASON: &str = "manual restart";

/// Maximum length of the requesting user identifier.
const MAX_USER_LEN: usize = 128;

/// Maximum length of the restart reason.
const MAX_REASON_LEN: usize = 500;

// ---------------------------------------------------------------------------
// Request / status types
// ---------------------------------------------------------------------------

/// Parameters of one restart attempt. Validated on construction and
/// immutable afterwards.
#[derive(Debug, Clone)]
pub struct RestartRequest {
    requesting_user: String,
    reason: String,
    force: bool,
    reload_config: bool,
    timeout: Duration,
}

impl RestartRequest {
    /// Build a validated request.
    ///
    /// `requesting_user` must be non-empty (after trimming) and at most
    /// 128 characters. An empty `reason` becomes [`DEFAULT_REASON`];
    /// otherwise it must be at most 500 characters. `timeout` bounds the
    /// drain wait and must lie within 1..=600 seconds.
    pub fn new(
        requesting_user: impl Into<String>,
        reason: impl Into<String>,
        force: bool,
        reload_config: bool,
        timeout: Duration,
    ) -> Result<Self, CoreError> {
        let requesting_user = requesting_user.into().trim().to_string();
        if requesting_user.is_empty() {
            return Err(CoreError::Validation(
                "Requesting user must not be empty".to_string(),
            ));
        }
        if requesting_user.chars().count() > MAX_USER_LEN {
            return Err(CoreError::Validation(format!(
                "Requesting user must be at most {MAX_USER_LEN} characters"
            )));
        }

        let reason = reason.into().trim().to_string();
        let reason = if reason.is_empty() {
            DEFAULT_REASON.to_string()
        } else {
            reason
        };
        if reason.chars().count() > MAX_REASON_LEN {
            return Err(CoreError::Validation(format!(
                "Restart reason must be at most {MAX_REASON_LEN} characters"
            )));
        }

        if timeout < MIN_DRAIN_TIMEOUT || timeout > MAX_DRAIN_TIMEOUT {
            return Err(CoreError::Validation(format!(
                "Drain timeout must be between {} and {} seconds",
                MIN_DRAIN_TIMEOUT.as_secs(),
                MAX_DRAIN_TIMEOUT.as_secs(),
            )));
        }

        Ok(Self {
            requesting_user,
            reason,
            force,
            reload_config,
            timeout,
        })
    }

    pub fn requesting_user(&self) -> &str {
        &self.requesting_user
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Skip the drain wait. A forced request still refuses to preempt an
    /// attempt already in progress.
    pub fn force(&self) -> bool {
        self.force
    }

    pub fn reload_config(&self) -> bool {
        self.reload_config
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Minimal state snapshot published on every transition.
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    pub state: RestartState,
    pub attempt_id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
}

/// Point-in-time view of the coordinator, safe to read from any task.
#[derive(Debug, Clone, Serialize)]
pub struct RestartStatus {
    pub state: RestartState,
    pub attempt_id: Option<Uuid>,
    pub active_requests: usize,
    pub started_at: Option<DateTime<Utc>>,
    /// Seconds since the current attempt started.
    pub elapsed_secs: Option<f64>,
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

struct CurrentAttempt {
    id: Uuid,
    started_at: DateTime<Utc>,
}

struct MachineCell {
    machine: StateMachine,
    current: Option<CurrentAttempt>,
}

struct CoordinatorInner {
    tracker: RequestTracker,
    hooks: CallbackRegistry,
    config: Arc<dyn ConfigProvider>,
    history: RestartHistory,
    cell: Mutex<MachineCell>,
    status_tx: watch::Sender<StateSnapshot>,
}

/// Coordinates graceful restarts for one service instance.
///
/// Cheaply cloneable; clones share all state. Built via
/// [`RestartCoordinator::builder`], typically once at startup with the
/// host's tracker, callback registry, and config provider.
#[derive(Clone)]
pub struct RestartCoordinator {
    inner: Arc<CoordinatorInner>,
}

/// Startup-time assembly of a [`RestartCoordinator`].
pub struct RestartCoordinatorBuilder {
    tracker: RequestTracker,
    hooks: CallbackRegistry,
    config: Arc<dyn ConfigProvider>,
    history_capacity: usize,
}

impl RestartCoordinatorBuilder {
    pub fn hooks(mut self, hooks: CallbackRegistry) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn config_provider(mut self, provider: Arc<dyn ConfigProvider>) -> Self {
        self.config = provider;
        self
    }

    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    pub fn build(self) -> RestartCoordinator {
        let (status_tx, _) = watch::channel(StateSnapshot {
            state: RestartState::Idle,
            attempt_id: None,
            started_at: None,
        });
        RestartCoordinator {
            inner: Arc::new(CoordinatorInner {
                tracker: self.tracker,
                hooks: self.hooks,
                config: self.config,
                history: RestartHistory::new(self.history_capacity),
                cell: Mutex::new(MachineCell {
                    machine: StateMachine::new(),
                    current: None,
                }),
                status_tx,
            }),
        }
    }
}

impl RestartCoordinator {
    pub fn builder(tracker: RequestTracker) -> RestartCoordinatorBuilder {
        RestartCoordinatorBuilder {
            tracker,
            hooks: CallbackRegistry::new(),
            config: Arc::new(NullConfigProvider),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }

    /// Coordinator with no hooks and nothing to reload.
    pub fn new(tracker: RequestTracker) -> Self {
        Self::builder(tracker).build()
    }

    /// Accept a restart request and start driving it.
    ///
    /// Rejects with [`CoreError::Conflict`] unless the coordinator is idle;
    /// a forced request skips the drain wait but never preempts an attempt
    /// already in progress. On acceptance the state is `preparing` before
    /// this returns, the attempt is opened in the history, and the drive
    /// continues on a spawned task. Must be called from within a tokio
    /// runtime.
    pub fn request_restart(&self, request: RestartRequest) -> Result<Uuid, CoreError> {
        let attempt_id = Uuid::new_v4();
        {
            let mut cell = self
                .inner
                .cell
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let state = cell.machine.current();
            if state != RestartState::Idle {
                return Err(CoreError::Conflict(format!(
                    "A restart is already in progress (state: {state})"
                )));
            }
            cell.machine.transition(RestartState::Preparing)?;

            let mut attempt = RestartAttempt::new(
                attempt_id,
                request.requesting_user(),
                request.reason(),
                request.force(),
                request.reload_config(),
            );
            attempt.record_transition(RestartState::Preparing);
            let started_at = attempt.started_at;
            self.inner.history.open(attempt);

            cell.current = Some(CurrentAttempt {
                id: attempt_id,
                started_at,
            });
            self.inner.tracker.set_draining(true);
            self.inner.publish(&cell);
        }

        tracing::info!(
            attempt_id = %attempt_id,
            user = request.requesting_user(),
            reason = request.reason(),
            force = request.force(),
            reload_config = request.reload_config(),
            timeout_secs = request.timeout().as_secs(),
            "Restart requested",
        );

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            inner.run_attempt(attempt_id, request).await;
        });

        Ok(attempt_id)
    }

    /// Cancel the current attempt.
    ///
    /// Only legal while `preparing`; once draining starts the attempt runs
    /// to its terminal state. Returns the id of the cancelled attempt.
    pub fn cancel_restart(&self, user: &str) -> Result<Uuid, CoreError> {
        let user = user.trim();
        if user.is_empty() {
            return Err(CoreError::Validation(
                "Cancelling user must not be empty".to_string(),
            ));
        }

        let mut cell = self
            .inner
            .cell
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let state = cell.machine.current();
        if state != RestartState::Preparing {
            return Err(CoreError::Conflict(format!(
                "Restart can only be cancelled while preparing (state: {state})"
            )));
        }
        let attempt_id = match &cell.current {
            Some(current) => current.id,
            None => {
                return Err(CoreError::Conflict(
                    "No restart attempt to cancel".to_string(),
                ))
            }
        };

        cell.machine.transition(RestartState::Idle)?;
        cell.current = None;
        self.inner.tracker.set_draining(false);
        self.inner.history.update(attempt_id, |attempt| {
            attempt.record_transition(RestartState::Idle);
            attempt.cancelled_by = Some(user.to_string());
            attempt.finished_at = Some(Utc::now());
        });
        self.inner.publish(&cell);

        tracing::info!(attempt_id = %attempt_id, user, "Restart cancelled");
        Ok(attempt_id)
    }

    /// Current status. Reads the published snapshot and the live tracker
    /// count; never contends with a running attempt.
    pub fn status(&self) -> RestartStatus {
        let snapshot = self.inner.status_tx.borrow().clone();
        RestartStatus {
            state: snapshot.state,
            attempt_id: snapshot.attempt_id,
            active_requests: self.inner.tracker.active_count(),
            started_at: snapshot.started_at,
            elapsed_secs: snapshot
                .started_at
                .map(|started| (Utc::now() - started).num_milliseconds() as f64 / 1000.0),
        }
    }

    pub fn state(&self) -> RestartState {
        self.inner.status_tx.borrow().state
    }

    /// Subscribe to state snapshots. The receiver observes every settled
    /// state change, newest value wins.
    pub fn watch_status(&self) -> watch::Receiver<StateSnapshot> {
        self.inner.status_tx.subscribe()
    }

    /// The most recent attempts, newest first.
    pub fn history(&self, limit: usize) -> Vec<RestartAttempt> {
        self.inner.history.recent(limit)
    }

    pub fn tracker(&self) -> &RequestTracker {
        &self.inner.tracker
    }
}

// ---------------------------------------------------------------------------
// Attempt driver
// ---------------------------------------------------------------------------

impl CoordinatorInner {
    async fn run_attempt(&self, attempt_id: Uuid, request: RestartRequest) {
        if let Err(failure) = self.hooks.run_pre().await {
            self.finalize(
                attempt_id,
                RestartState::Failed,
                Some(failure.to_string()),
                false,
            );
            return;
        }

        if !self.advance(attempt_id, RestartState::WaitingRequests) {
            return;
        }

        if request.force() {
            tracing::info!(attempt_id = %attempt_id, "Drain wait skipped (force)");
        } else {
            let drained = self.tracker.await_drain(request.timeout()).await;
            if drained {
                tracing::info!(attempt_id = %attempt_id, "In-flight requests drained");
            } else {
                tracing::warn!(
                    attempt_id = %attempt_id,
                    active = self.tracker.active_count(),
                    timeout_secs = request.timeout().as_secs(),
                    "Drain timed out; continuing with requests still in flight",
                );
            }
            self.history
                .update(attempt_id, |attempt| attempt.drained = Some(drained));
        }

        if !self.advance(attempt_id, RestartState::Restarting) {
            return;
        }

        let mut snapshot = None;
        match self.apply(attempt_id, &request, &mut snapshot).await {
            Ok(()) => self.finalize(attempt_id, RestartState::Completed, None, false),
            Err(error) => {
                self.recover(attempt_id, request.reload_config(), snapshot, error)
                    .await
            }
        }
    }

    /// Reconfiguration phase: snapshot, reload, post hooks. The snapshot is
    /// written out through `snapshot` so the caller can roll back to it.
    async fn apply(
        &self,
        attempt_id: Uuid,
        request: &RestartRequest,
        snapshot: &mut Option<ConfigSnapshot>,
    ) -> Result<(), CoreError> {
        if request.reload_config() {
            let snap = self.config.snapshot().await?;
            tracing::info!(
                attempt_id = %attempt_id,
                snapshot_id = %snap.id(),
                "Configuration snapshot taken",
            );
            self.history
                .update(attempt_id, |attempt| attempt.config_snapshot_id = Some(snap.id()));
            *snapshot = Some(snap);

            self.config.reload().await?;
            tracing::info!(attempt_id = %attempt_id, "Configuration reloaded");
        }

        self.hooks.run_post().await?;
        Ok(())
    }

    async fn recover(
        &self,
        attempt_id: Uuid,
        reload_config: bool,
        snapshot: Option<ConfigSnapshot>,
        error: CoreError,
    ) {
        tracing::error!(attempt_id = %attempt_id, error = %error, "Restart failed; recovering");
        if !self.advance(attempt_id, RestartState::Recovering) {
            return;
        }

        let mut rollback_failed = false;
        match &snapshot {
            Some(snap) => match self.config.restore(snap).await {
                Ok(()) => {
                    tracing::info!(
                        attempt_id = %attempt_id,
                        snapshot_id = %snap.id(),
                        "Configuration restored from snapshot",
                    );
                }
                Err(restore_error) => {
                    rollback_failed = true;
                    tracing::error!(
                        attempt_id = %attempt_id,
                        error = %restore_error,
                        "Configuration rollback failed; the service may be running a partially applied configuration",
                    );
                }
            },
            None if reload_config => {
                tracing::warn!(attempt_id = %attempt_id, "No configuration snapshot to restore");
            }
            None => {}
        }

        self.finalize(
            attempt_id,
            RestartState::Failed,
            Some(error.to_string()),
            rollback_failed,
        );
    }

    /// Move the machine to `to` on behalf of `attempt_id`.
    ///
    /// Returns `false` when the attempt is no longer current (a concurrent
    /// cancel won) or the edge is rejected; the driver stops either way.
    fn advance(&self, attempt_id: Uuid, to: RestartState) -> bool {
        let mut cell = self.cell.lock().unwrap_or_else(PoisonError::into_inner);
        if !matches!(&cell.current, Some(current) if current.id == attempt_id) {
            tracing::debug!(attempt_id = %attempt_id, "Attempt no longer current; stopping driver");
            return false;
        }
        if cell.machine.transition(to).is_err() {
            return false;
        }
        self.history
            .update(attempt_id, |attempt| attempt.record_transition(to));
        self.publish(&cell);
        true
    }

    /// Close the attempt at a terminal state and return the machine to
    /// idle, releasing the draining flag so normal serving resumes.
    fn finalize(
        &self,
        attempt_id: Uuid,
        terminal: RestartState,
        error: Option<String>,
        rollback_failed: bool,
    ) {
        let mut cell = self.cell.lock().unwrap_or_else(PoisonError::into_inner);
        if !matches!(&cell.current, Some(current) if current.id == attempt_id) {
            return;
        }
        if cell.machine.transition(terminal).is_err() {
            return;
        }

        if terminal == RestartState::Completed {
            tracing::info!(attempt_id = %attempt_id, "Restart attempt completed");
        } else {
            tracing::error!(
                attempt_id = %attempt_id,
                error = error.as_deref().unwrap_or("unknown"),
                rollback_failed,
                "Restart attempt failed",
            );
        }

        self.history.update(attempt_id, |attempt| {
            attempt.record_transition(terminal);
            attempt.finished_at = Some(Utc::now());
            attempt.error = error;
            attempt.rollback_failed = rollback_failed;
        });

        // Administrative edge back to idle; not part of the attempt record.
        let _ = cell.machine.transition(RestartState::Idle);
        cell.current = None;
        self.tracker.set_draining(false);
        self.publish(&cell);
    }

    fn publish(&self, cell: &MachineCell) {
        self.status_tx.send_replace(StateSnapshot {
            state: cell.machine.current(),
            attempt_id: cell.current.as_ref().map(|current| current.id),
            started_at: cell.current.as_ref().map(|current| current.started_at),
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
