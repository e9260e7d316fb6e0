//! Bounded, append-only record of restart attempts.
//!
//! Attempts are appended when they start and updated in place until they
//! finish; once `finished_at` is set the coordinator never touches the
//! record again. The buffer keeps the most recent attempts and silently
//! evicts the oldest when full.

use std::collections::VecDeque;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::state::RestartState;

/// Number of attempts retained unless the host configures otherwise.
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// One observed state transition within an attempt.
#[derive(Debug, Clone, Serialize)]
pub struct TransitionRecord {
    pub state: RestartState,
    pub at: DateTime<Utc>,
}

/// Audit record of one restart attempt.
#[derive(Debug, Clone, Serialize)]
pub struct RestartAttempt {
    pub id: Uuid,
    pub requested_by: String,
    pub reason: String,
    pub force: bool,
    pub reload_config: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Latest state while the attempt is live; terminal state once finished.
    pub final_state: RestartState,
    /// Whether the drain wait saw the request count reach zero. `None`
    /// when the wait was skipped (`force`) or never reached.
    pub drained: Option<bool>,
    pub error: Option<String>,
    /// Set when restoring the configuration snapshot itself failed. The
    /// service may then be running a half-applied configuration.
    pub rollback_failed: bool,
    /// User who cancelled the attempt, when it ended by cancellation.
    pub cancelled_by: Option<String>,
    /// Snapshot taken for this attempt, when configuration reload was on.
    pub config_snapshot_id: Option<Uuid>,
    pub transitions: Vec<TransitionRecord>,
}

impl RestartAttempt {
    pub(crate) fn new(
        id: Uuid,
        requested_by: &str,
        reason: &str,
        force: bool,
        reload_config: bool,
    ) -> Self {
        Self {
            id,
            requested_by: requested_by.to_string(),
            reason: reason.to_string(),
            force,
            reload_config,
            started_at: Utc::now(),
            finished_at: None,
            final_state: RestartState::Idle,
            drained: None,
            error: None,
            rollback_failed: false,
            cancelled_by: None,
            config_snapshot_id: None,
            transitions: Vec::new(),
        }
    }

    pub(crate) fn record_transition(&mut self, state: RestartState) {
        self.final_state = state;
        self.transitions.push(TransitionRecord {
            state,
            at: Utc::now(),
        });
    }

    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }
}

/// Ring buffer of past restart attempts.
///
/// The coordinator is the only writer. Readers receive clones, so holding
/// onto a returned attempt never blocks an attempt in progress.
pub struct RestartHistory {
    entries: RwLock<VecDeque<RestartAttempt>>,
    capacity: usize,
}

impl RestartHistory {
    /// A zero capacity would make every attempt unrecordable; it is bumped
    /// to one.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a freshly started attempt, evicting the oldest entry when the
    /// buffer is full.
    pub(crate) fn open(&self, attempt: RestartAttempt) {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(attempt);
    }

    /// Mutate the attempt with the given id, if it is still retained.
    pub(crate) fn update(&self, id: Uuid, f: impl FnOnce(&mut RestartAttempt)) {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        // The live attempt is almost always the newest entry.
        if let Some(attempt) = entries.iter_mut().rev().find(|a| a.id == id) {
            f(attempt);
        }
    }

    /// The most recent attempts, newest first.
    pub fn recent(&self, limit: usize) -> Vec<RestartAttempt> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
