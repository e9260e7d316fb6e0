//! Restart lifecycle states and the transition table that governs them.
//!
//! The [`StateMachine`] is the single authority on what phase the restart
//! subsystem is in. Every phase change goes through [`StateMachine::transition`],
//! which rejects any edge not in the table, so callers can trust that the
//! observable state sequence is always a legal walk of the lifecycle.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Lifecycle state of the restart subsystem.
///
/// Serializes to the snake_case strings exposed by the admin API
/// (`"waiting_requests"`, `"idle"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartState {
    /// No restart in progress; normal request serving.
    Idle,
    /// Attempt accepted; pre-restart callbacks running.
    Preparing,
    /// Draining: waiting for in-flight requests to finish.
    WaitingRequests,
    /// Reconfiguration underway (config reload, post-restart callbacks).
    Restarting,
    /// A failure occurred; rolling back to the config snapshot.
    Recovering,
    /// Attempt finished successfully.
    Completed,
    /// Attempt finished unsuccessfully.
    Failed,
}

impl RestartState {
    /// Stable string form, identical to the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Preparing => "preparing",
            Self::WaitingRequests => "waiting_requests",
            Self::Restarting => "restarting",
            Self::Recovering => "recovering",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Whether a restart attempt is in flight. Anything other than `Idle`
    /// means new restart requests are rejected and the host should shed
    /// incoming work.
    pub fn is_restart_in_progress(&self) -> bool {
        !matches!(self, Self::Idle)
    }

    /// Whether this state ends an attempt.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for RestartState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Legal lifecycle edges.
///
/// `Preparing -> Idle` is the cancellation edge; `Completed -> Idle` and
/// `Failed -> Idle` return the machine to normal serving after an attempt
/// so a later request starts from a clean slate.
fn is_legal_transition(from: RestartState, to: RestartState) -> bool {
    use RestartState::*;

    matches!(
        (from, to),
        (Idle, Preparing)
            | (Preparing, WaitingRequests)
            | (Preparing, Failed)
            | (Preparing, Idle)
            | (WaitingRequests, Restarting)
            | (WaitingRequests, Failed)
            | (Restarting, Completed)
            | (Restarting, Recovering)
            | (Recovering, Failed)
            | (Completed, Idle)
            | (Failed, Idle)
    )
}

/// Holder of the current [`RestartState`].
///
/// Not internally synchronized. The coordinator wraps it in a mutex and is
/// the only writer; everything else observes state through the coordinator's
/// published snapshots.
#[derive(Debug)]
pub struct StateMachine {
    current: RestartState,
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            current: RestartState::Idle,
        }
    }

    pub fn current(&self) -> RestartState {
        self.current
    }

    /// Move the machine to `to`.
    ///
    /// Fails with [`CoreError::InvalidTransition`] when the edge is not in
    /// the lifecycle table; the current state is left unchanged in that case.
    pub fn transition(&mut self, to: RestartState) -> Result<(), CoreError> {
        if !is_legal_transition(self.current, to) {
            tracing::error!(
                from = %self.current,
                to = %to,
                "Rejected illegal restart state transition",
            );
            return Err(CoreError::InvalidTransition {
                from: self.current,
                to,
            });
        }

        tracing::debug!(from = %self.current, to = %to, "Restart state transition");
        self.current = to;
        Ok(())
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn walk(machine: &mut StateMachine, states: &[RestartState]) {
        for state in states {
            machine
                .transition(*state)
                .unwrap_or_else(|e| panic!("expected legal transition: {e}"));
        }
    }

    // -- transition -----------------------------------------------------------

    #[test]
    fn successful_attempt_walks_the_full_lifecycle() {
        use RestartState::*;

        let mut machine = StateMachine::new();
        assert_eq!(machine.current(), Idle);

        walk(
            &mut machine,
            &[Preparing, WaitingRequests, Restarting, Completed, Idle],
        );
        assert_eq!(machine.current(), Idle);
    }

    #[test]
    fn failed_attempt_recovers_then_returns_to_idle() {
        use RestartState::*;

        let mut machine = StateMachine::new();
        walk(
            &mut machine,
            &[Preparing, WaitingRequests, Restarting, Recovering, Failed, Idle],
        );
        assert_eq!(machine.current(), Idle);
    }

    #[test]
    fn cancellation_returns_from_preparing_to_idle() {
        use RestartState::*;

        let mut machine = StateMachine::new();
        walk(&mut machine, &[Preparing, Idle]);
        assert_eq!(machine.current(), Idle);
    }

    #[test]
    fn illegal_transition_is_rejected_and_state_unchanged() {
        use RestartState::*;

        let mut machine = StateMachine::new();
        let err = machine.transition(Restarting).unwrap_err();
        assert_matches!(
            err,
            CoreError::InvalidTransition {
                from: Idle,
                to: Restarting,
            }
        );
        assert_eq!(machine.current(), Idle);
    }

    #[test]
    fn cannot_skip_the_drain_phase() {
        use RestartState::*;

        let mut machine = StateMachine::new();
        walk(&mut machine, &[Preparing]);
        assert_matches!(
            machine.transition(Restarting),
            Err(CoreError::InvalidTransition { .. })
        );
        assert_eq!(machine.current(), Preparing);
    }

    #[test]
    fn recovering_only_leads_to_failed() {
        use RestartState::*;

        let mut machine = StateMachine::new();
        walk(&mut machine, &[Preparing, WaitingRequests, Restarting, Recovering]);

        assert_matches!(
            machine.transition(Completed),
            Err(CoreError::InvalidTransition { .. })
        );
        assert_matches!(
            machine.transition(Idle),
            Err(CoreError::InvalidTransition { .. })
        );
        walk(&mut machine, &[Failed, Idle]);
    }

    // -- as_str / serde -------------------------------------------------------

    #[test]
    fn state_strings_match_serde_representation() {
        let states = [
            RestartState::Idle,
            RestartState::Preparing,
            RestartState::WaitingRequests,
            RestartState::Restarting,
            RestartState::Recovering,
            RestartState::Completed,
            RestartState::Failed,
        ];
        for state in states {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{}\"", state.as_str()));
        }
    }

    #[test]
    fn only_idle_means_no_restart_in_progress() {
        assert!(!RestartState::Idle.is_restart_in_progress());
        assert!(RestartState::Preparing.is_restart_in_progress());
        assert!(RestartState::WaitingRequests.is_restart_in_progress());
        assert!(RestartState::Failed.is_restart_in_progress());
    }
}
