//! Graceful restart coordination for the ttsd service.
//!
//! Building blocks for restarting a long-running service in place without
//! dropping the work it is doing:
//!
//! - [`RequestTracker`]: lock-free count of in-flight requests, waited on
//!   while draining.
//! - [`CallbackRegistry`]: named pre- and post-restart checkpoints.
//! - [`StateMachine`]: the restart lifecycle and its legal transitions.
//! - [`RestartCoordinator`]: orchestrates attempts end to end (drain,
//!   configuration reload, callbacks, rollback).
//! - [`RestartHistory`]: bounded audit trail of past attempts.
//! - [`ConfigProvider`]: seam to the host's reloadable configuration.

pub mod callbacks;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod history;
pub mod state;
pub mod tracker;

pub use callbacks::{CallbackRegistry, FnHook, HookFailure, HookPhase, RestartHook};
pub use config::{ConfigProvider, ConfigSnapshot, NullConfigProvider};
pub use coordinator::{
    RestartCoordinator, RestartCoordinatorBuilder, RestartRequest, RestartStatus, StateSnapshot,
    DEFAULT_DRAIN_TIMEOUT,
};
pub use error::CoreError;
pub use history::{RestartAttempt, RestartHistory, TransitionRecord, DEFAULT_HISTORY_CAPACITY};
pub use state::{RestartState, StateMachine};
pub use tracker::{RequestTracker, RequestToken};
