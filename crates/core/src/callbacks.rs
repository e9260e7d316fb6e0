//! Pre- and post-restart callbacks.
//!
//! Collaborators (caches, dictionary reloaders, config consumers) register
//! named hooks that the coordinator runs as checkpoints around a restart.
//! Hooks run in registration order and are not best-effort: the first
//! failure stops the phase, and the coordinator aborts or rolls back the
//! attempt accordingly.

use std::fmt;

use async_trait::async_trait;

use crate::error::CoreError;

/// Which side of the restart a hook runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    /// Before draining starts; typically flushing state to disk.
    Pre,
    /// After reconfiguration; typically re-priming caches.
    Post,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pre => "pre-restart",
            Self::Post => "post-restart",
        })
    }
}

/// A named restart checkpoint.
///
/// Hooks must not request a restart themselves: the coordinator is non-idle
/// while they run, so such a call fails with a conflict.
#[async_trait]
pub trait RestartHook: Send + Sync {
    /// Name used in logs and attempt records.
    fn name(&self) -> &str;

    async fn run(&self) -> Result<(), CoreError>;
}

/// Adapter turning a synchronous closure into a [`RestartHook`].
pub struct FnHook {
    name: String,
    f: Box<dyn Fn() -> Result<(), CoreError> + Send + Sync>,
}

impl FnHook {
    pub fn new(
        name: impl Into<String>,
        f: impl Fn() -> Result<(), CoreError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            f: Box::new(f),
        }
    }
}

#[async_trait]
impl RestartHook for FnHook {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self) -> Result<(), CoreError> {
        (self.f)()
    }
}

/// A hook failure, carrying enough context for the attempt record.
#[derive(Debug, thiserror::Error)]
#[error("{phase} hook '{name}' failed: {source}")]
pub struct HookFailure {
    pub phase: HookPhase,
    pub name: String,
    pub source: CoreError,
}

impl From<HookFailure> for CoreError {
    fn from(failure: HookFailure) -> Self {
        CoreError::Internal(failure.to_string())
    }
}

/// Ordered pre- and post-restart hook lists.
///
/// Registration order is invocation order. The registry is assembled at
/// startup and handed to the coordinator; it is not mutated afterwards.
#[derive(Default)]
pub struct CallbackRegistry {
    pre: Vec<Box<dyn RestartHook>>,
    post: Vec<Box<dyn RestartHook>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_pre(&mut self, hook: impl RestartHook + 'static) {
        self.pre.push(Box::new(hook));
    }

    pub fn register_post(&mut self, hook: impl RestartHook + 'static) {
        self.post.push(Box::new(hook));
    }

    pub fn pre_count(&self) -> usize {
        self.pre.len()
    }

    pub fn post_count(&self) -> usize {
        self.post.len()
    }

    /// Run all pre-restart hooks, stopping at the first failure.
    pub async fn run_pre(&self) -> Result<(), HookFailure> {
        run_phase(HookPhase::Pre, &self.pre).await
    }

    /// Run all post-restart hooks, stopping at the first failure.
    pub async fn run_post(&self) -> Result<(), HookFailure> {
        run_phase(HookPhase::Post, &self.post).await
    }
}

async fn run_phase(phase: HookPhase, hooks: &[Box<dyn RestartHook>]) -> Result<(), HookFailure> {
    for hook in hooks {
        tracing::debug!(phase = %phase, hook = hook.name(), "Running restart hook");
        if let Err(source) = hook.run().await {
            tracing::error!(
                phase = %phase,
                hook = hook.name(),
                error = %source,
                "Restart hook failed",
            );
            return Err(HookFailure {
                phase,
                name: hook.name().to_string(),
                source,
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
