//! Configuration provider seam used during a restart.
//!
//! The coordinator does not understand the host's configuration; it only
//! needs three operations around the restart boundary: capture a snapshot,
//! apply the new configuration, and put a snapshot back on failure. Hosts
//! implement [`ConfigProvider`] over whatever store they use.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::CoreError;

/// An opaque serialized copy of the host's configuration.
///
/// The coordinator holds at most one snapshot per attempt and hands it back
/// verbatim on rollback; only the provider that produced it interprets the
/// payload.
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    id: Uuid,
    taken_at: DateTime<Utc>,
    payload: serde_json::Value,
}

impl ConfigSnapshot {
    pub fn new(payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            taken_at: Utc::now(),
            payload,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    /// The serialized configuration, exactly as the provider produced it.
    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }
}

/// The collaborator that owns the reloadable service configuration.
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    /// Capture the active configuration for potential rollback.
    async fn snapshot(&self) -> Result<ConfigSnapshot, CoreError>;

    /// Re-read the backing store, validate, and swap the new configuration
    /// in. On error the active configuration must be left untouched.
    async fn reload(&self) -> Result<(), CoreError>;

    /// Put a previously captured snapshot back into effect.
    async fn restore(&self, snapshot: &ConfigSnapshot) -> Result<(), CoreError>;
}

/// Provider for hosts with nothing to reload.
///
/// Snapshots an empty object; reload and restore succeed without effect.
#[derive(Debug, Default)]
pub struct NullConfigProvider;

#[async_trait]
impl ConfigProvider for NullConfigProvider {
    async fn snapshot(&self) -> Result<ConfigSnapshot, CoreError> {
        Ok(ConfigSnapshot::new(serde_json::Value::Object(
            serde_json::Map::new(),
        )))
    }

    async fn reload(&self) -> Result<(), CoreError> {
        Ok(())
    }

    async fn restore(&self, _snapshot: &ConfigSnapshot) -> Result<(), CoreError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
