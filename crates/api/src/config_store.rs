//! Reloadable service configuration backed by a JSON file.
//!
//! This is the configuration a restart actually reloads, as opposed to
//! [`ServerConfig`](crate::config::ServerConfig) which is fixed for the
//! process lifetime. [`FileConfigProvider`] implements the coordinator's
//! [`ConfigProvider`] seam over the file: snapshot the active values,
//! reload from disk, and restore a snapshot (writing it back) on rollback.

use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use ttsd_core::{ConfigProvider, ConfigSnapshot, CoreError};

/// Speech synthesis settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    /// Voice used for narration passages.
    pub narration_voice: String,
    /// Voice used for quoted dialogue.
    pub dialogue_voice: String,
    /// Playback speed multiplier.
    pub default_speed: f64,
    /// Audio cache size limit in bytes.
    pub cache_size_limit: u64,
    /// Audio cache entry lifetime in seconds.
    pub cache_time_limit: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            narration_voice: "zh-CN-YunjianNeural".to_string(),
            dialogue_voice: "zh-CN-XiaoyiNeural".to_string(),
            default_speed: 1.2,
            cache_size_limit: 10_485_760,
            cache_time_limit: 1200,
        }
    }
}

/// Pronunciation dictionary settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DictionaryConfig {
    pub enabled: bool,
    /// Path of the replacement rules file.
    pub rules_file: String,
}

impl Default for DictionaryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rules_file: "dictionary/rules.json".to_string(),
        }
    }
}

/// The full reloadable service configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub tts: TtsConfig,
    pub dictionary: DictionaryConfig,
}

impl ServiceConfig {
    /// Check the configuration for values the service cannot run with.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !self.tts.default_speed.is_finite() || self.tts.default_speed <= 0.0 {
            return Err(CoreError::Validation(
                "TTS speed must be positive".to_string(),
            ));
        }
        if self.tts.cache_size_limit == 0 {
            return Err(CoreError::Validation(
                "Cache size limit must be positive".to_string(),
            ));
        }
        if self.tts.cache_time_limit == 0 {
            return Err(CoreError::Validation(
                "Cache time limit must be positive".to_string(),
            ));
        }
        if self.dictionary.enabled && self.dictionary.rules_file.trim().is_empty() {
            return Err(CoreError::Validation(
                "Dictionary rules file must be set when the dictionary is enabled".to_string(),
            ));
        }
        Ok(())
    }
}

/// [`ConfigProvider`] over a JSON file on disk.
///
/// Holds the active configuration in memory; `reload` swaps it only after
/// the file parses and validates, so a bad edit never takes effect.
pub struct FileConfigProvider {
    path: PathBuf,
    current: RwLock<ServiceConfig>,
}

impl FileConfigProvider {
    /// Open the configuration file, writing the defaults first when it does
    /// not exist yet.
    pub async fn load_or_init(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref().to_path_buf();

        let config = if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            let config = read_config(&path).await?;
            tracing::info!(path = %path.display(), "Loaded service configuration");
            config
        } else {
            let config = ServiceConfig::default();
            write_config(&path, &config).await?;
            tracing::info!(path = %path.display(), "Created default service configuration");
            config
        };

        Ok(Self {
            path,
            current: RwLock::new(config),
        })
    }

    /// The active configuration.
    pub fn current(&self) -> ServiceConfig {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn swap(&self, config: ServiceConfig) {
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = config;
    }
}

#[async_trait]
impl ConfigProvider for FileConfigProvider {
    async fn snapshot(&self) -> Result<ConfigSnapshot, CoreError> {
        let payload = serde_json::to_value(self.current()).map_err(|e| {
            CoreError::Internal(format!("Failed to serialize service configuration: {e}"))
        })?;
        Ok(ConfigSnapshot::new(payload))
    }

    async fn reload(&self) -> Result<(), CoreError> {
        let config = read_config(&self.path).await?;
        self.swap(config);
        tracing::info!(path = %self.path.display(), "Service configuration reloaded");
        Ok(())
    }

    async fn restore(&self, snapshot: &ConfigSnapshot) -> Result<(), CoreError> {
        let config: ServiceConfig =
            serde_json::from_value(snapshot.payload().clone()).map_err(|e| {
                CoreError::Internal(format!("Failed to deserialize config snapshot: {e}"))
            })?;

        // Write the restored values back so a later reload does not
        // resurrect the rejected file contents.
        write_config(&self.path, &config).await?;
        self.swap(config);
        tracing::info!(path = %self.path.display(), "Service configuration restored");
        Ok(())
    }
}

async fn read_config(path: &Path) -> Result<ServiceConfig, CoreError> {
    let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
        CoreError::Internal(format!(
            "Failed to read config file {}: {e}",
            path.display()
        ))
    })?;
    let config: ServiceConfig = serde_json::from_str(&raw).map_err(|e| {
        CoreError::Validation(format!(
            "Invalid config file {}: {e}",
            path.display()
        ))
    })?;
    config.validate()?;
    Ok(config)
}

async fn write_config(path: &Path, config: &ServiceConfig) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                CoreError::Internal(format!(
                    "Failed to create config directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
    }

    let raw = serde_json::to_string_pretty(config).map_err(|e| {
        CoreError::Internal(format!("Failed to serialize service configuration: {e}"))
    })?;
    tokio::fs::write(path, raw).await.map_err(|e| {
        CoreError::Internal(format!(
            "Failed to write config file {}: {e}",
            path.display()
        ))
    })?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
