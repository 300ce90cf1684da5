//! # Bodega Configuration
//!
//! Settings for the local database, the sync coordinator and the remote
//! store.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     BODEGA_DB_PATH, BODEGA_SYNC_MODE, BODEGA_REMOTE_URL,               │
//! │     BODEGA_OWNER_ID, BODEGA_SYNC_CONCURRENCY,                          │
//! │     BODEGA_SWEEP_INTERVAL_SECS                                         │
//! │                                                                         │
//! │  2. TOML Config File (--config, or the platform default)               │
//! │     ~/.config/bodega/bodega.toml (Linux)                               │
//! │     ~/Library/Application Support/com.bodega.bodega/bodega.toml        │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     SyncMode::Auto, no remote, no owner                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "/var/lib/bodega/bodega.db"
//!
//! [sync]
//! mode = "auto"            # auto | offline
//! batch_size = 100
//! max_concurrency = 4
//! sweep_interval_secs = 60
//!
//! [remote]
//! url = "https://sync.example.com/api"
//! request_timeout_ms = 10000
//!
//! [owner]
//! id = "owner-123"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::coordinator::CoordinatorConfig;
use crate::error::{SyncError, SyncResult};

// =============================================================================
// Sync Mode
// =============================================================================

/// Whether local writes are replicated at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Push on every local change and on the sweep interval.
    #[default]
    Auto,

    /// Local operations only. Records accumulate as pending.
    Offline,
}

impl SyncMode {
    pub fn is_sync_enabled(&self) -> bool {
        !matches!(self, SyncMode::Offline)
    }
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncMode::Auto => write!(f, "auto"),
            SyncMode::Offline => write!(f, "offline"),
        }
    }
}

impl std::str::FromStr for SyncMode {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" | "online" => Ok(SyncMode::Auto),
            "offline" | "disabled" => Ok(SyncMode::Offline),
            other => Err(SyncError::InvalidConfig(format!(
                "Unknown sync mode: '{}'. Valid options: auto, offline",
                other
            ))),
        }
    }
}

// =============================================================================
// Sections
// =============================================================================

/// `[database]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Defaults to the platform data directory.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> PathBuf {
    directories::ProjectDirs::from("com", "bodega", "bodega")
        .map(|dirs| dirs.data_dir().join("bodega.db"))
        .unwrap_or_else(|| PathBuf::from("bodega.db"))
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// `[sync]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    #[serde(default)]
    pub mode: SyncMode,

    /// Pending records loaded per sweep page.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pushes in flight at once.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Capacity of the coordinator's command queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Base interval between periodic sweeps (seconds).
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Ceiling for the sweep interval while sweeps keep failing (seconds).
    #[serde(default = "default_max_sweep_backoff")]
    pub max_sweep_backoff_secs: u64,
}

fn default_batch_size() -> usize {
    100
}
fn default_max_concurrency() -> usize {
    4
}
fn default_queue_capacity() -> usize {
    256
}
fn default_sweep_interval() -> u64 {
    60
}
fn default_max_sweep_backoff() -> u64 {
    900
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            mode: SyncMode::default(),
            batch_size: default_batch_size(),
            max_concurrency: default_max_concurrency(),
            queue_capacity: default_queue_capacity(),
            sweep_interval_secs: default_sweep_interval(),
            max_sweep_backoff_secs: default_max_sweep_backoff(),
        }
    }
}

/// `[remote]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// Base URL of the document store. Without one nothing is pushed.
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

fn default_request_timeout() -> u64 {
    10_000
}

impl Default for RemoteSettings {
    fn default() -> Self {
        RemoteSettings {
            url: None,
            request_timeout_ms: default_request_timeout(),
        }
    }
}

/// `[owner]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OwnerSettings {
    /// Account the remote documents belong to.
    #[serde(default)]
    pub id: Option<String>,
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete Bodega configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BodegaConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub sync: SyncSettings,

    #[serde(default)]
    pub remote: RemoteSettings,

    #[serde(default)]
    pub owner: OwnerSettings,
}

impl BodegaConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns defaults if loading fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Writes the configuration as TOML.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if let Some(ref raw) = self.remote.url {
            let url = Url::parse(raw)?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(SyncError::InvalidUrl(format!(
                    "Remote URL must start with http:// or https://, got: {}",
                    raw
                )));
            }
        }

        if self.sync.batch_size == 0 {
            return Err(SyncError::InvalidConfig(
                "batch_size must be greater than 0".into(),
            ));
        }

        if self.sync.max_concurrency == 0 {
            return Err(SyncError::InvalidConfig(
                "max_concurrency must be greater than 0".into(),
            ));
        }

        if self.sync.queue_capacity == 0 {
            return Err(SyncError::InvalidConfig(
                "queue_capacity must be greater than 0".into(),
            ));
        }

        if self.sync.sweep_interval_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "sweep_interval_secs must be greater than 0".into(),
            ));
        }

        if self.owner.id.as_deref().is_some_and(|id| id.trim().is_empty()) {
            return Err(SyncError::InvalidConfig("owner id must not be blank".into()));
        }

        Ok(())
    }

    /// Applies overrides from `lookup` (the process environment in
    /// [`load`](Self::load)).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("BODEGA_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(mode) = lookup("BODEGA_SYNC_MODE") {
            match mode.parse() {
                Ok(parsed) => {
                    debug!(mode = %mode, "Overriding sync mode from environment");
                    self.sync.mode = parsed;
                }
                Err(_) => warn!(mode = %mode, "Unknown sync mode in environment"),
            }
        }

        if let Some(url) = lookup("BODEGA_REMOTE_URL") {
            debug!(url = %url, "Overriding remote URL from environment");
            self.remote.url = Some(url);
        }

        if let Some(owner) = lookup("BODEGA_OWNER_ID") {
            self.owner.id = Some(owner);
        }

        if let Some(concurrency) = lookup("BODEGA_SYNC_CONCURRENCY") {
            if let Ok(n) = concurrency.parse::<usize>() {
                self.sync.max_concurrency = n;
            }
        }

        if let Some(interval) = lookup("BODEGA_SWEEP_INTERVAL_SECS") {
            if let Ok(secs) = interval.parse::<u64>() {
                self.sync.sweep_interval_secs = secs;
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "bodega", "bodega")
            .map(|dirs| dirs.config_dir().join("bodega.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn is_sync_enabled(&self) -> bool {
        self.sync.mode.is_sync_enabled()
    }

    pub fn remote_url(&self) -> Option<&str> {
        self.remote.url.as_deref()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.remote.request_timeout_ms)
    }

    /// Coordinator settings derived from `[sync]` and `[remote]`.
    pub fn coordinator(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            batch_size: self.sync.batch_size as i64,
            max_concurrency: self.sync.max_concurrency,
            queue_capacity: self.sync.queue_capacity,
            sweep_interval: Duration::from_secs(self.sync.sweep_interval_secs),
            max_sweep_interval: Duration::from_secs(
                self.sync
                    .max_sweep_backoff_secs
                    .max(self.sync.sweep_interval_secs),
            ),
            request_timeout: self.request_timeout(),
            persist_outcomes: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_sync_mode_parsing() {
        assert_eq!("auto".parse::<SyncMode>().unwrap(), SyncMode::Auto);
        assert_eq!("OFFLINE".parse::<SyncMode>().unwrap(), SyncMode::Offline);
        assert!("primary".parse::<SyncMode>().is_err());
        assert_eq!(SyncMode::Offline.to_string(), "offline");
    }

    #[test]
    fn test_default_config() {
        let config = BodegaConfig::default();
        assert_eq!(config.sync.mode, SyncMode::Auto);
        assert_eq!(config.sync.batch_size, 100);
        assert!(config.remote_url().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = BodegaConfig::default();

        config.remote.url = Some("ws://example.com".to_string());
        assert!(matches!(config.validate(), Err(SyncError::InvalidUrl(_))));

        config.remote.url = Some("not a url".to_string());
        assert!(config.validate().unwrap_err().is_config_error());

        config.remote.url = Some("https://sync.example.com/api".to_string());
        assert!(config.validate().is_ok());

        config.sync.max_concurrency = 0;
        assert!(matches!(config.validate(), Err(SyncError::InvalidConfig(_))));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("BODEGA_SYNC_MODE", "offline"),
            ("BODEGA_OWNER_ID", "owner-9"),
            ("BODEGA_SYNC_CONCURRENCY", "8"),
            ("BODEGA_SWEEP_INTERVAL_SECS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = BodegaConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.sync.mode, SyncMode::Offline);
        assert_eq!(config.owner.id.as_deref(), Some("owner-9"));
        assert_eq!(config.sync.max_concurrency, 8);
        assert_eq!(config.sync.sweep_interval_secs, 60);
    }

    #[test]
    fn test_toml_sections() {
        let parsed: BodegaConfig = toml::from_str(
            r#"
            [sync]
            mode = "offline"
            batch_size = 10

            [remote]
            url = "http://localhost:8080"
            "#,
        )
        .unwrap();
        assert_eq!(parsed.sync.mode, SyncMode::Offline);
        assert_eq!(parsed.sync.batch_size, 10);
        assert_eq!(parsed.sync.max_concurrency, 4);
        assert_eq!(parsed.remote.request_timeout_ms, 10_000);

        let written = toml::to_string_pretty(&parsed).unwrap();
        assert!(written.contains("[database]"));
        assert!(written.contains("[remote]"));
    }

    #[test]
    fn test_coordinator_settings() {
        let mut config = BodegaConfig::default();
        config.sync.sweep_interval_secs = 30;
        config.sync.max_sweep_backoff_secs = 10;

        let coordinator = config.coordinator();
        assert_eq!(coordinator.sweep_interval, Duration::from_secs(30));
        assert_eq!(coordinator.max_sweep_interval, Duration::from_secs(30));
        assert_eq!(coordinator.request_timeout, Duration::from_millis(10_000));
    }
}
