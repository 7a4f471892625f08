//! Configuration loading for the Klangkiste console
//!
//! Resolution follows a fixed priority order per setting:
//! 1. Environment variable (highest priority)
//! 2. TOML config file
//! 3. Compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming the config file location
pub const CONFIG_FILE_ENV: &str = "KLANGKISTE_CONFIG";
/// Environment override for the registry base URL
pub const REGISTRY_URL_ENV: &str = "KLANGKISTE_REGISTRY_URL";
/// Environment override for the session database path
pub const SESSION_DB_ENV: &str = "KLANGKISTE_SESSION_DB";

const DEFAULT_REGISTRY_URL: &str = "http://127.0.0.1:5870";
const DEFAULT_SESSION_DB: &str = "klangkiste-sessions.db";
const DEFAULT_STATUS_POLL_MS: u64 = 2_000;
const DEFAULT_BOX_POLL_MS: u64 = 5_000;
const DEFAULT_STORAGE_POLL_MS: u64 = 10_000;

/// Raw TOML config file shape; every field optional
#[derive(Debug, Default, Deserialize)]
struct TomlConfig {
    registry_url: Option<String>,
    session_db: Option<String>,
    status_poll_ms: Option<u64>,
    box_poll_ms: Option<u64>,
    storage_poll_ms: Option<u64>,
}

/// Resolved console configuration
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// Base URL of the tag/box registry backend
    pub registry_url: String,
    /// Path of the SQLite file backing wizard session recovery
    pub session_db: PathBuf,
    /// Interval between box status (scan feed) polls
    pub status_poll_interval: Duration,
    /// Interval between box tag-list polls
    pub box_poll_interval: Duration,
    /// Interval between box local-storage polls
    pub storage_poll_interval: Duration,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            session_db: PathBuf::from(DEFAULT_SESSION_DB),
            status_poll_interval: Duration::from_millis(DEFAULT_STATUS_POLL_MS),
            box_poll_interval: Duration::from_millis(DEFAULT_BOX_POLL_MS),
            storage_poll_interval: Duration::from_millis(DEFAULT_STORAGE_POLL_MS),
        }
    }
}

impl ConsoleConfig {
    /// Load configuration with ENV → TOML → default resolution.
    ///
    /// The TOML file location comes from `KLANGKISTE_CONFIG`; a missing file
    /// is not an error, a present but unparseable file is.
    pub fn load() -> Result<Self> {
        let toml_config = match std::env::var(CONFIG_FILE_ENV) {
            Ok(path) => Self::read_toml(Path::new(&path))?,
            Err(_) => TomlConfig::default(),
        };
        Ok(Self::resolve(toml_config))
    }

    /// Load configuration from an explicit TOML file plus ENV overrides
    pub fn load_from(path: &Path) -> Result<Self> {
        Ok(Self::resolve(Self::read_toml(path)?))
    }

    fn read_toml(path: &Path) -> Result<TomlConfig> {
        if !path.exists() {
            warn!(path = %path.display(), "config file not found, using defaults");
            return Ok(TomlConfig::default());
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    fn resolve(toml_config: TomlConfig) -> Self {
        let defaults = Self::default();

        let registry_url = std::env::var(REGISTRY_URL_ENV)
            .ok()
            .or(toml_config.registry_url)
            .unwrap_or(defaults.registry_url);

        let session_db = std::env::var(SESSION_DB_ENV)
            .ok()
            .map(PathBuf::from)
            .or(toml_config.session_db.map(PathBuf::from))
            .unwrap_or(defaults.session_db);

        let status_poll_interval = toml_config
            .status_poll_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.status_poll_interval);
        let box_poll_interval = toml_config
            .box_poll_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.box_poll_interval);
        let storage_poll_interval = toml_config
            .storage_poll_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.storage_poll_interval);

        let config = Self {
            registry_url,
            session_db,
            status_poll_interval,
            box_poll_interval,
            storage_poll_interval,
        };
        info!(
            registry_url = %config.registry_url,
            session_db = %config.session_db.display(),
            "console configuration resolved"
        );
        config
    }
}
