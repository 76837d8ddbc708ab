//! Application configuration management.
//!
//! This module handles loading the application configuration, which
//! holds the backend URL and the storage backend used for the session.
//!
//! Configuration is stored at `~/.config/projectdeck/config.json`.
//! `PROJECTDECK_API_URL` and `PROJECTDECK_STORAGE` override the file.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::storage::{FileStore, KeyValueStore, KeyringStore, MemoryStore};

/// Application name used for config/data/cache directory paths
const APP_NAME: &str = "projectdeck";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Backend assumed when nothing is configured
pub const DEFAULT_API_URL: &str = "http://localhost:3001";

const API_URL_ENV: &str = "PROJECTDECK_API_URL";
const STORAGE_ENV: &str = "PROJECTDECK_STORAGE";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not find {0} directory")]
    MissingDir(&'static str),

    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unknown storage backend '{0}' (expected file, keyring or memory)")]
    InvalidStorage(String),
}

/// Where the session token is persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Keyring,
    /// Nothing persists; every run starts logged out.
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "file" => Ok(StorageBackend::File),
            "keyring" | "keychain" => Ok(StorageBackend::Keyring),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(ConfigError::InvalidStorage(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub storage: StorageBackend,
    /// Overrides the platform data directory for the file backend
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            storage: StorageBackend::default(),
            data_dir: None,
        }
    }
}

impl Config {
    /// Load the user config file, then apply environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(
            std::env::var(API_URL_ENV).ok(),
            std::env::var(STORAGE_ENV).ok(),
        )?;
        debug!(api_url = %config.api_url, storage = ?config.storage, "Config loaded");
        Ok(config)
    }

    /// Load from a specific file; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    fn apply_overrides(
        &mut self,
        api_url: Option<String>,
        storage: Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
            self.api_url = url;
        }
        if let Some(storage) = storage.filter(|s| !s.trim().is_empty()) {
            self.storage = storage.parse()?;
        }
        Ok(())
    }

    fn config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::MissingDir("config"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn data_dir(&self) -> Result<PathBuf, ConfigError> {
        if let Some(ref dir) = self.data_dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_dir().ok_or(ConfigError::MissingDir("data"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// Directory for log files
    pub fn cache_dir(&self) -> Result<PathBuf, ConfigError> {
        let cache_dir = dirs::cache_dir().ok_or(ConfigError::MissingDir("cache"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Build the configured storage backend
    pub fn open_store(&self) -> Result<Arc<dyn KeyValueStore>, ConfigError> {
        let store: Arc<dyn KeyValueStore> = match self.storage {
            StorageBackend::File => Arc::new(FileStore::in_dir(&self.data_dir()?)),
            StorageBackend::Keyring => Arc::new(KeyringStore::default()),
            StorageBackend::Memory => Arc::new(MemoryStore::new()),
        };
        Ok(store)
    }
}
