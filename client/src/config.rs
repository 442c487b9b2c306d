use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

const APP_DIR: &str = "clipswap";
const MIN_POLL_MS: u64 = 100;
const MAX_POLL_MS: u64 = 5000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no configuration directory available on this system")]
    NoConfigDir,
    #[error("cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Settings read from `config.toml`; hotkey bindings live in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub poll_interval_ms: u64,
    pub history_capacity: usize,
    pub database_path: Option<PathBuf>,
    pub log_level: String,
    pub show_tray: bool,
    #[serde(skip)]
    first_run: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            history_capacity: clipswap_core::DEFAULT_CAPACITY,
            database_path: None,
            log_level: "info".to_string(),
            show_tray: true,
            first_run: false,
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    Some(dirs::config_dir()?.join(APP_DIR).join("config.toml"))
}

impl Config {
    /// Load from the platform config dir; defaults when missing or broken.
    pub fn load() -> Self {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => {
                warn!("No configuration directory, using defaults");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Self {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Self {
                    first_run: true,
                    ..Self::default()
                };
            }
            Err(e) => {
                warn!("Cannot read {}: {}, using defaults", path.display(), e);
                return Self::default();
            }
        };
        match toml::from_str(&text) {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring malformed {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn is_first_run(&self) -> bool {
        self.first_run
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let path = config_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io)?;
        }
        let text = toml::to_string_pretty(self)?;
        fs::write(path, text).map_err(io)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.clamp(MIN_POLL_MS, MAX_POLL_MS))
    }

    pub fn database_path(&self) -> PathBuf {
        self.database_path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR)
                .join("clipboard_history.db")
        })
    }
}
