//! Application configuration.
//!
//! Settings are read from `~/.worktimer/config.json`. Every field has a
//! default, so a missing file or a partial file is fine.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::SLOT_KEY;

/// Directory under the home directory holding config and state.
pub const APP_DIR: &str = ".worktimer";

/// Config file name inside [`APP_DIR`].
pub const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding the state file path.
pub const STATE_FILE_ENV: &str = "WORKTIMER_STATE_FILE";

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_tick_seconds() -> u64 {
    1
}

/// Errors that can occur while loading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The home directory could not be determined.
    #[error("could not determine the home directory")]
    NoHomeDirectory,

    /// The config file exists but could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON for [`AppConfig`].
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Work timer configuration.
///
/// # Example
///
/// ```
/// use worktimer::config::AppConfig;
///
/// let config = AppConfig::default();
/// assert_eq!(config.tick_seconds, 1);
/// assert!(config.state_file.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    /// Shared state file; defaults to `~/.worktimer/workbench-timer.json`.
    #[serde(default)]
    pub state_file: Option<PathBuf>,

    /// Base URL of the workbench the create-hours form lives on.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Live display refresh period of the watch view (1-60).
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            state_file: None,
            base_url: default_base_url(),
            tick_seconds: default_tick_seconds(),
        }
    }
}

impl AppConfig {
    /// Loads the config from the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory is unknown, or the file
    /// exists but is unreadable or invalid.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&app_dir()?.join(CONFIG_FILE))
    }

    /// Loads the config from a file. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is unreadable or invalid.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = ?path, "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let config: Self =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;

        tracing::debug!(path = ?path, "Loaded config");
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first out-of-range value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=60).contains(&self.tick_seconds) {
            return Err(ConfigError::Invalid(format!(
                "tick_seconds must be between 1 and 60, got {}",
                self.tick_seconds
            )));
        }
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("base_url must not be empty".to_string()));
        }
        Ok(())
    }

    /// Resolves the state file path.
    ///
    /// Precedence: `flag`, then `$WORKTIMER_STATE_FILE`, then the config file,
    /// then `~/.worktimer/workbench-timer.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if the default is needed and the home directory is unknown.
    pub fn resolve_state_file(&self, flag: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
        self.resolve_state_file_with(flag, std::env::var_os(STATE_FILE_ENV).map(PathBuf::from))
    }

    fn resolve_state_file_with(
        &self,
        flag: Option<PathBuf>,
        env: Option<PathBuf>,
    ) -> Result<PathBuf, ConfigError> {
        if let Some(path) = flag.or(env).or_else(|| self.state_file.clone()) {
            return Ok(path);
        }
        Ok(app_dir()?.join(format!("{}.json", SLOT_KEY)))
    }
}

/// Returns `~/.worktimer`.
///
/// # Errors
///
/// Returns an error if the home directory is unknown.
pub fn app_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|home| home.join(APP_DIR))
        .ok_or(ConfigError::NoHomeDirectory)
}
