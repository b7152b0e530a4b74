//! Configuration file loading and parsing.
//!
//! This module handles loading the configuration file from disk and parsing
//! it into validated, type-safe structures.
//!
//! # Configuration File Locations
//!
//! The configuration file is searched in the following order:
//!
//! 1. Path given as the positional CLI argument
//! 2. Default location:
//!    - **Linux/macOS:** `~/.stockmcp/config.json`
//!    - **Windows:** `%USERPROFILE%\.stockmcp\config.json`
//!
//! A missing file at the default location is not an error: the server runs
//! with built-in defaults. A missing file at an explicit path is.

mod error;
mod settings;

pub use error::ConfigError;
pub use settings::{Config, LoggingConfig, ProviderConfig, ServerConfig};

use std::path::{Path, PathBuf};

/// Returns the default configuration directory.
///
/// - **Linux/macOS:** `~/.stockmcp/`
/// - **Windows:** `%USERPROFILE%\.stockmcp\`
#[must_use]
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|p| p.join(".stockmcp"))
}

/// Returns the platform-specific default configuration file path.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|p| p.join("config.json"))
}

/// Loads and parses the configuration file.
///
/// If `path` is `None`, uses the platform-specific default location and falls
/// back to [`Config::default`] when nothing is there.
///
/// # Errors
///
/// Returns an error if:
/// - An explicitly requested configuration file does not exist
/// - The file cannot be read
/// - The JSON is malformed
/// - Required fields are missing or invalid
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ConfigError::Missing {
                    path: p.to_path_buf(),
                });
            }
            p.to_path_buf()
        }
        None => match default_config_path() {
            Some(p) if p.exists() => p,
            _ => return Ok(Config::default()),
        },
    };

    let contents = std::fs::read_to_string(&config_path).map_err(|e| ConfigError::Read {
        path: config_path.clone(),
        source: e,
    })?;

    let config: Config = serde_json::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: config_path.clone(),
        source: e,
    })?;

    config.validate()?;

    Ok(config)
}
