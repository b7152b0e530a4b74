//! Configuration loading errors.

use std::path::PathBuf;

use thiserror::Error;

/// Why a configuration could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly named configuration file does not exist.
    #[error("no configuration file at {}", path.display())]
    Missing {
        /// Path given on the command line.
        path: PathBuf,
    },

    /// The file exists but could not be read.
    #[error("cannot read configuration from {}", path.display())]
    Read {
        /// Path to the configuration file.
        path: PathBuf,
        /// IO failure.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON or has unknown keys.
    #[error("{} is not a valid stockmcp configuration", path.display())]
    Parse {
        /// Path to the configuration file.
        path: PathBuf,
        /// Parser failure.
        #[source]
        source: serde_json::Error,
    },

    /// A setting has an unusable value.
    #[error("invalid value for '{key}': {reason}")]
    Invalid {
        /// Dotted key of the offending setting, e.g. `server.port`.
        key: &'static str,
        /// What's wrong with it.
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}
