//! Configuration error types
//!
//! Error codes:
//! - DYN_CONFIG_IO_ERROR
//! - DYN_CONFIG_INVALID

use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Unparsable JSON or a value outside its allowed range
    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Io { .. } => "DYN_CONFIG_IO_ERROR",
            ConfigError::Invalid(_) => "DYN_CONFIG_INVALID",
        }
    }
}
