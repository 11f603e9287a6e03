//! CLI error types
//!
//! Anything that stops the process before or outside request handling.
//! Request-level failures are written as error responses instead.

use std::io;

use thiserror::Error;

use crate::config::ConfigError;
use crate::service::ServiceError;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Config file '{0}' already exists")]
    AlreadyInitialized(String),

    /// Registry or store failed to open
    #[error("Startup failed: {0}")]
    Startup(#[from] ServiceError),

    #[error("Empty input")]
    EmptyInput,
}

impl CliError {
    pub fn code(&self) -> &'static str {
        match self {
            CliError::Config(e) => e.code(),
            CliError::Io(_) => "DYN_CLI_IO_ERROR",
            CliError::AlreadyInitialized(_) => "DYN_CLI_ALREADY_INITIALIZED",
            CliError::Startup(e) => e.code(),
            CliError::EmptyInput => "DYN_CLI_EMPTY_INPUT",
        }
    }
}
