//! Process configuration
//!
//! Loaded from a JSON file; every field has a default, so `{}` is a valid
//! config. Without a `data_dir` the registry and store live in memory.
//!
//! ```json
//! {
//!   "data_dir": "./data",
//!   "validation_mode": "strict",
//!   "log_filter": "info",
//!   "default_page_size": 100,
//!   "max_page_size": 1000
//! }
//! ```

mod errors;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::query::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::schema::ValidationMode;

pub use errors::{ConfigError, ConfigResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory for `schemas.json` and `records.log`; `None` keeps everything in memory
    #[serde(default)]
    pub data_dir: Option<String>,

    /// How unknown payload keys are treated (default: strict)
    #[serde(default)]
    pub validation_mode: ValidationMode,

    /// `tracing` filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    #[serde(default = "default_page_size")]
    pub default_page_size: usize,

    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
}

fn default_log_filter() -> String {
    "info".to_string()
}
fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}
fn default_max_page_size() -> usize {
    MAX_PAGE_SIZE
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            validation_mode: ValidationMode::default(),
            log_filter: default_log_filter(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Load from file if it exists, else defaults
    pub fn load_or_default(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: Config = serde_json::from_str(content)
            .map_err(|e| ConfigError::Invalid(format!("invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.default_page_size == 0 {
            return Err(ConfigError::Invalid("default_page_size must be > 0".into()));
        }
        if self.max_page_size < self.default_page_size {
            return Err(ConfigError::Invalid(format!(
                "max_page_size ({}) must be >= default_page_size ({})",
                self.max_page_size, self.default_page_size
            )));
        }
        if matches!(&self.data_dir, Some(dir) if dir.trim().is_empty()) {
            return Err(ConfigError::Invalid("data_dir must not be empty".into()));
        }
        if self.log_filter.trim().is_empty() {
            return Err(ConfigError::Invalid("log_filter must not be empty".into()));
        }
        Ok(())
    }

    /// Get data directory as Path
    pub fn data_path(&self) -> Option<&Path> {
        self.data_dir.as_deref().map(Path::new)
    }
}
