//! Store configuration
//!
//! Loaded from a JSON file. Every key is optional and falls back to its
//! default; unknown keys are rejected so typos do not go unnoticed.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::codec::{ValueCodec, DEFAULT_SHORT_TEXT_MAX};
use crate::errors::{TableError, TableResult};
use crate::observability::Severity;

/// Table store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Directory holding `tables.json` (default: "./data")
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Character cap for short text cells (default: 500)
    #[serde(default = "default_short_text_max_len")]
    pub short_text_max_len: usize,

    /// How long a schema edit waits for another edit on the same table
    /// before failing with a conflict (default: 5000). Zero fails at once.
    #[serde(default = "default_schema_edit_timeout_ms")]
    pub schema_edit_timeout_ms: u64,

    /// Lines below this severity are not logged (default: INFO)
    #[serde(default = "default_log_level")]
    pub log_level: Severity,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_short_text_max_len() -> usize {
    DEFAULT_SHORT_TEXT_MAX
}

fn default_schema_edit_timeout_ms() -> u64 {
    5000
}

fn default_log_level() -> Severity {
    Severity::Info
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            short_text_max_len: default_short_text_max_len(),
            schema_edit_timeout_ms: default_schema_edit_timeout_ms(),
            log_level: default_log_level(),
        }
    }
}

impl StoreConfig {
    /// Default configuration rooted at `data_dir`
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> TableResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            TableError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let config: StoreConfig = serde_json::from_str(&content)
            .map_err(|e| TableError::Config(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> TableResult<()> {
        if self.short_text_max_len == 0 {
            return Err(TableError::Config("short_text_max_len must be > 0".into()));
        }
        if self.data_dir.as_os_str().is_empty() {
            return Err(TableError::Config("data_dir must not be empty".into()));
        }
        Ok(())
    }

    pub fn codec(&self) -> ValueCodec {
        ValueCodec::new(self.short_text_max_len)
    }

    pub fn edit_timeout(&self) -> Duration {
        Duration::from_millis(self.schema_edit_timeout_ms)
    }
}
