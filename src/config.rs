//! Engine configuration
//!
//! Everything the ingestion engine needs that is not part of a single
//! transfer request: where source files live, where exports go, and the
//! batching and inference knobs. Loaded from YAML; every field has a
//! default so an empty document is a valid configuration.

use crate::delimiter::Delimiter;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// Engine Config
// ============================================================================

/// Configuration handed to the engine at construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory holding source flat files
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    /// Directory receiving exported flat files
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Maximum rows held in memory per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Rows returned by a preview
    #[serde(default = "default_preview_limit")]
    pub preview_limit: usize,

    /// Data rows sampled for schema inference
    #[serde(default = "default_sample_rows")]
    pub sample_rows: usize,

    /// Fail the read when a field does not parse as its planned type
    #[serde(default)]
    pub strict_values: bool,

    /// Source file extensions accepted by the file store
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,

    /// Delimiter used when a request does not name one
    #[serde(default)]
    pub default_delimiter: Delimiter,
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_batch_size() -> usize {
    10_000
}

fn default_preview_limit() -> usize {
    100
}

fn default_sample_rows() -> usize {
    5
}

fn default_allowed_extensions() -> Vec<String> {
    vec!["csv".to_string(), "tsv".to_string(), "txt".to_string()]
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            download_dir: default_download_dir(),
            batch_size: default_batch_size(),
            preview_limit: default_preview_limit(),
            sample_rows: default_sample_rows(),
            strict_values: false,
            allowed_extensions: default_allowed_extensions(),
            default_delimiter: Delimiter::default(),
        }
    }
}

impl EngineConfig {
    /// Create a config with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and validate a config from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                Error::config(format!(
                    "Failed to read config file '{}': {e}",
                    path.display()
                ))
            }
        })?;
        Self::from_yaml(&content)
    }

    /// Parse and validate a config from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: EngineConfig = if yaml.trim().is_empty() {
            EngineConfig::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::config("batch_size must be greater than zero"));
        }
        if self.preview_limit == 0 {
            return Err(Error::config("preview_limit must be greater than zero"));
        }
        if self.sample_rows == 0 {
            return Err(Error::config("sample_rows must be greater than zero"));
        }
        self.default_delimiter.as_byte()?;
        Ok(())
    }

    /// Set the source directory
    #[must_use]
    pub fn with_upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = dir.into();
        self
    }

    /// Set the export directory
    #[must_use]
    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    /// Set batch size
    #[must_use]
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Set preview row limit
    #[must_use]
    pub fn with_preview_limit(mut self, limit: usize) -> Self {
        self.preview_limit = limit;
        self
    }

    /// Set inference sample size
    #[must_use]
    pub fn with_sample_rows(mut self, rows: usize) -> Self {
        self.sample_rows = rows;
        self
    }

    /// Enable or disable strict value coercion
    #[must_use]
    pub fn with_strict_values(mut self, strict: bool) -> Self {
        self.strict_values = strict;
        self
    }
}
