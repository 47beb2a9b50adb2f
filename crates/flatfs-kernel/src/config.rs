//! Filesystem configuration.
//!
//! Loaded from a TOML file; every field has a default so an empty file (or
//! no file at all) yields [`FsConfig::default`].
//!
//! ```toml
//! max_files = 1024
//! max_file_size = 65536
//! strict_names = true
//! reported_file_size = 1024
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default upper bound on a single file's content.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 64 * 1024;

/// Default upper bound on an entry name, in bytes.
pub const DEFAULT_MAX_NAME_LEN: usize = 255;

/// Errors from loading a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tunables for one mounted namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FsConfig {
    /// Maximum number of directories (`None` = unbounded).
    pub max_directories: Option<usize>,
    /// Maximum number of files (`None` = unbounded).
    pub max_files: Option<usize>,
    /// Maximum content length of one file.
    pub max_file_size: u64,
    /// Maximum entry name length in bytes.
    pub max_name_len: usize,
    /// Reject creating a name that already exists as a directory or file.
    pub strict_names: bool,
    /// Report this size for every file instead of its content length.
    pub reported_file_size: Option<u64>,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            max_directories: None,
            max_files: None,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_name_len: DEFAULT_MAX_NAME_LEN,
            strict_names: true,
            reported_file_size: None,
        }
    }
}

impl FsConfig {
    /// Parse a TOML document. Limits are checked by [`FsConfig::validate`].
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Load from a file on disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make every create fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_name_len == 0 {
            return Err(ConfigError::Invalid("max_name_len must be at least 1".into()));
        }
        Ok(())
    }

    /// Settings that reproduce the classic tutorial filesystem: duplicate
    /// names allowed and every file reported as 1024 bytes.
    pub fn classic() -> Self {
        Self {
            strict_names: false,
            reported_file_size: Some(1024),
            ..Self::default()
        }
    }
}
