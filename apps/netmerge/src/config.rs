//! # Configuration
//!
//! Optional `netmerge.toml` holding default merge options and identity
//! columns. Command-line flags override whatever the file sets.
//!
//! ```toml
//! identity_column = "name"
//!
//! [identity_columns]
//! string_db = "display_name"
//!
//! [merge]
//! operation = "intersection"
//! interaction_column = "interaction"
//! ```

use netmerge_core::{MergeError, MergeOptions, NetworkId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "netmerge.toml";

/// Identity column used when neither the config nor the command line names one.
pub const DEFAULT_IDENTITY_COLUMN: &str = "name";

/// Contents of a netmerge configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetmergeConfig {
    /// Node column used as the matching attribute of every network.
    pub identity_column: String,
    /// Per-network overrides of `identity_column`, keyed by network id.
    pub identity_columns: BTreeMap<String, String>,
    /// Default merge options.
    pub merge: MergeOptions,
}

impl Default for NetmergeConfig {
    fn default() -> Self {
        Self {
            identity_column: DEFAULT_IDENTITY_COLUMN.to_string(),
            identity_columns: BTreeMap::new(),
            merge: MergeOptions::default(),
        }
    }
}

impl NetmergeConfig {
    /// Load the configuration.
    ///
    /// An explicit path must exist. Without one, `netmerge.toml` in the
    /// working directory is used when present, defaults otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self, MergeError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !fallback.is_file() {
                    tracing::debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                    return Ok(Self::default());
                }
                fallback
            }
        };

        let text = std::fs::read_to_string(&path).map_err(|e| {
            MergeError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        let config = Self::from_toml(&text)?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, MergeError> {
        toml::from_str(text)
            .map_err(|e| MergeError::SerializationError(format!("Invalid config: {}", e)))
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, MergeError> {
        toml::to_string_pretty(self)
            .map_err(|e| MergeError::SerializationError(format!("Render config: {}", e)))
    }

    /// Identity column of one network.
    #[must_use]
    pub fn identity_column_for(&self, network: &NetworkId) -> &str {
        self.identity_columns
            .get(network.as_str())
            .map_or(self.identity_column.as_str(), String::as_str)
    }
}
