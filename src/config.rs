use crate::changes::DEFAULT_FILE_NAMES;
use crate::domain::Style;
use crate::error::{ReleaseError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Name of the configuration file looked up in the working and user config
/// directories
pub const CONFIG_FILE_NAME: &str = "release-sync.toml";

/// Represents the complete configuration for release-sync.
///
/// Contains where the CHANGES file lives, which branch and remote to work
/// against, optional naming overrides and reconciliation behavior.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub changes: ChangesConfig,

    #[serde(default)]
    pub repository: RepositoryConfig,

    #[serde(default)]
    pub style: StyleConfig,

    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

/// Returns the default list of CHANGES file names.
fn default_file_names() -> Vec<String> {
    DEFAULT_FILE_NAMES.iter().map(|s| s.to_string()).collect()
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_true() -> bool {
    true
}

/// Where to find the CHANGES document.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ChangesConfig {
    /// Top-level file names tried in order
    #[serde(default = "default_file_names")]
    pub file_names: Vec<String>,
}

impl Default for ChangesConfig {
    fn default() -> Self {
        ChangesConfig {
            file_names: default_file_names(),
        }
    }
}

/// Branch and remote to reconcile.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RepositoryConfig {
    /// Development branch; the host's default branch when unset
    #[serde(default)]
    pub main_branch: Option<String>,

    #[serde(default = "default_remote")]
    pub remote: String,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        RepositoryConfig {
            main_branch: None,
            remote: default_remote(),
        }
    }
}

/// Overrides for the inferred naming style.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct StyleConfig {
    #[serde(default)]
    pub prefix: Option<String>,

    #[serde(default)]
    pub omit_patch: Option<bool>,
}

impl StyleConfig {
    /// Apply the configured overrides on top of an inferred style
    pub fn apply(&self, inferred: Style) -> Style {
        Style {
            prefix: self.prefix.clone().unwrap_or(inferred.prefix),
            omit_patch: self.omit_patch.unwrap_or(inferred.omit_patch),
        }
    }
}

/// Configuration for reconciliation behavior.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ReconcileConfig {
    /// Expect a hosted release record for every released version
    #[serde(default = "default_true")]
    pub track_releases: bool,

    /// Push created branches and tags to the remote
    #[serde(default)]
    pub push: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        ReconcileConfig {
            track_releases: true,
            push: false,
        }
    }
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `release-sync.toml` in current directory
/// 3. `release-sync.toml` in the user config directory
/// 4. Default configuration if no file found
///
/// # Arguments
/// * `config_path` - Optional path to custom configuration file
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - If file exists but cannot be read or parsed
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    let local = Path::new(".").join(CONFIG_FILE_NAME);
    let config_str = if let Some(path) = config_path {
        fs::read_to_string(path)?
    } else if local.exists() {
        fs::read_to_string(local)?
    } else if let Some(config_dir) = dirs::config_dir() {
        let config_path = config_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            fs::read_to_string(config_path)?
        } else {
            return Ok(Config::default());
        }
    } else {
        return Ok(Config::default());
    };

    let config: Config = toml::from_str(&config_str)?;
    if config.changes.file_names.is_empty() {
        return Err(ReleaseError::config("changes.file_names must not be empty"));
    }
    Ok(config)
}
