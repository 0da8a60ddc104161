//! Configuration file support for medlog.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/medlog/config.toml`.

use crate::dose_log::ReadPolicy;
use crate::registry::{DEFAULT_CUTOFF, DEFAULT_MAX_RESULTS};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub matching: MatchingConfig,

    #[serde(default)]
    pub log: LogConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_meds_dir")]
    pub meds_dir: PathBuf,

    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            meds_dir: default_meds_dir(),
            log_file: default_log_file(),
        }
    }
}

/// Near-match lookup configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Candidates must score strictly below this
    #[serde(default = "default_cutoff")]
    pub cutoff: usize,

    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            cutoff: default_cutoff(),
            max_results: default_max_results(),
        }
    }
}

/// Dose log configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default)]
    pub skip_malformed_lines: bool,

    /// chrono format for times typed on the command line
    #[serde(default = "default_input_time_format")]
    pub input_time_format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            skip_malformed_lines: false,
            input_time_format: default_input_time_format(),
        }
    }
}

impl LogConfig {
    pub fn read_policy(&self) -> ReadPolicy {
        if self.skip_malformed_lines {
            ReadPolicy::SkipMalformed
        } else {
            ReadPolicy::Strict
        }
    }
}

// Default value functions
fn data_base_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(|| PathBuf::from("."))
    });
    base.join("medlog")
}

fn default_meds_dir() -> PathBuf {
    data_base_dir().join("meds")
}

fn default_log_file() -> PathBuf {
    data_base_dir().join("logs").join("med.log")
}

fn default_cutoff() -> usize {
    DEFAULT_CUTOFF
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

fn default_input_time_format() -> String {
    "%m-%d-%Y_%H:%M".into()
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Reject values the core would refuse later
    pub fn validate(&self) -> Result<()> {
        if self.matching.cutoff == 0 {
            return Err(Error::Config(
                "matching.cutoff must be a positive integer".into(),
            ));
        }
        if self.log.input_time_format.trim().is_empty() {
            return Err(Error::Config(
                "log.input_time_format must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|| PathBuf::from("."))
        });
        base.join("medlog").join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
