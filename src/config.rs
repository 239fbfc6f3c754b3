use crate::domain::BranchFilter;
use crate::error::{BatchPushError, Result};
use crate::publisher::PublishOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

/// File name looked up in the current directory
pub const LOCAL_CONFIG_FILE: &str = "batchpush.toml";

/// File name looked up in the user config directory
pub const USER_CONFIG_FILE: &str = ".batchpush.toml";

/// Represents the complete configuration for git-batch-push.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_remote")]
    pub remote: String,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_inter_batch_delay_ms")]
    pub inter_batch_delay_ms: u64,

    #[serde(default)]
    pub branches: BranchesConfig,
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_batch_size() -> usize {
    1000
}

fn default_inter_batch_delay_ms() -> u64 {
    2000
}

/// Which local branches get published.
///
/// An empty `include` means every local branch.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct BranchesConfig {
    #[serde(default)]
    pub include: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            remote: default_remote(),
            batch_size: default_batch_size(),
            inter_batch_delay_ms: default_inter_batch_delay_ms(),
            branches: BranchesConfig::default(),
        }
    }
}

impl Config {
    /// Convert into publisher options, rejecting a zero batch size
    pub fn publish_options(&self, dry_run: bool) -> Result<PublishOptions> {
        let batch_size = NonZeroUsize::new(self.batch_size)
            .ok_or_else(|| BatchPushError::config("batch_size must be a positive integer"))?;

        if self.remote.trim().is_empty() {
            return Err(BatchPushError::config("remote must not be empty"));
        }

        Ok(PublishOptions {
            remote_name: self.remote.clone(),
            batch_size,
            inter_batch_delay: Duration::from_millis(self.inter_batch_delay_ms),
            dry_run,
        })
    }

    pub fn branch_filter(&self) -> BranchFilter {
        BranchFilter::new(
            self.branches.include.clone(),
            self.branches.exclude.clone(),
        )
    }
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `batchpush.toml` in current directory
/// 3. `.batchpush.toml` in user config directory
/// 4. Default configuration if no file found
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - If file exists but cannot be read or parsed
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    let config_str = if let Some(path) = config_path {
        read_config_file(Path::new(path))?
    } else if Path::new(LOCAL_CONFIG_FILE).exists() {
        read_config_file(Path::new(LOCAL_CONFIG_FILE))?
    } else if let Some(config_dir) = dirs::config_dir() {
        let user_path = config_dir.join(USER_CONFIG_FILE);
        if user_path.exists() {
            read_config_file(&user_path)?
        } else {
            return Ok(Config::default());
        }
    } else {
        return Ok(Config::default());
    };

    parse_config(&config_str)
}

/// Parse configuration from TOML text
pub fn parse_config(config_str: &str) -> Result<Config> {
    toml::from_str(config_str).map_err(|e| BatchPushError::config(e.to_string()))
}

fn read_config_file(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|e| BatchPushError::config(format!("Cannot read {}: {}", path.display(), e)))
}
