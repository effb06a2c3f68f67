//! Configuration management for ghproj
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (GHPROJ_*)
//! 3. Config file (~/.config/ghproj/config.toml)
//! 4. Default values

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::bundle::BundleFormat;
use crate::{Error, Result};

/// Default GitHub GraphQL endpoint
pub const DEFAULT_API_URL: &str = "https://api.github.com/graphql";

/// GitHub API connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// GraphQL endpoint (override for GitHub Enterprise)
    pub api_url: String,

    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Retries for transient transport failures (0 disables retrying)
    pub max_retries: u32,

    /// Delay before the first retry; doubled on each subsequent attempt
    #[serde(with = "humantime_serde")]
    pub retry_base_delay: Duration,

    /// User-Agent header sent with each request
    pub user_agent: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(500),
            user_agent: format!("ghproj/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Export defaults
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Bundle encoding used when `--format` is not given
    pub format: BundleFormat,
}

/// Bulk mutation defaults
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BulkConfig {
    /// Maximum mutations in flight at once
    pub concurrency: usize,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self { concurrency: 1 }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// GitHub API configuration
    pub github: GitHubConfig,

    /// Export configuration
    pub export: ExportConfig,

    /// Bulk mutation configuration
    pub bulk: BulkConfig,
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/ghproj/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("ghproj").join("config.toml"))
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - GHPROJ_API_URL: GraphQL endpoint
    /// - GHPROJ_CONCURRENCY: bulk mutation concurrency
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(api_url) = std::env::var("GHPROJ_API_URL") {
            self.github.api_url = api_url;
        }

        if let Ok(concurrency) = std::env::var("GHPROJ_CONCURRENCY") {
            self.bulk.concurrency = concurrency.trim().parse().map_err(|_| {
                Error::Config(format!(
                    "GHPROJ_CONCURRENCY must be a positive integer, got '{}'",
                    concurrency
                ))
            })?;
        }

        Ok(self)
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(mut self, api_url: Option<String>) -> Self {
        if let Some(url) = api_url {
            self.github.api_url = url;
        }

        self
    }

    /// Load configuration with all overrides applied
    ///
    /// Priority: CLI > env > config file > defaults
    pub fn load_with_overrides(api_url: Option<String>) -> Result<Self> {
        let config = Self::load()?
            .with_env_overrides()?
            .with_cli_overrides(api_url);
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make the client unusable
    pub fn validate(&self) -> Result<()> {
        if self.bulk.concurrency == 0 {
            return Err(Error::Config(
                "bulk.concurrency must be at least 1".to_string(),
            ));
        }
        if self.github.api_url.trim().is_empty() {
            return Err(Error::Config("github.api_url must not be empty".to_string()));
        }
        Ok(())
    }
}
