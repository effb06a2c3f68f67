//! GitHub credentials
//!
//! Credentials are an explicit value handed to the transport constructor.
//! The secrets file lives at `~/.config/ghproj/secrets.toml` and must have
//! restrictive permissions (0600 on Unix).
//!
//! Loading priority:
//! 1. Environment variables (GITHUB_TOKEN, then GH_TOKEN)
//! 2. Secrets file (~/.config/ghproj/secrets.toml)

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::{Error, Result};

const TOKEN_ENV_VARS: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];

/// Secrets file layout
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SecretsFile {
    github: GitHubSecrets,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GitHubSecrets {
    token: Option<String>,
}

/// Where a token was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    /// Read from an environment variable
    Environment(&'static str),
    /// Read from the secrets file
    SecretsFile,
    /// Supplied directly by the caller
    Explicit,
}

/// An authenticated identity for the GitHub API
#[derive(Clone)]
pub struct Credentials {
    token: String,
    source: TokenSource,
}

impl Credentials {
    /// Wrap an explicit token
    pub fn from_token(token: impl Into<String>) -> Result<Self> {
        let token = token.into().trim().to_string();
        if token.is_empty() {
            return Err(Error::Config("GitHub token is empty".to_string()));
        }
        Ok(Self {
            token,
            source: TokenSource::Explicit,
        })
    }

    /// Load credentials from the environment, falling back to the secrets file
    pub fn load() -> Result<Self> {
        for var in TOKEN_ENV_VARS {
            if let Ok(token) = std::env::var(var) {
                let token = token.trim().to_string();
                if !token.is_empty() {
                    debug!(var, "Using GitHub token from environment");
                    return Ok(Self {
                        token,
                        source: TokenSource::Environment(var),
                    });
                }
            }
        }

        if let Some(path) = Self::default_secrets_path() {
            if path.exists() {
                if let Some(token) = Self::load_token_from_file(&path)? {
                    debug!(path = %path.display(), "Using GitHub token from secrets file");
                    return Ok(Self {
                        token,
                        source: TokenSource::SecretsFile,
                    });
                }
            }
        }

        Err(Error::Config(
            "GitHub token not found. Set GITHUB_TOKEN (or GH_TOKEN) \
             or add a token to ~/.config/ghproj/secrets.toml"
                .to_string(),
        ))
    }

    /// Read the token from a secrets file with permission checking
    pub fn load_token_from_file(path: &Path) -> Result<Option<String>> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let metadata = std::fs::metadata(path).map_err(Error::Io)?;
            let mode = metadata.permissions().mode();

            if mode & 0o077 != 0 {
                return Err(Error::Config(format!(
                    "Secrets file {} has insecure permissions {:o}. \
                     Please run: chmod 600 {}",
                    path.display(),
                    mode & 0o777,
                    path.display()
                )));
            }
        }

        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        let secrets: SecretsFile = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse secrets: {}", e)))?;

        Ok(secrets
            .github
            .token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty()))
    }

    /// Get the default secrets file path
    pub fn default_secrets_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("ghproj").join("secrets.toml"))
    }

    /// The bearer token
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Where the token came from
    pub fn source(&self) -> TokenSource {
        self.source
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}
