//! CLI command implementations

pub mod export;
pub mod import;
pub mod item;

pub use export::ExportArgs;
pub use import::ImportArgs;
pub use item::ItemArgs;

use ghproj_core::{Config, Credentials};
use ghproj_github::GitHubClient;

/// Load credentials and build a client
///
/// Called only after all arguments have been validated, so bad input is
/// reported without touching the token or the network.
pub(crate) fn connect(config: &Config) -> anyhow::Result<GitHubClient> {
    let credentials = Credentials::load()?;
    Ok(GitHubClient::new(&credentials, &config.github)?)
}
