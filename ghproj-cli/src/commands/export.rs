//! Project export command

use std::path::{Path, PathBuf};

use clap::Args;
use ghproj_core::{parse_project_ref, BundleFormat, CancelFlag, Config};
use ghproj_github::{export_bundle, ExportOptions};
use tracing::warn;

use super::connect;

/// Export a project to a bundle
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Project reference (owner/number or project URL)
    pub project: String,

    /// Write the bundle here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Bundle encoding: json or yaml
    #[arg(short, long)]
    pub format: Option<String>,

    /// Include project items
    #[arg(long)]
    pub include_items: bool,

    /// Include field definitions
    #[arg(long)]
    pub include_fields: bool,

    /// Include saved views
    #[arg(long)]
    pub include_views: bool,

    /// Accepted for compatibility; workflows are not exported
    #[arg(long)]
    pub include_workflows: bool,
}

impl ExportArgs {
    /// Encoding from `--format`, the output extension, or config
    fn format(&self, config: &Config) -> anyhow::Result<BundleFormat> {
        if let Some(format) = &self.format {
            return Ok(format.parse()?);
        }
        let by_extension = self
            .output
            .as_deref()
            .and_then(Path::extension)
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok());
        Ok(by_extension.unwrap_or(config.export.format))
    }

    /// Collections to include; the bundle leaves out any not named by a flag
    fn options(&self) -> ExportOptions {
        ExportOptions {
            include_items: self.include_items,
            include_fields: self.include_fields,
            include_views: self.include_views,
        }
    }

    /// Execute the export command
    pub async fn execute(&self, config: &Config, cancel: &CancelFlag) -> anyhow::Result<()> {
        let project_ref = parse_project_ref(&self.project)?;
        let format = self.format(config)?;
        if self.include_workflows {
            warn!("Workflows are not part of the bundle format; --include-workflows is ignored");
        }

        let client = connect(config)?;
        let project = client
            .resolve_project(&project_ref.owner, project_ref.number)
            .await?;
        let bundle = export_bundle(&client, &project, &self.options(), cancel).await?;

        match &self.output {
            Some(path) => {
                bundle.write_to(path, format)?;
                eprintln!(
                    "Exported {} ({} items, {} fields, {} views) to {}",
                    project,
                    bundle.items.as_ref().map_or(0, Vec::len),
                    bundle.fields.as_ref().map_or(0, Vec::len),
                    bundle.views.as_ref().map_or(0, Vec::len),
                    path.display()
                );
            }
            None => print!("{}", bundle.encode(format)?),
        }

        Ok(())
    }
}
