//! Project import command

use std::path::PathBuf;

use clap::Args;
use ghproj_core::{Bundle, CancelFlag, Config};
use ghproj_github::{import_bundle, ImportOptions, ImportResult, MergeStrategy};

use super::connect;

/// Create a new project from a bundle
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Bundle file (JSON or YAML)
    #[arg(short, long)]
    pub file: PathBuf,

    /// User or organization that will own the new project
    #[arg(long)]
    pub owner: String,

    /// Report what would be created without creating anything
    #[arg(long)]
    pub dry_run: bool,

    /// Do not import items
    #[arg(long)]
    pub skip_items: bool,

    /// Do not import custom fields
    #[arg(long)]
    pub skip_fields: bool,

    /// merge, replace, append or skip_conflicts
    #[arg(long, default_value = "merge")]
    pub strategy: String,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

impl ImportArgs {
    /// Execute the import command
    pub async fn execute(&self, config: &Config, cancel: &CancelFlag) -> anyhow::Result<()> {
        let strategy: MergeStrategy = self.strategy.parse()?;
        let (bundle, format) = Bundle::read_from(&self.file)?;
        tracing::debug!(path = %self.file.display(), %format, "Read bundle");

        let options = ImportOptions {
            owner: self.owner.clone(),
            dry_run: self.dry_run,
            skip_items: self.skip_items,
            skip_fields: self.skip_fields,
            strategy,
        };

        let client = connect(config)?;
        let result = import_bundle(&client, &bundle, &options, cancel).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            print_summary(&result);
        }
        Ok(())
    }
}

fn print_summary(result: &ImportResult) {
    for warning in &result.warnings {
        eprintln!("warning: {}", warning);
    }

    if result.dry_run {
        println!("Dry run: would create project '{}' with", result.project_title);
    } else {
        println!("Created project '{}' with", result.project_title);
    }
    println!("  {} fields", result.field_count);
    println!("  {} items", result.item_count);
    println!("  {} views", result.view_count);
    if !result.dry_run {
        println!("URL: {}", result.project_url);
    }
}
