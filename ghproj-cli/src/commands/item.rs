//! Bulk item commands

use std::path::PathBuf;

use clap::{Args, Subcommand};
use ghproj_core::bulk::{parse_item_ranges, read_item_list};
use ghproj_core::{
    parse_project_ref, BulkResult, BulkTarget, CancelFlag, Config, FilterExpr, TargetId,
};
use ghproj_github::{execute_bulk, resolve_filter, BulkMutation, ItemIndex, ProjectItem};

use super::connect;

/// Exit code for a run that finished with per-item failures under `--fail-on-error`
const EXIT_PARTIAL_FAILURE: u8 = 2;

/// Exit code for a run stopped by Ctrl-C
const EXIT_INTERRUPTED: u8 = 130;

/// Bulk operations on project items
#[derive(Args, Debug)]
pub struct ItemArgs {
    #[command(subcommand)]
    pub command: ItemCommand,
}

#[derive(Subcommand, Debug)]
pub enum ItemCommand {
    /// Set one field to one value on many items
    UpdateBulk {
        #[command(flatten)]
        target: TargetArgs,

        /// Field name
        #[arg(long)]
        field: String,

        /// New value (option name for single-select, YYYY-MM-DD for dates)
        #[arg(long)]
        value: String,
    },

    /// Remove many items from a project
    DeleteBulk {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Archive many items
    ArchiveBulk {
        #[command(flatten)]
        target: TargetArgs,
    },
}

/// Which items to touch and how to report
#[derive(Args, Debug)]
pub struct TargetArgs {
    /// Project reference (owner/number or project URL)
    pub project: String,

    /// Filter expression, e.g. `label:bug state:open`
    #[arg(long)]
    pub filter: Option<String>,

    /// Issue numbers, e.g. `1-10,15`
    #[arg(long)]
    pub items: Option<String>,

    /// File with one item per line (number, owner/repo#number or URL)
    ///
    /// Sources are combined in the order --items, --filter, --items-file,
    /// and each project item is mutated at most once.
    #[arg(long)]
    pub items_file: Option<PathBuf>,

    /// Mutations in flight at once (default from config)
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    /// Exit with status 2 when some items failed
    #[arg(long)]
    pub fail_on_error: bool,
}

/// Target sources parsed from the command line
struct Selection {
    ranges: Vec<TargetId>,
    filter: Option<FilterExpr>,
    listed: Vec<TargetId>,
    concurrency: usize,
}

impl Selection {
    /// Union of all sources, one identifier per project item
    fn target(self, items: &[ProjectItem], index: &ItemIndex) -> BulkTarget {
        let filtered = self
            .filter
            .as_ref()
            .map(|filter| resolve_filter(items, filter))
            .unwrap_or_default();
        index.canonicalize(&BulkTarget::from_sources([self.ranges, filtered, self.listed]))
    }
}

impl TargetArgs {
    fn parse(&self, config: &Config) -> anyhow::Result<Selection> {
        if self.filter.is_none() && self.items.is_none() && self.items_file.is_none() {
            anyhow::bail!("No items selected. Use --items, --items-file or --filter");
        }

        let filter = self.filter.as_deref().map(FilterExpr::parse).transpose()?;
        let ranges = self
            .items
            .as_deref()
            .map(parse_item_ranges)
            .transpose()?
            .unwrap_or_default();
        let listed = self
            .items_file
            .as_deref()
            .map(read_item_list)
            .transpose()?
            .unwrap_or_default();

        let concurrency = self.concurrency.unwrap_or(config.bulk.concurrency);
        if concurrency == 0 {
            anyhow::bail!("--concurrency must be at least 1");
        }

        Ok(Selection {
            ranges,
            filter,
            listed,
            concurrency,
        })
    }
}

/// Map a finished bulk run to the process exit code
///
/// Per-item failures are reported but exit 0 unless `fail_on_error` is set.
pub fn exit_code_for_bulk(result: &BulkResult, fail_on_error: bool) -> u8 {
    if result.cancelled() {
        EXIT_INTERRUPTED
    } else if fail_on_error && !result.is_clean() {
        EXIT_PARTIAL_FAILURE
    } else {
        0
    }
}

impl ItemArgs {
    /// Execute the item command, returning the exit code
    pub async fn execute(&self, config: &Config, cancel: &CancelFlag) -> anyhow::Result<u8> {
        let (target, update, verb) = match &self.command {
            ItemCommand::UpdateBulk {
                target,
                field,
                value,
            } => (target, Some((field, value)), "Updated"),
            ItemCommand::DeleteBulk { target } => (target, None, "Deleted"),
            ItemCommand::ArchiveBulk { target } => (target, None, "Archived"),
        };

        let project_ref = parse_project_ref(&target.project)?;
        let selection = target.parse(config)?;

        let client = connect(config)?;
        let project = client
            .resolve_project(&project_ref.owner, project_ref.number)
            .await?;

        let mutation = match (&self.command, update) {
            (ItemCommand::UpdateBulk { .. }, Some((field, value))) => {
                let fields = client.project_fields(project.id()).await?;
                BulkMutation::update_field(&fields, field, value)?
            }
            (ItemCommand::ArchiveBulk { .. }, _) => BulkMutation::Archive,
            _ => BulkMutation::Delete,
        };

        let items = client.project_items(project.id()).await?;
        let index = ItemIndex::new(&items);
        let concurrency = selection.concurrency;
        let ids = selection.target(&items, &index);

        if ids.is_empty() {
            println!("No matching items in {}", project);
            return Ok(0);
        }

        let result = execute_bulk(
            &client,
            project.id(),
            &index,
            &ids,
            &mutation,
            concurrency,
            cancel,
        )
        .await;

        if target.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            print_summary(verb, &result, ids.len());
        }
        Ok(exit_code_for_bulk(&result, target.fail_on_error))
    }
}

fn print_summary(verb: &str, result: &BulkResult, total: usize) {
    println!(
        "{} {} of {} items ({} failed)",
        verb,
        result.succeeded(),
        result.attempted(),
        result.failed()
    );
    for error in result.errors() {
        eprintln!("  {}", error);
    }
    if result.cancelled() {
        eprintln!(
            "Cancelled: {} of {} items were not attempted",
            total - result.attempted(),
            total
        );
    }
}
