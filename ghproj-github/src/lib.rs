//! ghproj GitHub - GitHub Projects access for ghproj
//!
//! This crate talks to the GitHub GraphQL API: resolving project owners,
//! exporting projects into bundles, rebuilding projects from bundles and
//! applying bulk item mutations.

mod bulk;
mod client;
mod error;
mod export;
mod import;
mod mutations;
mod project;
mod resolver;
mod transport;

#[cfg(test)]
mod testing;

pub use bulk::{execute_bulk, resolve_filter, BulkMutation, ItemIndex};
pub use client::GitHubClient;
pub use error::{Error, Result};
pub use export::{export_bundle, ExportOptions};
pub use import::{
    import_bundle, FieldAction, ImportOptions, ImportPlan, ImportResult, ItemSource, MergeStrategy,
    PlannedField, PlannedItem, DEFAULT_PROJECT_FIELDS,
};
pub use mutations::{CreatedProject, FieldValueInput};
pub use project::{FieldOption, Iteration, ProjectField, ProjectItem, ProjectView};
pub use resolver::{resolve_with_fallback, OwnerNode, OwnerResolution};
pub use transport::{HttpTransport, Transport};
