//! Applying one mutation to many project items

use futures::stream::{self, StreamExt};
use ghproj_core::{BulkResult, BulkTarget, CancelFlag, FieldValue, FilterExpr, TargetId};
use tracing::{debug, info, warn};

use crate::mutations::FieldValueInput;
use crate::project::{ProjectField, ProjectItem};
use crate::{Error, GitHubClient, Result};

/// The mutation applied to every target
#[derive(Debug, Clone, PartialEq)]
pub enum BulkMutation {
    /// Set one field to one value
    UpdateField {
        field_id: String,
        value: FieldValueInput,
    },
    /// Remove the item from the project
    Delete,
    /// Archive the item
    Archive,
}

impl BulkMutation {
    /// Build an update after checking the field and value against the project
    pub fn update_field(fields: &[ProjectField], name: &str, value: &str) -> Result<Self> {
        let field = fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                ghproj_core::Error::Validation(format!("Unknown field '{}' in project", name))
            })?;
        let value = FieldValueInput::for_field(field, &FieldValue::Text(value.to_string()))?;

        Ok(BulkMutation::UpdateField {
            field_id: field.id.clone(),
            value,
        })
    }

    fn name(&self) -> &'static str {
        match self {
            BulkMutation::UpdateField { .. } => "update",
            BulkMutation::Delete => "delete",
            BulkMutation::Archive => "archive",
        }
    }

    async fn apply(&self, client: &GitHubClient, project_id: &str, item_id: &str) -> Result<()> {
        match self {
            BulkMutation::UpdateField { field_id, value } => {
                client
                    .set_item_field_value(project_id, item_id, field_id, value)
                    .await
            }
            BulkMutation::Delete => client.delete_item(project_id, item_id).await,
            BulkMutation::Archive => client.archive_item(project_id, item_id).await,
        }
    }
}

#[derive(Debug, Clone)]
struct IndexedItem {
    id: String,
    repository: String,
    number: u64,
}

/// Maps issue and pull request identifiers to project item ids
#[derive(Debug, Clone, Default)]
pub struct ItemIndex {
    items: Vec<IndexedItem>,
}

impl ItemIndex {
    /// Index the items backed by issues or pull requests; drafts have no number
    pub fn new(items: &[ProjectItem]) -> Self {
        let items = items
            .iter()
            .filter_map(|item| {
                Some(IndexedItem {
                    id: item.id.clone(),
                    repository: item.repository.clone()?,
                    number: item.number?,
                })
            })
            .collect();
        Self { items }
    }

    /// Project item id for `target`
    ///
    /// An unqualified number must match items in exactly one repository.
    pub fn lookup(&self, target: &TargetId) -> Result<&str> {
        self.find(target).map(|item| item.id.as_str())
    }

    /// Rewrite every identifier that names a known item as `owner/repo#N`
    ///
    /// Sources that spell the same item differently (`3` from a range,
    /// `o/r#3` from a filter) collapse into one target. Identifiers that do
    /// not resolve are kept as written so the run reports them.
    pub fn canonicalize(&self, target: &BulkTarget) -> BulkTarget {
        let resolved = target.ids().iter().map(|id| match self.find(id) {
            Ok(item) => TargetId::qualified(item.repository.clone(), item.number),
            Err(_) => id.clone(),
        });
        let canonical = BulkTarget::from_sources([resolved]);
        if canonical.len() < target.len() {
            debug!(
                before = target.len(),
                after = canonical.len(),
                "Merged identifiers naming the same item"
            );
        }
        canonical
    }

    fn find(&self, target: &TargetId) -> Result<&IndexedItem> {
        let found: Vec<&IndexedItem> = self
            .items
            .iter()
            .filter(|item| item.number == target.number)
            .filter(|item| match &target.repo {
                Some(repo) => item.repository.eq_ignore_ascii_case(repo),
                None => true,
            })
            .collect();

        let Some(&first) = found.first() else {
            return Err(Error::Other("not found in project".to_string()));
        };
        if found.iter().all(|item| item.id == first.id) {
            return Ok(first);
        }

        let repos: Vec<&str> = found.iter().map(|item| item.repository.as_str()).collect();
        Err(Error::Other(format!(
            "matches items in several repositories ({}); use owner/repo#{}",
            repos.join(", "),
            target.number
        )))
    }
}

/// Identifiers of the items whose content satisfies `filter`
pub fn resolve_filter(items: &[ProjectItem], filter: &FilterExpr) -> Vec<TargetId> {
    let matched: Vec<TargetId> = items
        .iter()
        .filter(|item| filter.matches(&item.labels, item.state))
        .filter_map(|item| {
            let repo = item.repository.as_ref()?;
            Some(TargetId::qualified(repo.clone(), item.number?))
        })
        .collect();
    debug!(%filter, count = matched.len(), "Resolved filter");
    matched
}

/// Apply `mutation` to every identifier in `target`
///
/// Up to `concurrency` mutations run at once; outcomes are recorded in
/// target order. Failures are collected, never fatal. Once `cancel` is set
/// no further mutation starts.
pub async fn execute_bulk(
    client: &GitHubClient,
    project_id: &str,
    index: &ItemIndex,
    target: &BulkTarget,
    mutation: &BulkMutation,
    concurrency: usize,
    cancel: &CancelFlag,
) -> BulkResult {
    info!(
        mutation = mutation.name(),
        targets = target.len(),
        concurrency,
        "Starting bulk mutation"
    );

    let mut outcomes = stream::iter(target.ids())
        .map(|id| async move {
            if cancel.is_cancelled() {
                return (id, None);
            }
            let outcome = match index.lookup(id) {
                Ok(item_id) => mutation.apply(client, project_id, item_id).await,
                Err(e) => Err(e),
            };
            (id, Some(outcome))
        })
        .buffered(concurrency.max(1));

    let mut result = BulkResult::new();
    while let Some((id, outcome)) = outcomes.next().await {
        match outcome {
            Some(Ok(())) => {
                debug!(item = %id, "Mutation applied");
                result.record_success();
            }
            Some(Err(e)) => {
                warn!(item = %id, error = %e, "Mutation failed");
                result.record_failure(id, e);
            }
            None => result.mark_cancelled(),
        }
    }

    info!(
        attempted = result.attempted(),
        succeeded = result.succeeded(),
        failed = result.failed(),
        cancelled = result.cancelled(),
        "Bulk mutation finished"
    );
    result
}
