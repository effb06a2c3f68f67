//! Rebuilding a project from a bundle
//!
//! An import always creates a new project and then replays fields, items and
//! views onto it. Everything that can be decided from the bundle alone is
//! decided up front by [`ImportPlan`], so a dry run reports exactly the
//! counts a live run would produce. Stages run in a fixed order and a failed
//! stage stops the ones after it; nothing already created is rolled back.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use ghproj_core::{
    Bundle, BundleView, CancelFlag, ContentType, FieldDataType, FieldValue, SchemaVersion,
    SelectOption,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::mutations::{CreatedProject, FieldValueInput};
use crate::project::ProjectField;
use crate::{Error, GitHubClient, Result};

/// Fields every freshly created project already has
pub const DEFAULT_PROJECT_FIELDS: &[&str] = &[
    "Title",
    "Assignees",
    "Status",
    "Labels",
    "Linked pull requests",
    "Milestone",
    "Repository",
    "Reviewers",
    "Parent issue",
    "Sub-issues progress",
];

/// How bundle fields and items combine with what the new project already has
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Reuse existing fields; repeated items are merged, first value wins
    #[default]
    Merge,
    /// Reuse existing fields and overwrite their options; keep every item
    Replace,
    /// Create renamed copies of conflicting fields; keep every item
    Append,
    /// Leave conflicting fields out; drop repeated items
    SkipConflicts,
}

impl FromStr for MergeStrategy {
    type Err = ghproj_core::Error;

    fn from_str(s: &str) -> ghproj_core::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "merge" => Ok(MergeStrategy::Merge),
            "replace" => Ok(MergeStrategy::Replace),
            "append" => Ok(MergeStrategy::Append),
            "skip_conflicts" | "skip-conflicts" => Ok(MergeStrategy::SkipConflicts),
            _ => Err(ghproj_core::Error::Validation(format!(
                "Unknown merge strategy '{}'. Expected merge, replace, append or skip_conflicts",
                s
            ))),
        }
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MergeStrategy::Merge => "merge",
            MergeStrategy::Replace => "replace",
            MergeStrategy::Append => "append",
            MergeStrategy::SkipConflicts => "skip_conflicts",
        };
        f.write_str(name)
    }
}

/// Options for one import run
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Login of the user or organization that will own the new project
    pub owner: String,
    pub dry_run: bool,
    pub skip_items: bool,
    pub skip_fields: bool,
    pub strategy: MergeStrategy,
}

/// What to do with one bundle field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldAction {
    /// Reuse the new project's field with this name
    Map { target: String },
    /// Reuse the new project's field and overwrite its options
    ReplaceOptions {
        target: String,
        options: Vec<SelectOption>,
    },
    /// Create a new custom field
    Create {
        name: String,
        data_type: FieldDataType,
        options: Vec<SelectOption>,
    },
    /// Leave the field and its values out
    Skip,
}

/// A bundle field with its planned action
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedField {
    /// Name in the bundle; item values refer to it
    pub source: String,
    pub data_type: FieldDataType,
    pub action: FieldAction,
}

/// How an item gets into the new project
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemSource {
    /// Existing issue or pull request, looked up by URL
    Content { url: String },
    /// New draft issue
    Draft { title: String, body: Option<String> },
}

/// A bundle item with the values that will be written to it
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedItem {
    pub source: ItemSource,
    /// Keyed by bundle field name
    pub values: BTreeMap<String, FieldValue>,
}

/// Everything an import will do, computed from the bundle alone
#[derive(Debug, Clone, PartialEq)]
pub struct ImportPlan {
    pub title: String,
    pub description: Option<String>,
    pub fields: Vec<PlannedField>,
    pub items: Vec<PlannedItem>,
    pub views: Vec<BundleView>,
    pub warnings: Vec<String>,
}

fn push_warning(warnings: &mut Vec<String>, message: String) {
    if !warnings.contains(&message) {
        warn!("{}", message);
        warnings.push(message);
    }
}

fn is_default_field(name: &str) -> bool {
    DEFAULT_PROJECT_FIELDS
        .iter()
        .any(|f| f.eq_ignore_ascii_case(name))
}

fn canonical_default(name: &str) -> String {
    DEFAULT_PROJECT_FIELDS
        .iter()
        .find(|f| f.eq_ignore_ascii_case(name))
        .map(|f| f.to_string())
        .unwrap_or_else(|| name.to_string())
}

impl ImportPlan {
    pub fn new(bundle: &Bundle, options: &ImportOptions) -> Self {
        let mut warnings = Vec::new();
        match bundle.schema_version() {
            SchemaVersion::V1 => {}
            SchemaVersion::Newer { major } => push_warning(
                &mut warnings,
                format!(
                    "Bundle format {} is newer than this tool supports; keys it does not know were ignored",
                    major
                ),
            ),
        }

        let fields = if options.skip_fields {
            Vec::new()
        } else {
            plan_fields(bundle, options.strategy, &mut warnings)
        };
        let items = if options.skip_items {
            Vec::new()
        } else {
            let fields_in_bundle = bundle.fields.is_some() && !options.skip_fields;
            if !options.skip_fields && bundle.fields.is_none() && has_field_values(bundle) {
                push_warning(
                    &mut warnings,
                    "Bundle has no fields collection; item field values were dropped".to_string(),
                );
            }
            plan_items(bundle, &fields, fields_in_bundle, options.strategy, &mut warnings)
        };

        if bundle.project.closed {
            push_warning(
                &mut warnings,
                "Source project is closed; the imported project stays open".to_string(),
            );
        }

        Self {
            title: bundle.project.title.clone(),
            description: bundle.project.description.clone().filter(|d| !d.is_empty()),
            fields,
            items,
            views: bundle.views.clone().unwrap_or_default(),
            warnings,
        }
    }

    /// Fields that will be mapped or created
    pub fn field_count(&self) -> usize {
        self.fields
            .iter()
            .filter(|f| f.action != FieldAction::Skip)
            .count()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    fn field(&self, source: &str) -> Option<&PlannedField> {
        self.fields.iter().find(|f| f.source == source)
    }
}

fn plan_fields(
    bundle: &Bundle,
    strategy: MergeStrategy,
    warnings: &mut Vec<String>,
) -> Vec<PlannedField> {
    let Some(fields) = &bundle.fields else {
        return Vec::new();
    };

    fields
        .iter()
        .map(|field| {
            let options = field.options.clone().unwrap_or_default();
            let action = if !field.data_type.is_custom() {
                FieldAction::Map {
                    target: canonical_default(&field.name),
                }
            } else if is_default_field(&field.name) {
                let target = canonical_default(&field.name);
                match strategy {
                    MergeStrategy::Merge => FieldAction::Map { target },
                    MergeStrategy::Replace if field.data_type == FieldDataType::SingleSelect => {
                        FieldAction::ReplaceOptions { target, options }
                    }
                    MergeStrategy::Replace => FieldAction::Map { target },
                    MergeStrategy::Append => FieldAction::Create {
                        name: format!("{} (imported)", field.name),
                        data_type: field.data_type,
                        options,
                    },
                    MergeStrategy::SkipConflicts => {
                        push_warning(
                            warnings,
                            format!(
                                "Field '{}' conflicts with an existing field and was skipped",
                                field.name
                            ),
                        );
                        FieldAction::Skip
                    }
                }
            } else {
                FieldAction::Create {
                    name: field.name.clone(),
                    data_type: field.data_type,
                    options,
                }
            };

            PlannedField {
                source: field.name.clone(),
                data_type: field.data_type,
                action,
            }
        })
        .collect()
}

fn has_field_values(bundle: &Bundle) -> bool {
    bundle
        .items
        .iter()
        .flatten()
        .any(|item| !item.field_values.is_empty())
}

fn plan_values(
    values: &BTreeMap<String, FieldValue>,
    fields: &[PlannedField],
    fields_in_bundle: bool,
    warnings: &mut Vec<String>,
) -> BTreeMap<String, FieldValue> {
    let mut planned = BTreeMap::new();

    for (name, value) in values {
        let Some(field) = fields.iter().find(|f| &f.source == name) else {
            if fields_in_bundle {
                push_warning(
                    warnings,
                    format!("Values for field '{}' dropped: field not in bundle", name),
                );
            }
            continue;
        };

        match (&field.action, field.data_type) {
            (FieldAction::Skip, _) => {}
            (_, FieldDataType::Iteration) => push_warning(
                warnings,
                format!("Values for iteration field '{}' dropped: iterations cannot be recreated", name),
            ),
            (_, data_type) if !data_type.is_custom() => {}
            _ => {
                planned.insert(name.clone(), value.clone());
            }
        }
    }

    planned
}

fn plan_items(
    bundle: &Bundle,
    fields: &[PlannedField],
    fields_in_bundle: bool,
    strategy: MergeStrategy,
    warnings: &mut Vec<String>,
) -> Vec<PlannedItem> {
    let Some(items) = &bundle.items else {
        return Vec::new();
    };

    let dedupe = matches!(strategy, MergeStrategy::Merge | MergeStrategy::SkipConflicts);
    let mut planned: Vec<PlannedItem> = Vec::with_capacity(items.len());
    let mut by_url: HashMap<String, usize> = HashMap::new();

    for item in items {
        let values = plan_values(&item.field_values, fields, fields_in_bundle, warnings);
        let source = match (&item.content_type, &item.url) {
            (ContentType::Issue | ContentType::PullRequest, Some(url)) if !url.is_empty() => {
                ItemSource::Content { url: url.clone() }
            }
            _ => ItemSource::Draft {
                title: item.title.clone(),
                body: item.body.clone().filter(|b| !b.is_empty()),
            },
        };

        if let ItemSource::Content { url } = &source {
            if dedupe {
                if let Some(&index) = by_url.get(url) {
                    if strategy == MergeStrategy::Merge {
                        for (name, value) in values {
                            planned[index].values.entry(name).or_insert(value);
                        }
                    }
                    debug!(url = %url, %strategy, "Repeated item folded into first copy");
                    continue;
                }
                by_url.insert(url.clone(), planned.len());
            }
        }

        planned.push(PlannedItem { source, values });
    }

    planned
}

/// Outcome of an import
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    /// Empty for dry runs
    pub project_id: String,
    pub project_title: String,
    /// Empty for dry runs
    pub project_url: String,
    pub item_count: usize,
    pub field_count: usize,
    pub view_count: usize,
    pub dry_run: bool,
    pub warnings: Vec<String>,
}

/// Create a new project under `options.owner` from `bundle`
pub async fn import_bundle(
    client: &GitHubClient,
    bundle: &Bundle,
    options: &ImportOptions,
    cancel: &CancelFlag,
) -> Result<ImportResult> {
    let plan = ImportPlan::new(bundle, options);
    info!(
        owner = %options.owner,
        strategy = %options.strategy,
        dry_run = options.dry_run,
        fields = plan.field_count(),
        items = plan.item_count(),
        views = plan.view_count(),
        "Planned import"
    );

    let owner = client.resolve_owner(&options.owner).await?;
    cancel.check()?;

    if options.dry_run {
        return Ok(ImportResult {
            project_id: String::new(),
            project_title: plan.title.clone(),
            project_url: String::new(),
            item_count: plan.item_count(),
            field_count: plan.field_count(),
            view_count: plan.view_count(),
            dry_run: true,
            warnings: plan.warnings,
        });
    }

    let project = client.create_project(&owner.id, &plan.title).await?;
    info!(url = %project.url, "Created project");

    let mut run = ImportRun {
        client,
        project: &project,
        plan: &plan,
        cancel,
        warnings: plan.warnings.clone(),
        targets: HashMap::new(),
    };

    let outcome = run.project_details().await;
    run.finish("project", outcome)?;
    if !plan.fields.is_empty() {
        let outcome = run.fields().await;
        run.finish("fields", outcome)?;
    }
    if !plan.items.is_empty() {
        let outcome = run.items().await;
        run.finish("items", outcome)?;
    }
    if !plan.views.is_empty() {
        let outcome = run.views().await;
        run.finish("views", outcome)?;
    }

    Ok(ImportResult {
        project_id: project.id.clone(),
        project_title: project.title.clone(),
        project_url: project.url.clone(),
        item_count: plan.item_count(),
        field_count: plan.field_count(),
        view_count: plan.view_count(),
        dry_run: false,
        warnings: run.warnings,
    })
}

/// State of a live import after the project exists
struct ImportRun<'a> {
    client: &'a GitHubClient,
    project: &'a CreatedProject,
    plan: &'a ImportPlan,
    cancel: &'a CancelFlag,
    warnings: Vec<String>,
    /// Bundle field name to the live field its values go to
    targets: HashMap<String, ProjectField>,
}

impl<'a> ImportRun<'a> {
    /// Attach the stage and project location to a failed stage
    fn finish(&self, stage: &'static str, outcome: Result<()>) -> Result<()> {
        outcome.map_err(|source| Error::PartialImport {
            stage,
            project_url: self.project.url.clone(),
            source: Box::new(source),
        })
    }

    async fn project_details(&mut self) -> Result<()> {
        self.cancel.check()?;
        if let Some(description) = &self.plan.description {
            self.client
                .update_project_description(&self.project.id, description)
                .await?;
        }
        Ok(())
    }

    async fn fields(&mut self) -> Result<()> {
        self.cancel.check()?;
        let existing = self.client.project_fields(&self.project.id).await?;
        let find = |name: &str| {
            existing
                .iter()
                .find(|f| f.name.eq_ignore_ascii_case(name))
                .cloned()
        };

        for planned in &self.plan.fields {
            let target = match &planned.action {
                FieldAction::Skip => continue,
                FieldAction::Map { target } => find(target.as_str()),
                FieldAction::ReplaceOptions { target, options } => match find(target.as_str()) {
                    Some(field) if field.data_type == FieldDataType::SingleSelect => Some(
                        self.client
                            .replace_field_options(&field.id, options)
                            .await?,
                    ),
                    other => other,
                },
                FieldAction::Create {
                    name,
                    data_type,
                    options,
                } => Some(
                    self.client
                        .create_field(&self.project.id, name, *data_type, options)
                        .await?,
                ),
            };

            match target {
                Some(field) => {
                    if planned.data_type.is_custom() && field.data_type != planned.data_type {
                        push_warning(
                            &mut self.warnings,
                            format!(
                                "Field '{}' was mapped onto a {:?} field; its values are not imported",
                                planned.source, field.data_type
                            ),
                        );
                    }
                    self.targets.insert(planned.source.clone(), field);
                }
                None => push_warning(
                    &mut self.warnings,
                    format!(
                        "Field '{}' has no counterpart in the new project",
                        planned.source
                    ),
                ),
            }
            self.cancel.check()?;
        }
        Ok(())
    }

    async fn items(&mut self) -> Result<()> {
        for (index, item) in self.plan.items.iter().enumerate() {
            self.cancel.check()?;
            let item_id = match &item.source {
                ItemSource::Content { url } => {
                    let content_id = self.client.content_id(url).await?;
                    self.client
                        .add_item_by_content(&self.project.id, &content_id)
                        .await?
                }
                ItemSource::Draft { title, body } => {
                    self.client
                        .add_draft_issue(&self.project.id, title, body.as_deref())
                        .await?
                }
            };
            debug!(index, item_id = %item_id, "Added item");

            for (name, value) in &item.values {
                let Some(field) = self.targets.get(name) else {
                    continue;
                };
                let same_type = self
                    .plan
                    .field(name)
                    .is_some_and(|planned| planned.data_type == field.data_type);
                if !same_type {
                    continue;
                }
                match FieldValueInput::for_field(field, value) {
                    Ok(input) => {
                        self.client
                            .set_item_field_value(&self.project.id, &item_id, &field.id, &input)
                            .await?
                    }
                    Err(e) => push_warning(&mut self.warnings, format!("Value skipped: {}", e)),
                }
            }
        }
        Ok(())
    }

    async fn views(&mut self) -> Result<()> {
        for view in &self.plan.views {
            self.cancel.check()?;
            self.client
                .create_view(&self.project.id, &view.name, view.layout)
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{query_error, MockTransport};
    use ghproj_core::{BundleField, BundleItem, BundleMetadata, BundleProject, ViewLayout};
    use serde_json::{json, Value};

    fn field(name: &str, data_type: FieldDataType) -> BundleField {
        BundleField {
            id: format!("F_{}", name),
            name: name.to_string(),
            data_type,
            options: None,
        }
    }

    fn item(title: &str, url: Option<&str>, values: &[(&str, FieldValue)]) -> BundleItem {
        BundleItem {
            id: format!("I_{}", title),
            title: title.to_string(),
            body: None,
            content_type: if url.is_some() {
                ContentType::Issue
            } else {
                ContentType::DraftIssue
            },
            url: url.map(str::to_string),
            field_values: values
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        }
    }

    fn text(s: &str) -> FieldValue {
        FieldValue::Text(s.to_string())
    }

    fn sample_bundle() -> Bundle {
        let mut status = field("Status", FieldDataType::SingleSelect);
        status.options = Some(vec![
            SelectOption {
                name: "Todo".to_string(),
                ..Default::default()
            },
            SelectOption {
                name: "Shipped".to_string(),
                color: Some("GREEN".to_string()),
                description: None,
            },
        ]);

        let mut bundle = Bundle::new(
            BundleMetadata::current("octocat"),
            BundleProject {
                id: "PVT_old".to_string(),
                title: "Launch".to_string(),
                description: Some("Q3 launch".to_string()),
                url: String::new(),
                owner: "octocat".to_string(),
                number: 3,
                closed: false,
            },
        );
        bundle.fields = Some(vec![
            field("Title", FieldDataType::Title),
            status,
            field("Points", FieldDataType::Number),
            field("Sprint", FieldDataType::Iteration),
        ]);
        bundle.items = Some(vec![
            item(
                "Crash",
                Some("https://github.com/o/r/issues/1"),
                &[
                    ("Title", text("Crash")),
                    ("Status", text("Shipped")),
                    ("Points", FieldValue::Number(3.0)),
                    ("Sprint", text("Sprint 1")),
                ],
            ),
            item("Idea", None, &[("Points", FieldValue::Number(1.0))]),
            item(
                "Crash again",
                Some("https://github.com/o/r/issues/1"),
                &[("Status", text("Todo")), ("Points", FieldValue::Number(8.0))],
            ),
        ]);
        bundle.views = Some(vec![
            BundleView {
                id: "V1".to_string(),
                name: "Table".to_string(),
                layout: ViewLayout::TableLayout,
            },
            BundleView {
                id: "V2".to_string(),
                name: "Board".to_string(),
                layout: ViewLayout::BoardLayout,
            },
        ]);
        bundle
    }

    fn options(strategy: MergeStrategy, dry_run: bool) -> ImportOptions {
        ImportOptions {
            owner: "octocat".to_string(),
            dry_run,
            strategy,
            ..Default::default()
        }
    }

    fn live_field(id: &str, name: &str, data_type: &str, options: &[&str]) -> Value {
        json!({
            "id": id,
            "name": name,
            "dataType": data_type,
            "options": options
                .iter()
                .enumerate()
                .map(|(i, o)| json!({"id": format!("{}_o{}", id, i), "name": o, "color": "GRAY", "description": ""}))
                .collect::<Vec<_>>(),
        })
    }

    fn github_handler(op: &str, vars: &Value) -> crate::Result<Value> {
        match op {
            "UserOwner" => Ok(json!({"user": {"id": "U_1", "login": "octocat"}})),
            "CreateProject" => Ok(json!({"createProjectV2": {"projectV2": {
                "id": "PVT_new", "number": 12, "title": vars["title"],
                "url": "https://github.com/users/octocat/projects/12"
            }}})),
            "UpdateProject" => Ok(json!({"updateProjectV2": {"projectV2": {"id": "PVT_new"}}})),
            "ProjectFields" => Ok(json!({"node": {"fields": {
                "nodes": [
                    live_field("F_title", "Title", "TITLE", &[]),
                    live_field("F_status", "Status", "SINGLE_SELECT", &["Todo", "In Progress", "Done"]),
                    live_field("F_assignees", "Assignees", "ASSIGNEES", &[]),
                ],
                "pageInfo": {"hasNextPage": false, "endCursor": null}
            }}})),
            "UpdateField" => {
                let names: Vec<&str> = vars["options"]
                    .as_array()
                    .unwrap()
                    .iter()
                    .map(|o| o["name"].as_str().unwrap())
                    .collect();
                Ok(json!({"updateProjectV2Field": {"projectV2Field":
                    live_field("F_status", "Status", "SINGLE_SELECT", &names)}}))
            }
            "CreateField" => {
                let name = vars["name"].as_str().unwrap();
                let data_type = vars["dataType"].as_str().unwrap();
                Ok(json!({"createProjectV2Field": {"projectV2Field":
                    live_field(&format!("F_new_{}", name), name, data_type, &[])}}))
            }
            "ContentId" => Ok(json!({"resource": {"id": "ISSUE_1"}})),
            "AddItem" => Ok(json!({"addProjectV2ItemById": {"item": {"id": "PVTI_content"}}})),
            "AddDraftIssue" => {
                Ok(json!({"addProjectV2DraftIssue": {"projectItem": {"id": "PVTI_draft"}}}))
            }
            "UpdateItemFieldValue" => {
                Ok(json!({"updateProjectV2ItemFieldValue": {"projectV2Item": {"id": vars["itemId"]}}}))
            }
            "CreateView" => Ok(json!({"createProjectV2View": {"projectV2View": {"id": "PVTV_1"}}})),
            other => panic!("unexpected operation {other}"),
        }
    }

    fn github() -> std::sync::Arc<MockTransport> {
        MockTransport::new(github_handler)
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("merge".parse::<MergeStrategy>().unwrap(), MergeStrategy::Merge);
        assert_eq!(
            "skip_conflicts".parse::<MergeStrategy>().unwrap(),
            MergeStrategy::SkipConflicts
        );
        assert_eq!(MergeStrategy::SkipConflicts.to_string(), "skip_conflicts");
        let err = "overwrite".parse::<MergeStrategy>().unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("overwrite"));
    }

    #[test]
    fn test_plan_per_strategy() {
        let bundle = sample_bundle();

        let merge = ImportPlan::new(&bundle, &options(MergeStrategy::Merge, false));
        assert_eq!(merge.field_count(), 4);
        assert_eq!(
            merge.field("Status").unwrap().action,
            FieldAction::Map {
                target: "Status".to_string()
            }
        );
        assert_eq!(merge.item_count(), 2);
        // First copy wins, second copy fills nothing new
        assert_eq!(merge.items[0].values["Status"], text("Shipped"));
        assert_eq!(merge.items[0].values["Points"], FieldValue::Number(3.0));

        let append = ImportPlan::new(&bundle, &options(MergeStrategy::Append, false));
        assert!(matches!(
            &append.field("Status").unwrap().action,
            FieldAction::Create { name, .. } if name == "Status (imported)"
        ));
        assert_eq!(append.item_count(), 3);

        let skip = ImportPlan::new(&bundle, &options(MergeStrategy::SkipConflicts, false));
        assert_eq!(skip.field_count(), 3);
        assert_eq!(skip.item_count(), 2);
        assert!(!skip.items[0].values.contains_key("Status"));
        assert!(skip.warnings.iter().any(|w| w.contains("'Status'")));
    }

    #[test]
    fn test_plan_drops_iteration_and_builtin_values() {
        let plan = ImportPlan::new(&sample_bundle(), &options(MergeStrategy::Replace, false));
        let values = &plan.items[0].values;
        assert!(!values.contains_key("Sprint"));
        assert!(!values.contains_key("Title"));
        assert!(plan.warnings.iter().any(|w| w.contains("iteration field 'Sprint'")));
        assert_eq!(plan.description.as_deref(), Some("Q3 launch"));
    }

    #[test]
    fn test_plan_skip_flags() {
        let mut opts = options(MergeStrategy::Replace, false);
        opts.skip_fields = true;
        opts.skip_items = true;
        let plan = ImportPlan::new(&sample_bundle(), &opts);
        assert_eq!(plan.field_count(), 0);
        assert_eq!(plan.item_count(), 0);
        assert_eq!(plan.view_count(), 2);
    }

    #[test]
    fn test_values_without_fields_collection_warn_once() {
        let mut bundle = sample_bundle();
        bundle.fields = None;

        let plan = ImportPlan::new(&bundle, &options(MergeStrategy::Merge, false));
        assert!(plan.items.iter().all(|item| item.values.is_empty()));
        let dropped: Vec<_> = plan
            .warnings
            .iter()
            .filter(|w| w.contains("no fields collection"))
            .collect();
        assert_eq!(dropped.len(), 1);
        assert!(!plan.warnings.iter().any(|w| w.contains("field not in bundle")));

        let mut opts = options(MergeStrategy::Merge, false);
        opts.skip_fields = true;
        let plan = ImportPlan::new(&bundle, &opts);
        assert!(!plan.warnings.iter().any(|w| w.contains("no fields collection")));
    }

    #[tokio::test]
    async fn test_newer_format_is_reported() {
        let mut bundle = sample_bundle();
        bundle.metadata.format_version = "2.1".to_string();
        let client = GitHubClient::with_transport(github());

        let result = import_bundle(
            &client,
            &bundle,
            &options(MergeStrategy::Merge, true),
            &CancelFlag::new(),
        )
        .await
        .unwrap();
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("Bundle format 2 is newer")));

        let current = ImportPlan::new(&sample_bundle(), &options(MergeStrategy::Merge, true));
        assert!(!current.warnings.iter().any(|w| w.contains("is newer")));
    }

    #[tokio::test]
    async fn test_round_trip_counts_with_replace() {
        let bundle = sample_bundle();
        let mock = github();
        let client = GitHubClient::with_transport(mock.clone());

        let result = import_bundle(
            &client,
            &bundle,
            &options(MergeStrategy::Replace, false),
            &CancelFlag::new(),
        )
        .await
        .unwrap();

        assert_eq!(result.field_count, bundle.fields.as_ref().unwrap().len());
        assert_eq!(result.item_count, bundle.items.as_ref().unwrap().len());
        assert_eq!(result.view_count, bundle.views.as_ref().unwrap().len());
        assert_eq!(result.project_url, "https://github.com/users/octocat/projects/12");
        assert!(!result.dry_run);

        assert_eq!(mock.count("UpdateField"), 1);
        // Points and Sprint are created; Title and Status are reused
        assert_eq!(mock.count("CreateField"), 2);
        assert_eq!(mock.count("AddItem"), 2);
        assert_eq!(mock.count("AddDraftIssue"), 1);
        assert_eq!(mock.count("CreateView"), 2);

        let shipped: Vec<Value> = mock
            .calls()
            .into_iter()
            .filter(|(op, _)| op == "UpdateItemFieldValue")
            .map(|(_, vars)| vars["value"].clone())
            .collect();
        assert!(shipped.contains(&json!({"singleSelectOptionId": "F_status_o1"})));
        assert!(shipped.contains(&json!({"number": 8.0})));
    }

    #[tokio::test]
    async fn test_dry_run_matches_live_counts() {
        let bundle = sample_bundle();
        for strategy in [
            MergeStrategy::Merge,
            MergeStrategy::Replace,
            MergeStrategy::Append,
            MergeStrategy::SkipConflicts,
        ] {
            let dry_mock = github();
            let dry = import_bundle(
                &GitHubClient::with_transport(dry_mock.clone()),
                &bundle,
                &options(strategy, true),
                &CancelFlag::new(),
            )
            .await
            .unwrap();
            let live = import_bundle(
                &GitHubClient::with_transport(github()),
                &bundle,
                &options(strategy, false),
                &CancelFlag::new(),
            )
            .await
            .unwrap();

            assert!(dry.dry_run);
            assert_eq!(dry.item_count, live.item_count, "{strategy}");
            assert_eq!(dry.field_count, live.field_count, "{strategy}");
            assert_eq!(dry.view_count, live.view_count, "{strategy}");
            assert_eq!(dry_mock.operations(), vec!["UserOwner"]);
        }
    }

    #[tokio::test]
    async fn test_unknown_option_becomes_warning_under_merge() {
        let client = GitHubClient::with_transport(github());
        let result = import_bundle(
            &client,
            &sample_bundle(),
            &options(MergeStrategy::Merge, false),
            &CancelFlag::new(),
        )
        .await
        .unwrap();
        assert!(result.warnings.iter().any(|w| w.contains("Shipped")));
    }

    #[tokio::test]
    async fn test_stage_failure_reports_partial_import() {
        let mock = MockTransport::new(|op, vars| match op {
            "CreateView" => Err(query_error(op, "views are not supported")),
            _ => github_handler(op, vars),
        });
        let client = GitHubClient::with_transport(mock.clone());

        let err = import_bundle(
            &client,
            &sample_bundle(),
            &options(MergeStrategy::Replace, false),
            &CancelFlag::new(),
        )
        .await
        .unwrap_err();

        match err {
            Error::PartialImport {
                stage, project_url, ..
            } => {
                assert_eq!(stage, "views");
                assert!(project_url.ends_with("/projects/12"));
            }
            other => panic!("expected partial import, got {other}"),
        }
        assert!(mock.count("AddItem") > 0);
    }

    #[tokio::test]
    async fn test_owner_failure_creates_nothing() {
        let mock = MockTransport::new(|op, _| Err(query_error(op, "no such login")));
        let client = GitHubClient::with_transport(mock.clone());

        let err = import_bundle(
            &client,
            &sample_bundle(),
            &options(MergeStrategy::Merge, false),
            &CancelFlag::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::OwnerNotFound { .. }));
        assert_eq!(mock.count("CreateProject"), 0);
    }
}
