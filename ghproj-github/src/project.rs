//! Reading project fields, items and views

use std::collections::BTreeMap;

use ghproj_core::{
    BundleField, BundleItem, BundleView, ContentState, ContentType, FieldDataType, FieldValue,
    SelectOption, ViewLayout,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::{Error, GitHubClient, Result};

const FIELDS_QUERY: &str = r#"
    query ProjectFields($id: ID!, $after: String) {
        node(id: $id) {
            ... on ProjectV2 {
                fields(first: 100, after: $after) {
                    nodes {
                        ... on ProjectV2FieldCommon {
                            id
                            name
                            dataType
                        }
                        ... on ProjectV2SingleSelectField {
                            options { id name color description }
                        }
                        ... on ProjectV2IterationField {
                            configuration {
                                iterations { id title }
                                completedIterations { id title }
                            }
                        }
                    }
                    pageInfo { hasNextPage endCursor }
                }
            }
        }
    }
"#;

const ITEMS_QUERY: &str = r#"
    query ProjectItems($id: ID!, $after: String) {
        node(id: $id) {
            ... on ProjectV2 {
                items(first: 100, after: $after) {
                    nodes {
                        id
                        content {
                            __typename
                            ... on DraftIssue { title body }
                            ... on Issue {
                                title body url number state
                                repository { nameWithOwner }
                                labels(first: 50) { nodes { name } }
                            }
                            ... on PullRequest {
                                title body url number state
                                repository { nameWithOwner }
                                labels(first: 50) { nodes { name } }
                            }
                        }
                        fieldValues(first: 50) {
                            nodes {
                                __typename
                                ... on ProjectV2ItemFieldTextValue {
                                    text
                                    field { ... on ProjectV2FieldCommon { name } }
                                }
                                ... on ProjectV2ItemFieldNumberValue {
                                    number
                                    field { ... on ProjectV2FieldCommon { name } }
                                }
                                ... on ProjectV2ItemFieldDateValue {
                                    date
                                    field { ... on ProjectV2FieldCommon { name } }
                                }
                                ... on ProjectV2ItemFieldSingleSelectValue {
                                    name
                                    field { ... on ProjectV2FieldCommon { name } }
                                }
                                ... on ProjectV2ItemFieldIterationValue {
                                    title
                                    field { ... on ProjectV2FieldCommon { name } }
                                }
                            }
                        }
                    }
                    pageInfo { hasNextPage endCursor }
                }
            }
        }
    }
"#;

const VIEWS_QUERY: &str = r#"
    query ProjectViews($id: ID!, $after: String) {
        node(id: $id) {
            ... on ProjectV2 {
                views(first: 50, after: $after) {
                    nodes { id name layout }
                    pageInfo { hasNextPage endCursor }
                }
            }
        }
    }
"#;

const DETAILS_QUERY: &str = r#"
    query ProjectDetails($id: ID!) {
        node(id: $id) {
            ... on ProjectV2 { shortDescription }
        }
    }
"#;

/// A single-select option as stored on GitHub
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldOption {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// An iteration of an iteration field
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Iteration {
    pub id: String,
    pub title: String,
}

/// A field definition on a live project
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectField {
    pub id: String,
    pub name: String,
    pub data_type: FieldDataType,
    pub options: Vec<FieldOption>,
    pub iterations: Vec<Iteration>,
}

impl ProjectField {
    /// Find a single-select option by name (case-insensitive)
    pub fn option_named(&self, name: &str) -> Option<&FieldOption> {
        self.options
            .iter()
            .find(|o| o.name.eq_ignore_ascii_case(name))
    }

    /// Find an iteration by title (case-insensitive)
    pub fn iteration_titled(&self, title: &str) -> Option<&Iteration> {
        self.iterations
            .iter()
            .find(|i| i.title.eq_ignore_ascii_case(title))
    }
}

/// An item on a live project
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectItem {
    pub id: String,
    pub content_type: ContentType,
    pub title: String,
    pub body: Option<String>,
    pub url: Option<String>,
    /// Issue or pull request number
    pub number: Option<u64>,
    /// `owner/repo` of the issue or pull request
    pub repository: Option<String>,
    pub labels: Vec<String>,
    pub state: Option<ContentState>,
    pub field_values: BTreeMap<String, FieldValue>,
}

/// A saved view on a live project
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProjectView {
    pub id: String,
    pub name: String,
    pub layout: ViewLayout,
}

impl From<ProjectField> for BundleField {
    fn from(field: ProjectField) -> Self {
        let options = (field.data_type == FieldDataType::SingleSelect).then(|| {
            field
                .options
                .into_iter()
                .map(|o| SelectOption {
                    name: o.name,
                    color: o.color,
                    description: o.description.filter(|d| !d.is_empty()),
                })
                .collect()
        });

        BundleField {
            id: field.id,
            name: field.name,
            data_type: field.data_type,
            options,
        }
    }
}

impl From<ProjectItem> for BundleItem {
    fn from(item: ProjectItem) -> Self {
        BundleItem {
            id: item.id,
            title: item.title,
            body: item.body.filter(|b| !b.is_empty()),
            content_type: item.content_type,
            url: item.url,
            field_values: item.field_values,
        }
    }
}

impl From<ProjectView> for BundleView {
    fn from(view: ProjectView) -> Self {
        BundleView {
            id: view.id,
            name: view.name,
            layout: view.layout,
        }
    }
}

#[derive(Debug, Deserialize)]
struct NodeData<T> {
    node: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Connection<T> {
    nodes: Vec<Option<T>>,
    page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
struct ProjectConnection<T> {
    #[serde(alias = "fields", alias = "items", alias = "views")]
    connection: Connection<T>,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Nodes<T> {
    #[serde(default)]
    nodes: Vec<Option<T>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FieldNode {
    id: String,
    name: String,
    data_type: FieldDataType,
    #[serde(default)]
    options: Vec<FieldOption>,
    #[serde(default)]
    configuration: Option<IterationConfiguration>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IterationConfiguration {
    #[serde(default)]
    iterations: Vec<Iteration>,
    #[serde(default)]
    completed_iterations: Vec<Iteration>,
}

impl From<FieldNode> for ProjectField {
    fn from(node: FieldNode) -> Self {
        let iterations = node
            .configuration
            .map(|c| c.iterations.into_iter().chain(c.completed_iterations).collect())
            .unwrap_or_default();

        ProjectField {
            id: node.id,
            name: node.name,
            data_type: node.data_type,
            options: node.options,
            iterations,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemNode {
    id: String,
    content: Option<ContentNode>,
    field_values: Nodes<FieldValueNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContentNode {
    #[serde(rename = "__typename")]
    typename: String,
    title: Option<String>,
    body: Option<String>,
    url: Option<String>,
    number: Option<u64>,
    state: Option<String>,
    repository: Option<RepositoryNode>,
    labels: Option<Nodes<LabelNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryNode {
    name_with_owner: String,
}

#[derive(Debug, Deserialize)]
struct LabelNode {
    name: String,
}

#[derive(Debug, Deserialize)]
struct FieldValueNode {
    #[serde(default, rename = "__typename")]
    typename: String,
    text: Option<String>,
    number: Option<f64>,
    date: Option<String>,
    name: Option<String>,
    title: Option<String>,
    field: Option<FieldNameNode>,
}

#[derive(Debug, Deserialize)]
struct FieldNameNode {
    name: Option<String>,
}

impl FieldValueNode {
    fn into_entry(self) -> Option<(String, FieldValue)> {
        let field = self.field.and_then(|f| f.name)?;
        let value = match self.typename.as_str() {
            "ProjectV2ItemFieldTextValue" => FieldValue::Text(self.text?),
            "ProjectV2ItemFieldNumberValue" => FieldValue::Number(self.number?),
            "ProjectV2ItemFieldDateValue" => FieldValue::Text(self.date?),
            "ProjectV2ItemFieldSingleSelectValue" => FieldValue::Text(self.name?),
            "ProjectV2ItemFieldIterationValue" => FieldValue::Text(self.title?),
            _ => return None,
        };
        Some((field, value))
    }
}

impl From<ItemNode> for ProjectItem {
    fn from(node: ItemNode) -> Self {
        let field_values: BTreeMap<String, FieldValue> = node
            .field_values
            .nodes
            .into_iter()
            .flatten()
            .filter_map(FieldValueNode::into_entry)
            .collect();

        let Some(content) = node.content else {
            // Content we cannot see (e.g. a private repository); keep what the project knows
            let title = match field_values.get("Title") {
                Some(FieldValue::Text(t)) => t.clone(),
                _ => String::new(),
            };
            return ProjectItem {
                id: node.id,
                content_type: ContentType::DraftIssue,
                title,
                body: None,
                url: None,
                number: None,
                repository: None,
                labels: Vec::new(),
                state: None,
                field_values,
            };
        };

        let content_type = match content.typename.as_str() {
            "Issue" => ContentType::Issue,
            "PullRequest" => ContentType::PullRequest,
            _ => ContentType::DraftIssue,
        };

        ProjectItem {
            id: node.id,
            content_type,
            title: content.title.unwrap_or_default(),
            body: content.body,
            url: content.url,
            number: content.number,
            repository: content.repository.map(|r| r.name_with_owner),
            labels: content
                .labels
                .map(|l| l.nodes.into_iter().flatten().map(|n| n.name).collect())
                .unwrap_or_default(),
            state: content.state.and_then(|s| s.parse().ok()),
            field_values,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetailsNode {
    short_description: Option<String>,
}

impl GitHubClient {
    /// Fetch every page of one of a project's connections
    async fn paginate<T: DeserializeOwned>(
        &self,
        operation: &str,
        query: &str,
        project_id: &str,
    ) -> Result<Vec<T>> {
        let mut nodes = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let data: NodeData<ProjectConnection<T>> = self
                .query(operation, query, json!({ "id": project_id, "after": after }))
                .await?;
            let page = data
                .node
                .ok_or_else(|| Error::NotFound(format!("project {}", project_id)))?
                .connection;

            nodes.extend(page.nodes.into_iter().flatten());

            match page.page_info.end_cursor {
                Some(cursor) if page.page_info.has_next_page => after = Some(cursor),
                _ => break,
            }
        }

        debug!(operation, count = nodes.len(), "Fetched all pages");
        Ok(nodes)
    }

    /// All field definitions of a project
    pub async fn project_fields(&self, project_id: &str) -> Result<Vec<ProjectField>> {
        let nodes: Vec<FieldNode> = self
            .paginate("ProjectFields", FIELDS_QUERY, project_id)
            .await?;
        Ok(nodes.into_iter().map(ProjectField::from).collect())
    }

    /// All items of a project, in project order
    pub async fn project_items(&self, project_id: &str) -> Result<Vec<ProjectItem>> {
        let nodes: Vec<ItemNode> = self
            .paginate("ProjectItems", ITEMS_QUERY, project_id)
            .await?;
        Ok(nodes.into_iter().map(ProjectItem::from).collect())
    }

    /// All saved views of a project
    pub async fn project_views(&self, project_id: &str) -> Result<Vec<ProjectView>> {
        self.paginate("ProjectViews", VIEWS_QUERY, project_id).await
    }

    /// A project's short description
    pub async fn project_description(&self, project_id: &str) -> Result<Option<String>> {
        let data: NodeData<DetailsNode> = self
            .query("ProjectDetails", DETAILS_QUERY, json!({ "id": project_id }))
            .await?;
        let node = data
            .node
            .ok_or_else(|| Error::NotFound(format!("project {}", project_id)))?;
        Ok(node.short_description.filter(|d| !d.is_empty()))
    }
}
