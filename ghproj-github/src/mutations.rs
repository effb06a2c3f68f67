//! Project mutations shared by import and bulk editing

use chrono::NaiveDate;
use ghproj_core::{FieldDataType, FieldValue, SelectOption, ViewLayout};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::project::{FieldNode, ProjectField};
use crate::{Error, GitHubClient, Result};

/// Color used for imported single-select options that carry none
const DEFAULT_OPTION_COLOR: &str = "GRAY";

const FIELD_SELECTION: &str = r#"
    ... on ProjectV2FieldCommon { id name dataType }
    ... on ProjectV2SingleSelectField { options { id name color description } }
"#;

/// A typed value for `updateProjectV2ItemFieldValue`
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValueInput {
    Text(String),
    Number(f64),
    Date(String),
    SingleSelectOptionId(String),
    IterationId(String),
}

impl FieldValueInput {
    /// Convert a scalar into the input shape the field's type expects
    pub fn for_field(field: &ProjectField, value: &FieldValue) -> ghproj_core::Result<Self> {
        let invalid = |reason: String| {
            ghproj_core::Error::Validation(format!(
                "Invalid value '{}' for field '{}': {}",
                value, field.name, reason
            ))
        };

        match field.data_type {
            FieldDataType::Text => Ok(FieldValueInput::Text(value.to_string())),
            FieldDataType::Number => match value {
                FieldValue::Number(n) => Ok(FieldValueInput::Number(*n)),
                FieldValue::Text(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(FieldValueInput::Number)
                    .map_err(|_| invalid("expected a number".to_string())),
            },
            FieldDataType::Date => {
                let text = value.to_string();
                NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
                    .map(|d| FieldValueInput::Date(d.format("%Y-%m-%d").to_string()))
                    .map_err(|_| invalid("expected a date in YYYY-MM-DD form".to_string()))
            }
            FieldDataType::SingleSelect => {
                let name = value.to_string();
                field
                    .option_named(&name)
                    .map(|o| FieldValueInput::SingleSelectOptionId(o.id.clone()))
                    .ok_or_else(|| {
                        let known: Vec<&str> = field.options.iter().map(|o| o.name.as_str()).collect();
                        invalid(format!("no such option (available: {})", known.join(", ")))
                    })
            }
            FieldDataType::Iteration => {
                let title = value.to_string();
                field
                    .iteration_titled(&title)
                    .map(|i| FieldValueInput::IterationId(i.id.clone()))
                    .ok_or_else(|| invalid("no such iteration".to_string()))
            }
            other => Err(ghproj_core::Error::Validation(format!(
                "Field '{}' has type {:?} and cannot be set directly",
                field.name, other
            ))),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            FieldValueInput::Text(text) => json!({ "text": text }),
            FieldValueInput::Number(number) => json!({ "number": number }),
            FieldValueInput::Date(date) => json!({ "date": date }),
            FieldValueInput::SingleSelectOptionId(id) => json!({ "singleSelectOptionId": id }),
            FieldValueInput::IterationId(id) => json!({ "iterationId": id }),
        }
    }
}

/// A project returned by `createProjectV2`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedProject {
    pub id: String,
    pub number: u64,
    pub title: String,
    pub url: String,
}

fn option_inputs(options: &[SelectOption]) -> Vec<Value> {
    options
        .iter()
        .map(|o| {
            json!({
                "name": o.name,
                "color": o
                    .color
                    .as_deref()
                    .map(str::to_ascii_uppercase)
                    .unwrap_or_else(|| DEFAULT_OPTION_COLOR.to_string()),
                "description": o.description.clone().unwrap_or_default(),
            })
        })
        .collect()
}

fn missing(operation: &str, what: &str) -> Error {
    Error::parse(operation, format!("response has no {}", what))
}

impl GitHubClient {
    /// Create an empty project owned by `owner_id`
    pub async fn create_project(&self, owner_id: &str, title: &str) -> Result<CreatedProject> {
        #[derive(Deserialize)]
        struct Data {
            #[serde(rename = "createProjectV2")]
            payload: Payload,
        }
        #[derive(Deserialize)]
        struct Payload {
            #[serde(rename = "projectV2")]
            project: Option<CreatedProject>,
        }

        debug!(owner_id, title, "Creating project");
        let data: Data = self
            .query(
                "CreateProject",
                r#"
                mutation CreateProject($ownerId: ID!, $title: String!) {
                    createProjectV2(input: {ownerId: $ownerId, title: $title}) {
                        projectV2 { id number title url }
                    }
                }
                "#,
                json!({ "ownerId": owner_id, "title": title }),
            )
            .await?;

        data.payload
            .project
            .ok_or_else(|| missing("CreateProject", "projectV2"))
    }

    /// Set a project's short description
    pub async fn update_project_description(&self, project_id: &str, description: &str) -> Result<()> {
        self.execute(
            "UpdateProject",
            r#"
            mutation UpdateProject($projectId: ID!, $description: String!) {
                updateProjectV2(input: {projectId: $projectId, shortDescription: $description}) {
                    projectV2 { id }
                }
            }
            "#,
            json!({ "projectId": project_id, "description": description }),
        )
        .await?;
        Ok(())
    }

    /// Create a custom field; single-select fields get `options`
    pub async fn create_field(
        &self,
        project_id: &str,
        name: &str,
        data_type: FieldDataType,
        options: &[SelectOption],
    ) -> Result<ProjectField> {
        #[derive(Deserialize)]
        struct Data {
            #[serde(rename = "createProjectV2Field")]
            payload: Payload,
        }
        #[derive(Deserialize)]
        struct Payload {
            #[serde(rename = "projectV2Field")]
            field: Option<FieldNode>,
        }

        let mut variables = json!({
            "projectId": project_id,
            "name": name,
            "dataType": data_type,
        });
        if data_type == FieldDataType::SingleSelect {
            variables["options"] = Value::Array(option_inputs(options));
        }

        debug!(project_id, name, ?data_type, "Creating field");
        let query = format!(
            r#"
            mutation CreateField(
                $projectId: ID!,
                $name: String!,
                $dataType: ProjectV2CustomFieldType!,
                $options: [ProjectV2SingleSelectFieldOptionInput!]
            ) {{
                createProjectV2Field(input: {{
                    projectId: $projectId,
                    name: $name,
                    dataType: $dataType,
                    singleSelectOptions: $options
                }}) {{
                    projectV2Field {{ {} }}
                }}
            }}
            "#,
            FIELD_SELECTION
        );
        let data: Data = self.query("CreateField", &query, variables).await?;

        data.payload
            .field
            .map(ProjectField::from)
            .ok_or_else(|| missing("CreateField", "projectV2Field"))
    }

    /// Overwrite a single-select field's options
    pub async fn replace_field_options(
        &self,
        field_id: &str,
        options: &[SelectOption],
    ) -> Result<ProjectField> {
        #[derive(Deserialize)]
        struct Data {
            #[serde(rename = "updateProjectV2Field")]
            payload: Payload,
        }
        #[derive(Deserialize)]
        struct Payload {
            #[serde(rename = "projectV2Field")]
            field: Option<FieldNode>,
        }

        let query = format!(
            r#"
            mutation UpdateField($fieldId: ID!, $options: [ProjectV2SingleSelectFieldOptionInput!]) {{
                updateProjectV2Field(input: {{fieldId: $fieldId, singleSelectOptions: $options}}) {{
                    projectV2Field {{ {} }}
                }}
            }}
            "#,
            FIELD_SELECTION
        );
        let data: Data = self
            .query(
                "UpdateField",
                &query,
                json!({ "fieldId": field_id, "options": option_inputs(options) }),
            )
            .await?;

        data.payload
            .field
            .map(ProjectField::from)
            .ok_or_else(|| missing("UpdateField", "projectV2Field"))
    }

    /// Node id of the issue or pull request at `url`
    pub async fn content_id(&self, url: &str) -> Result<String> {
        #[derive(Deserialize)]
        struct Data {
            resource: Option<Resource>,
        }
        #[derive(Deserialize)]
        struct Resource {
            id: Option<String>,
        }

        let data: Data = self
            .query(
                "ContentId",
                r#"
                query ContentId($url: URI!) {
                    resource(url: $url) {
                        ... on Issue { id }
                        ... on PullRequest { id }
                    }
                }
                "#,
                json!({ "url": url }),
            )
            .await?;

        data.resource
            .and_then(|r| r.id)
            .ok_or_else(|| Error::NotFound(format!("issue or pull request at {}", url)))
    }

    /// Add an existing issue or pull request; returns the new item id
    pub async fn add_item_by_content(&self, project_id: &str, content_id: &str) -> Result<String> {
        let data = self
            .execute(
                "AddItem",
                r#"
                mutation AddItem($projectId: ID!, $contentId: ID!) {
                    addProjectV2ItemById(input: {projectId: $projectId, contentId: $contentId}) {
                        item { id }
                    }
                }
                "#,
                json!({ "projectId": project_id, "contentId": content_id }),
            )
            .await?;

        data.pointer("/addProjectV2ItemById/item/id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| missing("AddItem", "item id"))
    }

    /// Add a draft issue; returns the new item id
    pub async fn add_draft_issue(
        &self,
        project_id: &str,
        title: &str,
        body: Option<&str>,
    ) -> Result<String> {
        let data = self
            .execute(
                "AddDraftIssue",
                r#"
                mutation AddDraftIssue($projectId: ID!, $title: String!, $body: String) {
                    addProjectV2DraftIssue(input: {projectId: $projectId, title: $title, body: $body}) {
                        projectItem { id }
                    }
                }
                "#,
                json!({ "projectId": project_id, "title": title, "body": body }),
            )
            .await?;

        data.pointer("/addProjectV2DraftIssue/projectItem/id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| missing("AddDraftIssue", "projectItem id"))
    }

    /// Set one field value on one item
    pub async fn set_item_field_value(
        &self,
        project_id: &str,
        item_id: &str,
        field_id: &str,
        value: &FieldValueInput,
    ) -> Result<()> {
        self.execute(
            "UpdateItemFieldValue",
            r#"
            mutation UpdateItemFieldValue(
                $projectId: ID!, $itemId: ID!, $fieldId: ID!, $value: ProjectV2FieldValue!
            ) {
                updateProjectV2ItemFieldValue(input: {
                    projectId: $projectId, itemId: $itemId, fieldId: $fieldId, value: $value
                }) {
                    projectV2Item { id }
                }
            }
            "#,
            json!({
                "projectId": project_id,
                "itemId": item_id,
                "fieldId": field_id,
                "value": value.to_json(),
            }),
        )
        .await?;
        Ok(())
    }

    /// Create a saved view; returns the view id
    pub async fn create_view(&self, project_id: &str, name: &str, layout: ViewLayout) -> Result<String> {
        let data = self
            .execute(
                "CreateView",
                r#"
                mutation CreateView($projectId: ID!, $name: String!, $layout: ProjectV2ViewLayout!) {
                    createProjectV2View(input: {projectId: $projectId, name: $name, layout: $layout}) {
                        projectV2View { id }
                    }
                }
                "#,
                json!({ "projectId": project_id, "name": name, "layout": layout }),
            )
            .await?;

        data.pointer("/createProjectV2View/projectV2View/id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| missing("CreateView", "projectV2View id"))
    }

    /// Remove an item from a project
    pub async fn delete_item(&self, project_id: &str, item_id: &str) -> Result<()> {
        self.execute(
            "DeleteItem",
            r#"
            mutation DeleteItem($projectId: ID!, $itemId: ID!) {
                deleteProjectV2Item(input: {projectId: $projectId, itemId: $itemId}) {
                    deletedItemId
                }
            }
            "#,
            json!({ "projectId": project_id, "itemId": item_id }),
        )
        .await?;
        Ok(())
    }

    /// Archive an item
    pub async fn archive_item(&self, project_id: &str, item_id: &str) -> Result<()> {
        self.execute(
            "ArchiveItem",
            r#"
            mutation ArchiveItem($projectId: ID!, $itemId: ID!) {
                archiveProjectV2Item(input: {projectId: $projectId, itemId: $itemId}) {
                    item { id }
                }
            }
            "#,
            json!({ "projectId": project_id, "itemId": item_id }),
        )
        .await?;
        Ok(())
    }
}
