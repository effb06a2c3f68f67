//! Project export into a portable bundle

use ghproj_core::{
    Bundle, BundleField, BundleItem, BundleMetadata, BundleProject, BundleView, CancelFlag,
    ProjectHandle,
};
use tracing::{debug, info};

use crate::{GitHubClient, Result};

/// Which collections to include in an export
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportOptions {
    pub include_items: bool,
    pub include_fields: bool,
    pub include_views: bool,
}

impl ExportOptions {
    /// Include every collection the bundle format knows about
    pub fn all() -> Self {
        Self {
            include_items: true,
            include_fields: true,
            include_views: true,
        }
    }
}

/// Build a bundle for `project`
///
/// Metadata and project details are always present; each collection is set
/// only when requested. Any failed read aborts the whole export.
pub async fn export_bundle(
    client: &GitHubClient,
    project: &ProjectHandle,
    options: &ExportOptions,
    cancel: &CancelFlag,
) -> Result<Bundle> {
    info!(project = %project, ?options, "Exporting project");

    let exported_by = client.viewer_login().await?;
    cancel.check()?;
    let description = client.project_description(project.id()).await?;
    cancel.check()?;

    let mut bundle = Bundle::new(
        BundleMetadata::current(exported_by),
        BundleProject {
            id: project.id().to_string(),
            title: project.title().to_string(),
            description,
            url: project.url().to_string(),
            owner: project.owner().to_string(),
            number: project.number(),
            closed: project.closed(),
        },
    );

    if options.include_fields {
        let fields = client.project_fields(project.id()).await?;
        debug!(count = fields.len(), "Exported fields");
        bundle.fields = Some(fields.into_iter().map(BundleField::from).collect());
        cancel.check()?;
    }

    if options.include_items {
        let items = client.project_items(project.id()).await?;
        debug!(count = items.len(), "Exported items");
        bundle.items = Some(items.into_iter().map(BundleItem::from).collect());
        cancel.check()?;
    }

    if options.include_views {
        let views = client.project_views(project.id()).await?;
        debug!(count = views.len(), "Exported views");
        bundle.views = Some(views.into_iter().map(BundleView::from).collect());
    }

    info!(
        items = bundle.items.as_ref().map(Vec::len),
        fields = bundle.fields.as_ref().map(Vec::len),
        views = bundle.views.as_ref().map(Vec::len),
        "Export complete"
    );
    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{query_error, MockTransport};
    use ghproj_core::bundle::FORMAT_VERSION;
    use ghproj_core::{BundleFormat, OwnerKind};
    use serde_json::{json, Value};

    fn handle() -> ProjectHandle {
        ProjectHandle::resolved(
            "PVT_1",
            7,
            "octocat",
            OwnerKind::User,
            "Launch",
            "https://github.com/users/octocat/projects/7",
            false,
        )
    }

    fn page(key: &str, nodes: Vec<Value>) -> Value {
        json!({"node": {key: {
            "nodes": nodes,
            "pageInfo": {"hasNextPage": false, "endCursor": null}
        }}})
    }

    fn project_mock() -> std::sync::Arc<MockTransport> {
        MockTransport::new(|op, _| match op {
            "Viewer" => Ok(json!({"viewer": {"login": "octocat"}})),
            "ProjectDetails" => Ok(json!({"node": {"shortDescription": "Q3 launch"}})),
            "ProjectFields" => Ok(page(
                "fields",
                vec![
                    json!({"id": "F1", "name": "Title", "dataType": "TITLE"}),
                    json!({"id": "F2", "name": "Status", "dataType": "SINGLE_SELECT",
                           "options": [{"id": "o1", "name": "Todo", "color": "GRAY", "description": ""}]}),
                    json!({"id": "F3", "name": "Points", "dataType": "NUMBER"}),
                ],
            )),
            "ProjectItems" => Ok(page(
                "items",
                (1..=10)
                    .map(|n| {
                        json!({
                            "id": format!("I{}", n),
                            "content": {"__typename": "DraftIssue", "title": format!("Task {}", n)},
                            "fieldValues": {"nodes": [
                                {"__typename": "ProjectV2ItemFieldNumberValue", "number": n, "field": {"name": "Points"}}
                            ]}
                        })
                    })
                    .collect(),
            )),
            "ProjectViews" => Ok(page(
                "views",
                vec![
                    json!({"id": "V1", "name": "Table", "layout": "TABLE_LAYOUT"}),
                    json!({"id": "V2", "name": "Board", "layout": "BOARD_LAYOUT"}),
                ],
            )),
            other => panic!("unexpected operation {other}"),
        })
    }

    #[tokio::test]
    async fn test_export_everything() {
        let client = GitHubClient::with_transport(project_mock());

        let bundle = export_bundle(&client, &handle(), &ExportOptions::all(), &CancelFlag::new())
            .await
            .unwrap();

        assert_eq!(bundle.metadata.exported_by, "octocat");
        assert_eq!(bundle.metadata.format_version, FORMAT_VERSION);
        assert_eq!(bundle.project.title, "Launch");
        assert_eq!(bundle.project.description.as_deref(), Some("Q3 launch"));
        assert_eq!(bundle.fields.as_ref().unwrap().len(), 3);
        assert_eq!(bundle.items.as_ref().unwrap().len(), 10);
        assert_eq!(bundle.views.as_ref().unwrap().len(), 2);

        let items = bundle.items.as_ref().unwrap();
        assert_eq!(items[4].field_values["Points"].to_string(), "5");
    }

    #[tokio::test]
    async fn test_omitted_collections_stay_absent() {
        let mock = project_mock();
        let client = GitHubClient::with_transport(mock.clone());
        let options = ExportOptions {
            include_fields: true,
            ..Default::default()
        };

        let bundle = export_bundle(&client, &handle(), &options, &CancelFlag::new())
            .await
            .unwrap();
        assert!(bundle.items.is_none());
        assert!(bundle.views.is_none());
        assert_eq!(mock.count("ProjectItems"), 0);

        let encoded = bundle.encode(BundleFormat::Json).unwrap();
        let doc: Value = serde_json::from_str(&encoded).unwrap();
        assert!(doc.get("items").is_none());
        assert!(doc.get("views").is_none());
        assert!(doc.get("fields").is_some());
    }

    #[tokio::test]
    async fn test_no_collections_requested() {
        let mock = project_mock();
        let client = GitHubClient::with_transport(mock.clone());

        let bundle = export_bundle(
            &client,
            &handle(),
            &ExportOptions::default(),
            &CancelFlag::new(),
        )
        .await
        .unwrap();

        assert_eq!(mock.operations(), vec!["Viewer", "ProjectDetails"]);
        let encoded = bundle.encode(BundleFormat::Json).unwrap();
        let doc: Value = serde_json::from_str(&encoded).unwrap();
        let keys: Vec<&str> = doc
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, vec!["metadata", "project"]);
    }

    #[tokio::test]
    async fn test_fetch_failure_aborts_export() {
        let client = GitHubClient::with_transport(MockTransport::new(|op, _| match op {
            "Viewer" => Ok(json!({"viewer": {"login": "octocat"}})),
            "ProjectDetails" => Ok(json!({"node": {"shortDescription": null}})),
            "ProjectFields" => Ok(json!({"node": {"fields": {
                "nodes": [],
                "pageInfo": {"hasNextPage": false, "endCursor": null}
            }}})),
            _ => Err(query_error(op, "timeout")),
        }));

        let err = export_bundle(&client, &handle(), &ExportOptions::all(), &CancelFlag::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("ProjectItems failed"));
    }

    #[tokio::test]
    async fn test_cancelled_before_collections() {
        let mock = project_mock();
        let client = GitHubClient::with_transport(mock.clone());
        let cancel = CancelFlag::new();
        cancel.cancel();

        let err = export_bundle(&client, &handle(), &ExportOptions::all(), &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(mock.count("ProjectFields"), 0);
    }
}
