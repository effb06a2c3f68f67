//! Owner-type resolution
//!
//! Projects and owner ids are looked up through `user(login:)` or
//! `organization(login:)` depending on the account kind, which the caller
//! usually does not know. The user shape is tried first and the organization
//! shape only when it fails, costing one extra round trip for organization
//! owners. When both fail the user-path error is reported, since personal
//! projects are the common case. Nothing is cached between runs.

use std::future::Future;

use ghproj_core::{OwnerKind, ProjectHandle};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::{Error, GitHubClient, Result};

/// Result of trying both owner kinds
#[derive(Debug)]
pub enum OwnerResolution<T> {
    /// Found under a user account
    User(T),
    /// Found under an organization account
    Organization(T),
    /// Neither lookup succeeded
    NotFound { user_error: Error, org_error: Error },
}

impl<T> OwnerResolution<T> {
    /// Owner kind that produced the value, if any
    pub fn kind(&self) -> Option<OwnerKind> {
        match self {
            OwnerResolution::User(_) => Some(OwnerKind::User),
            OwnerResolution::Organization(_) => Some(OwnerKind::Organization),
            OwnerResolution::NotFound { .. } => None,
        }
    }
}

/// Run `lookup` as a user, then as an organization
pub async fn resolve_with_fallback<T, F, Fut>(lookup: F) -> OwnerResolution<T>
where
    F: Fn(OwnerKind) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let user_error = match lookup(OwnerKind::User).await {
        Ok(value) => return OwnerResolution::User(value),
        Err(e) => e,
    };
    debug!(error = %user_error, "User lookup failed, trying organization");

    match lookup(OwnerKind::Organization).await {
        Ok(value) => OwnerResolution::Organization(value),
        Err(org_error) => OwnerResolution::NotFound {
            user_error,
            org_error,
        },
    }
}

/// An owner account's node id, used when creating projects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerNode {
    pub id: String,
    pub login: String,
    pub kind: OwnerKind,
}

#[derive(Debug, Deserialize)]
struct ProjectLookup {
    #[serde(rename = "user", alias = "organization")]
    owner: Option<OwnerProjects>,
}

#[derive(Debug, Deserialize)]
struct OwnerProjects {
    #[serde(rename = "projectV2")]
    project: Option<ProjectNode>,
}

#[derive(Debug, Deserialize)]
struct ProjectNode {
    id: String,
    number: u64,
    title: String,
    url: String,
    closed: bool,
}

#[derive(Debug, Deserialize)]
struct OwnerLookup {
    #[serde(rename = "user", alias = "organization")]
    owner: Option<OwnerIdNode>,
}

#[derive(Debug, Deserialize)]
struct OwnerIdNode {
    id: String,
    login: String,
}

fn project_query(kind: OwnerKind) -> (&'static str, String) {
    let operation = match kind {
        OwnerKind::User => "UserProject",
        OwnerKind::Organization => "OrganizationProject",
    };
    let query = format!(
        r#"
        query {operation}($login: String!, $number: Int!) {{
            {field}(login: $login) {{
                projectV2(number: $number) {{
                    id
                    number
                    title
                    url
                    closed
                }}
            }}
        }}
        "#,
        operation = operation,
        field = kind.graphql_field(),
    );
    (operation, query)
}

fn owner_query(kind: OwnerKind) -> (&'static str, String) {
    let operation = match kind {
        OwnerKind::User => "UserOwner",
        OwnerKind::Organization => "OrganizationOwner",
    };
    let query = format!(
        r#"
        query {operation}($login: String!) {{
            {field}(login: $login) {{
                id
                login
            }}
        }}
        "#,
        operation = operation,
        field = kind.graphql_field(),
    );
    (operation, query)
}

impl GitHubClient {
    /// Look up a project under one specific owner kind
    async fn project_as(&self, owner: &str, number: u64, kind: OwnerKind) -> Result<ProjectHandle> {
        let (operation, query) = project_query(kind);
        let data: ProjectLookup = self
            .query(
                operation,
                &query,
                json!({ "login": owner, "number": number }),
            )
            .await?;

        let project = data
            .owner
            .and_then(|o| o.project)
            .ok_or_else(|| Error::NotFound(format!("{} project {}/{}", kind, owner, number)))?;

        Ok(ProjectHandle::resolved(
            project.id,
            project.number,
            owner,
            kind,
            project.title,
            project.url,
            project.closed,
        ))
    }

    /// Resolve `owner/number` to a project, trying user then organization
    pub async fn resolve_project_kind(
        &self,
        owner: &str,
        number: u64,
    ) -> OwnerResolution<ProjectHandle> {
        resolve_with_fallback(|kind| self.project_as(owner, number, kind)).await
    }

    /// Resolve `owner/number` to a project handle
    pub async fn resolve_project(&self, owner: &str, number: u64) -> Result<ProjectHandle> {
        match self.resolve_project_kind(owner, number).await {
            OwnerResolution::User(handle) | OwnerResolution::Organization(handle) => {
                info!(
                    owner,
                    number,
                    kind = %handle.owner_kind(),
                    title = handle.title(),
                    "Resolved project"
                );
                Ok(handle)
            }
            OwnerResolution::NotFound {
                user_error,
                org_error,
            } => {
                debug!(error = %org_error, "Organization lookup failed too");
                Err(Error::ProjectNotFound {
                    owner: owner.to_string(),
                    number,
                    cause: user_error.to_string(),
                })
            }
        }
    }

    async fn owner_as(&self, login: &str, kind: OwnerKind) -> Result<OwnerNode> {
        let (operation, query) = owner_query(kind);
        let data: OwnerLookup = self
            .query(operation, &query, json!({ "login": login }))
            .await?;

        let node = data
            .owner
            .ok_or_else(|| Error::NotFound(format!("{} {}", kind, login)))?;

        Ok(OwnerNode {
            id: node.id,
            login: node.login,
            kind,
        })
    }

    /// Resolve an owner login to its node id, trying user then organization
    pub async fn resolve_owner(&self, login: &str) -> Result<OwnerNode> {
        match resolve_with_fallback(|kind| self.owner_as(login, kind)).await {
            OwnerResolution::User(node) | OwnerResolution::Organization(node) => {
                debug!(login, kind = %node.kind, "Resolved owner");
                Ok(node)
            }
            OwnerResolution::NotFound { user_error, .. } => Err(Error::OwnerNotFound {
                owner: login.to_string(),
                cause: user_error.to_string(),
            }),
        }
    }
}
