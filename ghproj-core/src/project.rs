//! Resolved project handles

use std::fmt;

use serde::{Deserialize, Serialize};

/// Whether a project owner is a user or an organization account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
    User,
    Organization,
}

impl OwnerKind {
    /// GraphQL root field used to look up this kind of owner
    pub fn graphql_field(&self) -> &'static str {
        match self {
            OwnerKind::User => "user",
            OwnerKind::Organization => "organization",
        }
    }
}

impl fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.graphql_field())
    }
}

/// A project that has been resolved against the API
///
/// Immutable once built. Only the owner resolver should construct one, so a
/// handle always refers to a project that existed at resolution time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectHandle {
    id: String,
    number: u64,
    owner: String,
    owner_kind: OwnerKind,
    title: String,
    url: String,
    closed: bool,
}

impl ProjectHandle {
    /// Build a handle from a successful resolution
    pub fn resolved(
        id: impl Into<String>,
        number: u64,
        owner: impl Into<String>,
        owner_kind: OwnerKind,
        title: impl Into<String>,
        url: impl Into<String>,
        closed: bool,
    ) -> Self {
        Self {
            id: id.into(),
            number,
            owner: owner.into(),
            owner_kind,
            title: title.into(),
            url: url.into(),
            closed,
        }
    }

    /// GraphQL node id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Project number within the owner
    pub fn number(&self) -> u64 {
        self.number
    }

    /// Owner login
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Owner account kind
    pub fn owner_kind(&self) -> OwnerKind {
        self.owner_kind
    }

    /// Project title
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Web URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether the project is closed
    pub fn closed(&self) -> bool {
        self.closed
    }
}

impl fmt::Display for ProjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({})", self.owner, self.number, self.title)
    }
}
