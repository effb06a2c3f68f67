//! GitHub API client

use std::sync::Arc;

use ghproj_core::config::GitHubConfig;
use ghproj_core::Credentials;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::transport::{HttpTransport, Transport};
use crate::{Error, Result};

/// GitHub GraphQL client
///
/// Cheap to clone; clones share the underlying transport.
#[derive(Clone)]
pub struct GitHubClient {
    transport: Arc<dyn Transport>,
}

impl GitHubClient {
    /// Create a client that talks HTTPS using the given credentials
    pub fn new(credentials: &Credentials, config: &GitHubConfig) -> Result<Self> {
        let transport = HttpTransport::new(credentials, config)?;
        info!(api_url = %config.api_url, "Created GitHub client");
        Ok(Self::with_transport(Arc::new(transport)))
    }

    /// Create a client over any transport
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Execute a GraphQL document and return the raw `data` object
    pub async fn execute(&self, operation: &str, query: &str, variables: Value) -> Result<Value> {
        self.transport.execute(operation, query, variables).await
    }

    /// Execute a GraphQL document and deserialize its `data` object
    pub async fn query<T: DeserializeOwned>(
        &self,
        operation: &str,
        query: &str,
        variables: Value,
    ) -> Result<T> {
        let data = self.execute(operation, query, variables).await?;
        serde_json::from_value(data).map_err(|e| Error::parse(operation, e.to_string()))
    }

    /// Login of the authenticated user
    pub async fn viewer_login(&self) -> Result<String> {
        #[derive(Deserialize)]
        struct ViewerData {
            viewer: Viewer,
        }

        #[derive(Deserialize)]
        struct Viewer {
            login: String,
        }

        debug!("Fetching viewer login");
        let data: ViewerData = self
            .query("Viewer", "query Viewer { viewer { login } }", json!({}))
            .await?;
        Ok(data.viewer.login)
    }
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;

    #[tokio::test]
    async fn test_viewer_login() {
        let mock = MockTransport::new(|op, _| match op {
            "Viewer" => Ok(json!({"viewer": {"login": "octocat"}})),
            other => panic!("unexpected operation {other}"),
        });
        let client = GitHubClient::with_transport(mock.clone());

        assert_eq!(client.viewer_login().await.unwrap(), "octocat");
        assert_eq!(mock.operations(), vec!["Viewer"]);
    }

    #[tokio::test]
    async fn test_shape_mismatch_names_operation() {
        let mock = MockTransport::new(|_, _| Ok(json!({"viewer": {}})));
        let client = GitHubClient::with_transport(mock);

        let err = client.viewer_login().await.unwrap_err();
        assert!(err.to_string().contains("Viewer"));
    }
}
