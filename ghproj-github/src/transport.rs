//! GraphQL transport
//!
//! Everything above this module talks to GitHub through [`Transport`], which
//! takes an operation name, a query document and variables and returns the
//! response's `data` object.

use std::time::Duration;

use async_trait::async_trait;
use ghproj_core::config::GitHubConfig;
use ghproj_core::Credentials;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::{Error, Result};

/// Longest server-requested wait we are willing to honor
const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Executes GraphQL documents against the API
#[async_trait]
pub trait Transport: Send + Sync {
    /// Run one query or mutation and return its `data` object
    ///
    /// `operation` names the call in errors and logs.
    async fn execute(&self, operation: &str, query: &str, variables: Value) -> Result<Value>;
}

/// GraphQL query response wrapper
#[derive(Debug, Deserialize)]
struct GraphQLResponse {
    data: Option<Value>,
    errors: Option<Vec<GraphQLError>>,
}

/// GraphQL error
#[derive(Debug, Deserialize)]
struct GraphQLError {
    message: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

/// Outcome of a single HTTP attempt
enum Attempt {
    Done(Value),
    Retry { error: Error, wait: Option<Duration> },
    Fail(Error),
}

/// Transport over HTTPS with bearer-token auth and bounded retry
pub struct HttpTransport {
    http: reqwest::Client,
    url: String,
    token: String,
    max_retries: u32,
    retry_base_delay: Duration,
}

impl HttpTransport {
    /// Create a transport from explicit credentials and settings
    pub fn new(credentials: &Credentials, config: &GitHubConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            url: config.api_url.clone(),
            token: credentials.token().to_string(),
            max_retries: config.max_retries,
            retry_base_delay: config.retry_base_delay,
        })
    }

    async fn attempt(&self, operation: &str, body: &Value) -> Attempt {
        let response = match self
            .http
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let error = Error::Http {
                    operation: operation.to_string(),
                    message: e.to_string(),
                };
                return if e.is_timeout() || e.is_connect() || e.is_request() {
                    Attempt::Retry { error, wait: None }
                } else {
                    Attempt::Fail(error)
                };
            }
        };

        let status = response.status();
        if !status.is_success() {
            let wait = retry_after(response.headers());
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response".to_string());
            return classify_status(operation, status, text, wait);
        }

        let parsed: GraphQLResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                return Attempt::Fail(Error::parse(
                    operation,
                    format!("Failed to parse GraphQL response: {}", e),
                ))
            }
        };

        match into_data(operation, parsed) {
            Ok(data) => Attempt::Done(data),
            Err(e) => Attempt::Fail(e),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, operation: &str, query: &str, variables: Value) -> Result<Value> {
        let body = json!({
            "query": query,
            "variables": variables,
            "operationName": operation,
        });

        let mut retries = 0;
        loop {
            debug!(operation, attempt = retries + 1, "Sending GraphQL request");

            match self.attempt(operation, &body).await {
                Attempt::Done(data) => return Ok(data),
                Attempt::Fail(error) => return Err(error),
                Attempt::Retry { error, wait } => {
                    if retries >= self.max_retries {
                        return Err(error);
                    }
                    let delay = wait.unwrap_or_else(|| backoff_delay(self.retry_base_delay, retries));
                    warn!(
                        operation,
                        error = %error,
                        delay_ms = delay.as_millis() as u64,
                        "Transient GitHub failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    retries += 1;
                }
            }
        }
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("url", &self.url)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

/// Exponential backoff: base, 2*base, 4*base, ...
fn backoff_delay(base: Duration, retries: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(retries))
}

fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|secs| Duration::from_secs(secs).min(MAX_RETRY_AFTER))
}

fn classify_status(
    operation: &str,
    status: StatusCode,
    text: String,
    wait: Option<Duration>,
) -> Attempt {
    let http_error = |message: String| Error::Http {
        operation: operation.to_string(),
        message,
    };

    if status == StatusCode::UNAUTHORIZED {
        return Attempt::Fail(Error::Auth(format!("{} rejected the token: {}", operation, text)));
    }
    if status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN && text.to_ascii_lowercase().contains("rate limit"))
    {
        return Attempt::Retry {
            error: Error::RateLimited(format!("{}: {}", operation, text)),
            wait,
        };
    }
    if status.is_server_error() {
        return Attempt::Retry {
            error: http_error(format!("status {}: {}", status, text)),
            wait,
        };
    }

    Attempt::Fail(http_error(format!("status {}: {}", status, text)))
}

/// Turn a decoded response into its data, surfacing GraphQL errors
fn into_data(operation: &str, response: GraphQLResponse) -> Result<Value> {
    if let Some(errors) = response.errors.filter(|e| !e.is_empty()) {
        if errors.iter().any(|e| e.kind.as_deref() == Some("RATE_LIMITED")) {
            return Err(Error::RateLimited(operation.to_string()));
        }
        let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
        return Err(Error::Query {
            operation: operation.to_string(),
            message: messages.join(", "),
        });
    }

    response
        .data
        .ok_or_else(|| Error::parse(operation, "GraphQL response missing data"))
}
