//! Scripted transport for unit tests

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::transport::Transport;
use crate::{Error, Result};

type Handler = dyn Fn(&str, &Value) -> Result<Value> + Send + Sync;

/// Transport that answers from a closure and records every call
pub struct MockTransport {
    handler: Box<Handler>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl MockTransport {
    pub fn new(
        handler: impl Fn(&str, &Value) -> Result<Value> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Every `(operation, variables)` pair seen so far
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    /// Operation names in call order
    pub fn operations(&self) -> Vec<String> {
        self.calls().into_iter().map(|(op, _)| op).collect()
    }

    /// Number of calls made for one operation
    pub fn count(&self, operation: &str) -> usize {
        self.calls().iter().filter(|(op, _)| op == operation).count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, operation: &str, _query: &str, variables: Value) -> Result<Value> {
        self.calls
            .lock()
            .unwrap()
            .push((operation.to_string(), variables.clone()));
        (self.handler)(operation, &variables)
    }
}

/// A GraphQL-level failure as the HTTP transport would report it
pub fn query_error(operation: &str, message: &str) -> Error {
    Error::Query {
        operation: operation.to_string(),
        message: message.to_string(),
    }
}
