use std::collections::BTreeMap;

use async_trait::async_trait;
use formwright_config::QueryDef;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::HostError;
use crate::http::read_body;

/// Executes the primary structured query of a render.
#[async_trait]
pub trait QueryClient: Send + Sync {
  /// Run the query and return its result document.
  async fn execute(&self, query: &QueryDef) -> Result<serde_json::Value, HostError>;
}

/// GraphQL-over-HTTP [`QueryClient`].
#[derive(Debug, Clone)]
pub struct GraphQlClient {
  client: Client,
  endpoint: Url,
  headers: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
  #[serde(default)]
  data: Option<serde_json::Value>,
  #[serde(default)]
  errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
  message: String,
}

impl GraphQlClient {
  pub fn new(endpoint: Url) -> Self {
    Self {
      client: Client::new(),
      endpoint,
      headers: BTreeMap::new(),
    }
  }

  /// Add a header sent with every query, e.g. an admin secret.
  pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.headers.insert(key.into(), value.into());
    self
  }
}

/// Extract `data` from a GraphQL response body.
fn into_data(body: serde_json::Value) -> Result<serde_json::Value, HostError> {
  let response: GraphQlResponse = serde_json::from_value(body)?;

  if !response.errors.is_empty() {
    let messages: Vec<String> = response.errors.into_iter().map(|e| e.message).collect();
    return Err(HostError::Query {
      message: messages.join("; "),
    });
  }

  response.data.ok_or_else(|| HostError::Query {
    message: "response contained no data".to_string(),
  })
}

#[async_trait]
impl QueryClient for GraphQlClient {
  async fn execute(&self, query: &QueryDef) -> Result<serde_json::Value, HostError> {
    debug!(endpoint = %self.endpoint, "primary_query");

    let mut builder = self.client.post(self.endpoint.clone());
    for (key, value) in &self.headers {
      builder = builder.header(key, value);
    }

    let response = builder
      .json(&serde_json::json!({
        "query": query.query,
        "variables": query.variables,
      }))
      .send()
      .await?;

    into_data(read_body(response).await?)
  }
}

/// A [`QueryClient`] returning a fixed document, e.g. graph data loaded from
/// a file.
#[derive(Debug, Clone, Default)]
pub struct StaticQuery {
  document: serde_json::Value,
}

impl StaticQuery {
  pub fn new(document: serde_json::Value) -> Self {
    Self { document }
  }
}

#[async_trait]
impl QueryClient for StaticQuery {
  async fn execute(&self, _query: &QueryDef) -> Result<serde_json::Value, HostError> {
    Ok(self.document.clone())
  }
}
