use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::HostError;
use crate::http::{parse_method, read_body, resolve_url};

/// A descriptor with every reference substituted, ready to send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRequest {
  pub method: String,
  pub url: String,
  #[serde(default)]
  pub path: BTreeMap<String, String>,
  #[serde(default)]
  pub query: BTreeMap<String, String>,
  #[serde(default)]
  pub headers: BTreeMap<String, String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub data: Option<serde_json::Value>,
}

/// Executes named API source calls.
#[async_trait]
pub trait ApiClient: Send + Sync {
  /// Perform one call and return the decoded response body.
  async fn call(&self, source: &str, request: &ResolvedRequest)
  -> Result<serde_json::Value, HostError>;
}

/// reqwest-backed [`ApiClient`].
#[derive(Debug, Clone)]
pub struct HttpApiClient {
  client: Client,
  base_url: Option<Url>,
}

impl HttpApiClient {
  pub fn new(base_url: Option<Url>) -> Self {
    Self::with_client(Client::new(), base_url)
  }

  pub fn with_client(client: Client, base_url: Option<Url>) -> Self {
    Self { client, base_url }
  }

  /// Build the final URL: path parameters, base URL, then query string.
  pub fn build_url(&self, request: &ResolvedRequest) -> Result<Url, HostError> {
    let raw = substitute_path(&request.url, &request.path);
    let mut url = resolve_url(self.base_url.as_ref(), &raw)?;

    if !request.query.is_empty() {
      let mut pairs = url.query_pairs_mut();
      for (key, value) in &request.query {
        pairs.append_pair(key, value);
      }
    }

    Ok(url)
  }
}

/// Replace `{name}` placeholders and `:name` segments with path values.
fn substitute_path(url: &str, path: &BTreeMap<String, String>) -> String {
  if path.is_empty() {
    return url.to_string();
  }

  let mut out = url.to_string();
  for (name, value) in path {
    out = out.replace(&format!("{{{}}}", name), value);
  }

  let (head, tail) = match out.find('?') {
    Some(pos) => out.split_at(pos),
    None => (out.as_str(), ""),
  };
  let head = head
    .split('/')
    .map(|segment| {
      segment
        .strip_prefix(':')
        .and_then(|name| path.get(name))
        .map(String::as_str)
        .unwrap_or(segment)
    })
    .collect::<Vec<_>>()
    .join("/");

  format!("{}{}", head, tail)
}

#[async_trait]
impl ApiClient for HttpApiClient {
  async fn call(
    &self,
    source: &str,
    request: &ResolvedRequest,
  ) -> Result<serde_json::Value, HostError> {
    let method = parse_method(&request.method)?;
    let url = self.build_url(request)?;

    debug!(source = %source, method = %method, url = %url, "api_request");

    let mut builder = self.client.request(method, url);
    for (key, value) in &request.headers {
      builder = builder.header(key, value);
    }
    if let Some(data) = &request.data {
      builder = builder.json(data);
    }

    let response = builder.send().await?;
    read_body(response).await
  }
}
