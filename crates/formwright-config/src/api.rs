//! API descriptors.
//!
//! Any string inside a descriptor may embed references that are resolved at
//! render time:
//!
//! ```json
//! {
//!   "method": "GET",
//!   "url": "/users/{id}/roles",
//!   "path": { "id": "${api.user.id}" },
//!   "query": { "org": "${graph.organization.code}" },
//!   "in": { "ids": "${graph.members.id}" }
//! }
//! ```
//!
//! Descriptors are immutable as declared; resolution produces derived
//! requests and never mutates the declared descriptor.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

fn default_method() -> String {
  "GET".to_string()
}

/// A named, declaratively configured external HTTP call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiDescriptor {
  #[serde(default = "default_method")]
  pub method: String,

  pub url: String,

  /// Values substituted into `{name}` / `:name` URL segments.
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub path: BTreeMap<String, String>,

  /// Query string parameters. Accepts `params` as an alias.
  #[serde(default, alias = "params", skip_serializing_if = "BTreeMap::is_empty")]
  pub query: BTreeMap<String, String>,

  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub headers: BTreeMap<String, String>,

  /// JSON request body. Whole-string references keep their JSON shape.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub data: Option<serde_json::Value>,

  /// Query parameters aggregated from every value at a reference,
  /// comma-joined instead of fanned out.
  #[serde(default, rename = "in", skip_serializing_if = "BTreeMap::is_empty")]
  pub aggregate: BTreeMap<String, String>,
}

impl ApiDescriptor {
  /// Create a GET descriptor for the given URL.
  pub fn get(url: impl Into<String>) -> Self {
    Self {
      method: default_method(),
      url: url.into(),
      path: BTreeMap::new(),
      query: BTreeMap::new(),
      headers: BTreeMap::new(),
      data: None,
      aggregate: BTreeMap::new(),
    }
  }
}
