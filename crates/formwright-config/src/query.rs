use serde::{Deserialize, Serialize};

/// The primary structured query executed once per render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDef {
  /// Query text, e.g. a GraphQL document.
  pub query: String,

  #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
  pub variables: serde_json::Map<String, serde_json::Value>,
}
