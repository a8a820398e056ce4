//! Readiness predicates.

use formwright_graph::{Dependencies, JsonPath};
use serde_json::Value;

use crate::state::FormState;

/// True iff the value at `path` in the graph data is defined, non-null and
/// not an empty string.
pub fn graph_ready(graph: &Value, path: &str) -> bool {
  let Ok(path) = JsonPath::parse(path) else {
    return false;
  };
  match path.first(graph) {
    None => false,
    Some(Value::String(s)) => !s.is_empty(),
    Some(_) => true,
  }
}

/// True iff the source has a result and, if it is an array, it is not empty.
pub fn api_ready(state: &FormState, name: &str) -> bool {
  match state.api_result(name) {
    None => false,
    Some(Value::Array(items)) => !items.is_empty(),
    Some(_) => true,
  }
}

/// True iff every API and graph dependency is ready.
pub fn is_ready(deps: &Dependencies, state: &FormState, graph: &Value) -> bool {
  deps.api.iter().all(|name| api_ready(state, name))
    && deps.graph.iter().all(|path| graph_ready(graph, path))
}

/// The API names and graph paths that are not ready yet.
pub fn missing_dependencies(
  deps: &Dependencies,
  state: &FormState,
  graph: &Value,
) -> (Vec<String>, Vec<String>) {
  let api = deps
    .api
    .iter()
    .filter(|name| !api_ready(state, name))
    .cloned()
    .collect();
  let graph = deps
    .graph
    .iter()
    .filter(|path| !graph_ready(graph, path))
    .cloned()
    .collect();
  (api, graph)
}
