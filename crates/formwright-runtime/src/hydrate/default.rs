//! Plain value components.

use formwright_config::Component;
use formwright_graph::JsonPath;
use serde_json::Value;
use tracing::debug;

use super::Hydrator;
use super::rows::{api_value, first_field, lookup};
use crate::error::RenderError;

/// Resolve `defaultValue` from the table, then the API source, then the
/// session.
///
/// An API value only overrides the table value when it is non-null.
pub(super) fn hydrate(hydrator: &Hydrator<'_>, component: &mut Component) -> Result<(), RenderError> {
  let field = component.field.as_deref().unwrap_or(&component.key);
  let mut value = None;

  if let Some(table) = &component.table
    && let Some(source) = lookup(hydrator.graph(), table)
  {
    value = match source {
      Value::Array(_) | Value::Object(_) => first_field(source, field).cloned(),
      scalar => Some(scalar.clone()),
    };
  }

  if let Some(name) = &component.api_source
    && let Some(found) = api_value(hydrator.state(), name, &component.data_path)
  {
    let found = match &component.value_key {
      Some(value_key) => first_field(found, value_key),
      None => Some(found),
    };
    if let Some(found) = found {
      value = Some(found.clone());
    }
  }

  if let Some(Value::String(raw)) = &value
    && let Some(path) = raw.strip_prefix("session.")
  {
    let session = JsonPath::parse(path)
      .ok()
      .and_then(|path| path.first(hydrator.state().session()).cloned());
    if session.is_none() {
      debug!(component = %component.key, path = %raw, "session_value_missing");
    }
    value = session;
  }

  if let Some(value) = value {
    component.default_value = Some(value);
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::state::FormState;
  use formwright_config::ComponentType;
  use formwright_host::StaticDirectory;
  use serde_json::json;
  use std::collections::HashMap;

  fn hydrate_with(state: &FormState, graph: &Value, component: &mut Component) {
    let directory = StaticDirectory::default();
    let transforms = HashMap::new();
    let hydrator = Hydrator::new(state, graph, &directory, &transforms);
    hydrate(&hydrator, component).unwrap();
  }

  fn textfield(value: Value) -> Component {
    let mut value = value;
    value["type"] = json!("textfield");
    serde_json::from_value(value).unwrap()
  }

  #[test]
  fn test_table_value_from_rows() {
    let graph = json!({
      "employees": [{ "id": 1 }, { "id": 2, "email": "b@x.io" }]
    });
    let mut component = textfield(json!({ "key": "email", "table": "employees" }));
    hydrate_with(&FormState::default(), &graph, &mut component);
    assert_eq!(component.default_value, Some(json!("b@x.io")));
  }

  #[test]
  fn test_table_nested_field() {
    let graph = json!({ "org": { "address": { "city": "Oslo" } } });
    let mut component = textfield(json!({
      "key": "city",
      "table": "org",
      "field": "address.city"
    }));
    hydrate_with(&FormState::default(), &graph, &mut component);
    assert_eq!(component.default_value, Some(json!("Oslo")));
  }

  #[test]
  fn test_api_value_overrides_table() {
    let graph = json!({ "org": { "name": "from table" } });
    let mut state = FormState::default();
    state.record_api_result("profile", json!({ "data": [{ "name": "from api" }] }));

    let mut component = textfield(json!({
      "key": "name",
      "table": "org",
      "apiSource": "profile",
      "dataPath": ["data"],
      "valueKey": "name"
    }));
    hydrate_with(&state, &graph, &mut component);
    assert_eq!(component.default_value, Some(json!("from api")));
  }

  #[test]
  fn test_null_api_value_keeps_table_value() {
    let graph = json!({ "org": { "name": "from table" } });
    let mut state = FormState::default();
    state.record_api_result("profile", json!({ "name": null }));

    let mut component = textfield(json!({
      "key": "name",
      "table": "org",
      "apiSource": "profile",
      "valueKey": "name"
    }));
    hydrate_with(&state, &graph, &mut component);
    assert_eq!(component.default_value, Some(json!("from table")));
  }

  #[test]
  fn test_session_substitution() {
    let graph = json!({ "defaults": { "owner": "session.user.email" } });
    let state = FormState::new(json!({ "user": { "email": "me@x.io" } }));

    let mut component = Component::new("owner", ComponentType::Other("email".to_string()));
    component.table = Some("defaults".to_string());
    hydrate_with(&state, &graph, &mut component);
    assert_eq!(component.default_value, Some(json!("me@x.io")));
  }

  #[test]
  fn test_nothing_resolved_keeps_declared_default() {
    let mut component = textfield(json!({ "key": "x", "table": "missing", "defaultValue": "keep" }));
    hydrate_with(&FormState::default(), &json!({}), &mut component);
    assert_eq!(component.default_value, Some(json!("keep")));
  }
}
