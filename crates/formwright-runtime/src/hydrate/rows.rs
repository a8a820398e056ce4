//! Row and field lookup shared by the processors.

use formwright_graph::JsonPath;
use serde_json::Value;

use crate::state::FormState;

/// Field of a row: a direct key first, then a dot-path. Null is absent.
pub(super) fn lookup<'v>(row: &'v Value, key: &str) -> Option<&'v Value> {
  if let Some(found) = row.get(key)
    && !found.is_null()
  {
    return Some(found);
  }
  JsonPath::parse(key).ok()?.first(row)
}

/// Rows of a source value. A single object or scalar is one row.
pub(super) fn rows_of(value: &Value) -> Vec<&Value> {
  match value {
    Value::Array(items) => items.iter().filter(|item| !item.is_null()).collect(),
    Value::Null => Vec::new(),
    other => vec![other],
  }
}

/// First row that defines `field`.
pub(super) fn first_field<'v>(source: &'v Value, field: &str) -> Option<&'v Value> {
  rows_of(source).into_iter().find_map(|row| lookup(row, field))
}

/// Result of an API source navigated through nested keys.
pub(super) fn api_value<'s>(state: &'s FormState, source: &str, path: &[String]) -> Option<&'s Value> {
  let root = state.api_result(source)?;
  JsonPath::from_keys(path.iter().map(String::as_str)).first(root)
}

/// String form used for option labels and values.
pub(super) fn stringify(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    Value::Null => String::new(),
    other => other.to_string(),
  }
}
