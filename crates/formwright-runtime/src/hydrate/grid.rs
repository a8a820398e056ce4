//! Datagrid and editgrid rows.

use formwright_config::{ColumnDef, Component};
use serde_json::{Map, Value, json};
use tracing::debug;

use super::Hydrator;
use super::rows::{api_value, first_field, lookup, rows_of};
use crate::error::RenderError;

/// Build one row object per source row and store them as `defaultValue`.
///
/// Columns are the keys of the nested components followed by any extra
/// keys declared in `columns`.
pub(super) fn hydrate(hydrator: &Hydrator<'_>, component: &mut Component) -> Result<(), RenderError> {
  let Some(source) = source_rows(hydrator, component) else {
    debug!(component = %component.key, "grid_source_missing");
    return Ok(());
  };

  let mut keys: Vec<&str> = component.components.iter().map(|c| c.key.as_str()).collect();
  for key in component.columns.keys() {
    if !keys.contains(&key.as_str()) {
      keys.push(key);
    }
  }

  let mut rows = Vec::new();
  for (index, row) in rows_of(source).into_iter().enumerate() {
    let mut out = Map::new();
    for key in &keys {
      let column = component.columns.get(*key);
      if let Some(value) = column_value(hydrator, &component.key, key, column, row, index)? {
        out.insert(key.to_string(), value);
      }
    }
    rows.push(Value::Object(out));
  }

  debug!(component = %component.key, rows = rows.len(), "grid_rows_built");
  component.default_value = Some(Value::Array(rows));
  Ok(())
}

/// The API source when it resolves, otherwise the table.
pub(super) fn source_rows<'h>(hydrator: &'h Hydrator<'_>, component: &Component) -> Option<&'h Value> {
  component
    .api_source
    .as_deref()
    .and_then(|name| api_value(hydrator.state(), name, &component.data_path))
    .or_else(|| {
      component
        .table
        .as_deref()
        .and_then(|table| lookup(hydrator.graph(), table))
    })
}

fn column_value(
  hydrator: &Hydrator<'_>,
  grid: &str,
  key: &str,
  column: Option<&ColumnDef>,
  row: &Value,
  index: usize,
) -> Result<Option<Value>, RenderError> {
  let Some(column) = column else {
    return Ok(lookup(row, key).cloned());
  };

  let mut value = match &column.api_source {
    Some(name) => api_value(hydrator.state(), name, &column.data_path).and_then(|found| {
      match &column.value_key {
        Some(value_key) => first_field(found, value_key),
        None => Some(found),
      }
    }),
    None => lookup(row, column.field.as_deref().unwrap_or(key)),
  }
  .cloned();

  if let Some(name) = &column.transform {
    let transform = hydrator
      .transform(name)
      .ok_or_else(|| RenderError::Hydration {
        key: grid.to_string(),
        message: format!("unknown transform '{}' for column '{}'", name, key),
      })?;
    value = Some(transform(value.as_ref().unwrap_or(&Value::Null), row));
  }

  if let Some(template) = &column.template {
    let ctx = json!({
      "row": row,
      "value": value,
      "index": index,
      "session": hydrator.state().session(),
      "values": hydrator.state().values(),
    });
    value = Some(Value::String(hydrator.render(grid, template, &ctx)?));
  }

  Ok(value.filter(|value| !value.is_null()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::hydrate::ColumnTransform;
  use crate::state::FormState;
  use formwright_host::StaticDirectory;
  use std::collections::HashMap;
  use std::sync::Arc;

  fn grid(value: Value) -> Component {
    serde_json::from_value(value).unwrap()
  }

  #[test]
  fn test_rows_from_table() {
    let graph = json!({
      "lines": [
        { "sku": "a-1", "qty": 2, "meta": { "color": "red" } },
        { "sku": "b-2", "qty": 1 }
      ]
    });
    let state = FormState::default();
    let directory = StaticDirectory::default();
    let transforms = HashMap::new();
    let hydrator = Hydrator::new(&state, &graph, &directory, &transforms);

    let mut component = grid(json!({
      "key": "lines",
      "type": "datagrid",
      "table": "lines",
      "components": [
        { "key": "sku", "type": "textfield" },
        { "key": "qty", "type": "number" }
      ],
      "columns": {
        "color": { "field": "meta.color" },
        "label": { "template": "{{ index + 1 }}. {{ row.sku }} x{{ row.qty }}" }
      }
    }));
    hydrate(&hydrator, &mut component).unwrap();

    assert_eq!(
      component.default_value,
      Some(json!([
        { "sku": "a-1", "qty": 2, "color": "red", "label": "1. a-1 x2" },
        { "sku": "b-2", "qty": 1, "label": "2. b-2 x1" }
      ]))
    );
  }

  #[test]
  fn test_api_source_wins_over_table() {
    let graph = json!({ "items": [{ "id": "from-table" }] });
    let mut state = FormState::new(json!({ "currency": "EUR" }));
    state.record_api_result("items", json!({ "data": [{ "id": "from-api", "price": 10 }] }));
    state.record_api_result("owner", json!({ "name": "Ada" }));
    let directory = StaticDirectory::default();
    let mut transforms: HashMap<String, ColumnTransform> = HashMap::new();
    transforms.insert(
      "double".to_string(),
      Arc::new(|value: &Value, _row: &Value| json!(value.as_i64().unwrap_or(0) * 2)),
    );
    let hydrator = Hydrator::new(&state, &graph, &directory, &transforms);

    let mut component = grid(json!({
      "key": "items",
      "type": "editgrid",
      "table": "items",
      "apiSource": "items",
      "dataPath": ["data"],
      "components": [{ "key": "id", "type": "textfield" }],
      "columns": {
        "price": { "transform": "double", "template": "{{ value }} {{ session.currency }}" },
        "owner": { "apiSource": "owner", "valueKey": "name" }
      }
    }));
    hydrate(&hydrator, &mut component).unwrap();

    assert_eq!(
      component.default_value,
      Some(json!([{ "id": "from-api", "price": "20 EUR", "owner": "Ada" }]))
    );
  }

  #[test]
  fn test_unknown_transform_fails() {
    let graph = json!({ "rows": [{ "a": 1 }] });
    let state = FormState::default();
    let directory = StaticDirectory::default();
    let transforms = HashMap::new();
    let hydrator = Hydrator::new(&state, &graph, &directory, &transforms);

    let mut component = grid(json!({
      "key": "rows",
      "type": "datagrid",
      "table": "rows",
      "columns": { "a": { "transform": "nope" } }
    }));
    let err = hydrate(&hydrator, &mut component).unwrap_err();
    assert!(matches!(err, RenderError::Hydration { key, .. } if key == "rows"));
    assert_eq!(component.default_value, None);
  }
}
