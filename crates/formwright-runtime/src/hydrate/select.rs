//! Select and selectboxes option lists.

use std::collections::HashSet;

use formwright_config::{Component, SelectOption};
use serde_json::{Map, Value};
use tracing::debug;

use super::Hydrator;
use super::rows::{api_value, lookup, rows_of, stringify};
use crate::error::RenderError;

const COMPOSITE_SEPARATOR: &str = " - ";

/// Append table options, then API options.
pub(super) fn hydrate(hydrator: &Hydrator<'_>, component: &mut Component) -> Result<(), RenderError> {
  let label_key = component.label_key.as_deref().unwrap_or("label");
  let value_key = component.value_key.as_deref().unwrap_or("value");
  let mut options = Vec::new();

  if let Some(table) = &component.table {
    match lookup(hydrator.graph(), table) {
      Some(source) => options.extend(options_from(source, label_key, value_key)),
      None => debug!(component = %component.key, table = %table, "option_table_missing"),
    }
  }

  if let Some(name) = &component.api_source {
    match api_value(hydrator.state(), name, &component.options_path) {
      Some(source) => options.extend(options_from(source, label_key, value_key)),
      None => debug!(component = %component.key, source = %name, "option_source_missing"),
    }
  }

  component.data.values.extend(options);
  Ok(())
}

/// [`hydrate`], then one option per distinct directory member, then the
/// selection map.
pub(super) async fn hydrate_boxes(
  hydrator: &Hydrator<'_>,
  component: &mut Component,
) -> Result<(), RenderError> {
  hydrate(hydrator, component)?;

  if !component.ldap.is_empty() {
    let members = hydrator
      .directory()
      .members(&component.ldap)
      .await
      .map_err(|e| RenderError::ExternalCall {
        target: format!("directory:{}", component.ldap.join(",")),
        source: e,
      });

    match members {
      Ok(members) => {
        let mut seen = HashSet::new();
        for member in members {
          if seen.insert(member.id.clone()) {
            component
              .data
              .values
              .push(SelectOption::new(member.label, member.id));
          }
        }
      }
      Err(e) => {
        select_map(component);
        return Err(e);
      }
    }
  }

  select_map(component);
  Ok(())
}

/// `{ value: selected }` for every option, keeping existing selections.
fn select_map(component: &mut Component) {
  let previous = match component.default_value.take() {
    Some(Value::Object(map)) => map,
    _ => Map::new(),
  };

  let selection: Map<String, Value> = component
    .data
    .values
    .iter()
    .map(|option| {
      let selected = previous
        .get(&option.value)
        .and_then(Value::as_bool)
        .unwrap_or(false);
      (option.value.clone(), Value::Bool(selected))
    })
    .collect();

  component.default_value = Some(Value::Object(selection));
}

fn options_from(source: &Value, label_key: &str, value_key: &str) -> Vec<SelectOption> {
  rows_of(source)
    .into_iter()
    .filter_map(|row| option_from(row, label_key, value_key))
    .collect()
}

fn option_from(row: &Value, label_key: &str, value_key: &str) -> Option<SelectOption> {
  if !row.is_object() {
    let value = stringify(row);
    return Some(SelectOption::new(value.clone(), value));
  }

  let value = stringify(lookup(row, value_key)?);
  let label = label_of(row, label_key).unwrap_or_else(|| value.clone());
  Some(SelectOption::new(label, value))
}

/// A label key of the form `"first - last"` joins the row's values.
fn label_of(row: &Value, label_key: &str) -> Option<String> {
  if !label_key.contains(COMPOSITE_SEPARATOR) {
    return lookup(row, label_key).map(stringify);
  }

  let parts: Vec<String> = label_key
    .split(COMPOSITE_SEPARATOR)
    .filter_map(|key| lookup(row, key.trim()))
    .map(stringify)
    .collect();
  (!parts.is_empty()).then(|| parts.join(COMPOSITE_SEPARATOR))
}
