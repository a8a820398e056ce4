//! Form component definitions.
//!
//! Components follow the usual form-builder JSON layout: a `type` tag, a
//! `key`, and type-specific fields. Fields this crate does not know about are
//! preserved in [`Component::extra`] so a hydrated schema round-trips to the
//! UI unchanged apart from the hydrated outputs (`defaultValue`,
//! `data.values`, `html`).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Component type tag.
///
/// Unknown tags are kept verbatim in [`ComponentType::Other`] and hydrated as
/// plain value fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ComponentType {
  Select,
  SelectBoxes,
  DataGrid,
  EditGrid,
  Content,
  Other(String),
}

impl ComponentType {
  /// Whether this type fills a row array from its nested components.
  pub fn is_grid(&self) -> bool {
    matches!(self, ComponentType::DataGrid | ComponentType::EditGrid)
  }
}

impl From<String> for ComponentType {
  fn from(value: String) -> Self {
    match value.as_str() {
      "select" => ComponentType::Select,
      "selectboxes" => ComponentType::SelectBoxes,
      "datagrid" => ComponentType::DataGrid,
      "editgrid" => ComponentType::EditGrid,
      "content" => ComponentType::Content,
      _ => ComponentType::Other(value),
    }
  }
}

impl From<ComponentType> for String {
  fn from(value: ComponentType) -> Self {
    value.to_string()
  }
}

impl fmt::Display for ComponentType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ComponentType::Select => f.write_str("select"),
      ComponentType::SelectBoxes => f.write_str("selectboxes"),
      ComponentType::DataGrid => f.write_str("datagrid"),
      ComponentType::EditGrid => f.write_str("editgrid"),
      ComponentType::Content => f.write_str("content"),
      ComponentType::Other(other) => f.write_str(other),
    }
  }
}

/// One entry of a select or selectboxes option list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
  pub label: String,
  pub value: String,
}

impl SelectOption {
  pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
    Self {
      label: label.into(),
      value: value.into(),
    }
  }
}

/// The `data` block of a component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentData {
  #[serde(default)]
  pub values: Vec<SelectOption>,

  #[serde(flatten)]
  pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ComponentData {
  pub fn is_empty(&self) -> bool {
    self.values.is_empty() && self.extra.is_empty()
  }
}

/// Per-column configuration of a datagrid or editgrid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDef {
  /// Row field to read, defaults to the column key.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub field: Option<String>,

  /// Read the column from a named API result instead of the row.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub api_source: Option<String>,

  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub data_path: Vec<String>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub value_key: Option<String>,

  /// Template rendered with `row`, `value`, `index` and `session`.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub template: Option<String>,

  /// Name of a transform registered on the renderer.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub transform: Option<String>,
}

/// A form component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
  pub key: String,

  #[serde(rename = "type")]
  pub component_type: ComponentType,

  /// Graph data table (key or dot path) the component reads rows from.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub table: Option<String>,

  /// Row field holding a plain component's value, defaults to `key`.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub field: Option<String>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub api_source: Option<String>,

  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub data_path: Vec<String>,

  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub options_path: Vec<String>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub label_key: Option<String>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub value_key: Option<String>,

  /// Directory groups whose members become selectboxes options.
  #[serde(
    default,
    deserialize_with = "one_or_many",
    skip_serializing_if = "Vec::is_empty"
  )]
  pub ldap: Vec<String>,

  /// Content template; falls back to `html` when absent.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub template: Option<String>,

  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub columns: BTreeMap<String, ColumnDef>,

  /// Keys of components whose value changes re-hydrate this component.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub depends_on: Vec<String>,

  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub components: Vec<Component>,

  #[serde(default, skip_serializing_if = "ComponentData::is_empty")]
  pub data: ComponentData,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub default_value: Option<serde_json::Value>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub html: Option<String>,

  /// Content source captured on the first render, so `html` can be
  /// rendered again. Not part of the schema.
  #[serde(skip)]
  pub content_source: Option<String>,

  #[serde(flatten)]
  pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Component {
  /// Create a bare component with the given key and type.
  pub fn new(key: impl Into<String>, component_type: ComponentType) -> Self {
    Self {
      key: key.into(),
      component_type,
      table: None,
      field: None,
      api_source: None,
      data_path: Vec::new(),
      options_path: Vec::new(),
      label_key: None,
      value_key: None,
      ldap: Vec::new(),
      template: None,
      columns: BTreeMap::new(),
      depends_on: Vec::new(),
      components: Vec::new(),
      data: ComponentData::default(),
      default_value: None,
      html: None,
      content_source: None,
      extra: serde_json::Map::new(),
    }
  }

  /// Layout containers (panels, fieldsets, columns) only group children.
  pub fn is_container(&self) -> bool {
    matches!(self.component_type, ComponentType::Other(_)) && !self.components.is_empty()
  }

  /// Reset every hydrated output so the component can be hydrated again.
  pub fn clear_output(&mut self) {
    self.data.values.clear();
    self.default_value = None;
    if self.component_type == ComponentType::Content {
      self.html = None;
    }
  }

  /// Find a component by key in this subtree.
  pub fn find_mut(&mut self, key: &str) -> Option<&mut Component> {
    if self.key == key {
      return Some(self);
    }
    self
      .components
      .iter_mut()
      .find_map(|child| child.find_mut(key))
  }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum OneOrMany {
    One(String),
    Many(Vec<String>),
  }

  Ok(match OneOrMany::deserialize(deserializer)? {
    OneOrMany::One(one) => vec![one],
    OneOrMany::Many(many) => many,
  })
}
