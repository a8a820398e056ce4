//! Dependency extraction from API descriptors.

use std::collections::BTreeSet;

use formwright_config::ApiDescriptor;
use serde_json::Value;

use crate::template::{Reference, Template};

/// How a descriptor relates to other sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyClass {
  /// No references at all.
  Independent,
  /// Only graph references, satisfiable once the primary query has run.
  GraphOnly,
  /// At least one reference to another API source.
  ApiDependent,
}

/// The references a descriptor makes, deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependencies {
  /// Names following `${api.`.
  pub api: BTreeSet<String>,
  /// Dot paths following `${graph.`.
  pub graph: BTreeSet<String>,
  /// Field keys following `${values.`. These never block readiness.
  pub values: BTreeSet<String>,
}

impl Dependencies {
  /// Scan every templateable field of a descriptor.
  pub fn extract(descriptor: &ApiDescriptor) -> Self {
    let mut deps = Self::default();

    deps.scan(&descriptor.url);
    descriptor
      .path
      .values()
      .chain(descriptor.query.values())
      .chain(descriptor.headers.values())
      .chain(descriptor.aggregate.values())
      .for_each(|s| deps.scan(s));
    if let Some(data) = &descriptor.data {
      for_each_string(data, &mut |s| deps.scan(s));
    }

    deps
  }

  fn scan(&mut self, input: &str) {
    for reference in Template::parse(input).references() {
      match reference {
        Reference::Api { name, .. } => {
          self.api.insert(name.clone());
        }
        Reference::Graph { path } => {
          self.graph.insert(path.to_string());
        }
        Reference::Value { key, .. } => {
          self.values.insert(key.clone());
        }
        Reference::Session { .. } => {}
      }
    }
  }

  pub fn is_independent(&self) -> bool {
    self.api.is_empty() && self.graph.is_empty()
  }

  pub fn class(&self) -> DependencyClass {
    if !self.api.is_empty() {
      DependencyClass::ApiDependent
    } else if !self.graph.is_empty() {
      DependencyClass::GraphOnly
    } else {
      DependencyClass::Independent
    }
  }
}

/// Visit every string nested anywhere in a JSON value.
pub fn for_each_string<F>(value: &Value, f: &mut F)
where
  F: FnMut(&str),
{
  match value {
    Value::String(s) => f(s),
    Value::Array(items) => items.iter().for_each(|item| for_each_string(item, f)),
    Value::Object(map) => map.values().for_each(|item| for_each_string(item, f)),
    _ => {}
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn descriptor(value: serde_json::Value) -> ApiDescriptor {
    serde_json::from_value(value).unwrap()
  }

  #[test]
  fn test_independent_descriptor() {
    let deps = Dependencies::extract(&ApiDescriptor::get("/countries"));
    assert!(deps.is_independent());
    assert_eq!(deps.class(), DependencyClass::Independent);
  }

  #[test]
  fn test_extract_from_every_field() {
    let deps = Dependencies::extract(&descriptor(json!({
      "method": "POST",
      "url": "/orgs/${graph.org.code}/users",
      "path": { "id": "${api.user.id}" },
      "query": { "q": "${api.user.name}", "lang": "${session.lang}" },
      "headers": { "x-tenant": "${graph.tenant}" },
      "data": { "filters": [{ "role": "${api.roles}" }], "by": "${values.owner}" },
      "in": { "ids": "${api.members.id}" }
    })));

    assert_eq!(
      deps.api.iter().collect::<Vec<_>>(),
      vec!["members", "roles", "user"]
    );
    assert_eq!(
      deps.graph.iter().collect::<Vec<_>>(),
      vec!["org.code", "tenant"]
    );
    assert!(deps.values.contains("owner"));
    assert_eq!(deps.class(), DependencyClass::ApiDependent);
  }

  #[test]
  fn test_graph_only() {
    let deps = Dependencies::extract(&descriptor(json!({
      "url": "/items",
      "query": { "a": "${graph.x}", "b": "${graph.x}" }
    })));
    assert_eq!(deps.graph.len(), 1);
    assert_eq!(deps.class(), DependencyClass::GraphOnly);
  }

  #[test]
  fn test_session_and_values_do_not_create_dependencies() {
    let deps = Dependencies::extract(&descriptor(json!({
      "url": "/me/${session.user.id}",
      "query": { "country": "${values.country}" }
    })));
    assert!(deps.is_independent());
  }
}
