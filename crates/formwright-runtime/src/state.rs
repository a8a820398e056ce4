//! Per-render form state.

use std::collections::{BTreeSet, HashMap, VecDeque};

use formwright_config::Component;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

/// State owned by one render invocation.
///
/// The scheduler writes `api_results`; hydration reads them. An API result
/// is written at most once and never overwritten.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormState {
  values: Map<String, Value>,
  api_results: HashMap<String, Value>,
  session: Value,
  /// Field key -> keys of components that depend on it.
  dependencies: HashMap<String, BTreeSet<String>>,
}

impl FormState {
  pub fn new(session: Value) -> Self {
    Self {
      session,
      ..Self::default()
    }
  }

  pub fn with_values(mut self, values: Map<String, Value>) -> Self {
    self.values = values;
    self
  }

  pub fn session(&self) -> &Value {
    &self.session
  }

  pub fn values(&self) -> &Map<String, Value> {
    &self.values
  }

  pub fn value(&self, key: &str) -> Option<&Value> {
    self.values.get(key)
  }

  pub fn set_value(&mut self, key: impl Into<String>, value: Value) {
    self.values.insert(key.into(), value);
  }

  pub fn api_result(&self, name: &str) -> Option<&Value> {
    self.api_results.get(name)
  }

  pub fn api_results(&self) -> &HashMap<String, Value> {
    &self.api_results
  }

  /// Store the result of an API source. Returns `false` and keeps the
  /// existing entry if the source already has one.
  pub fn record_api_result(&mut self, name: &str, value: Value) -> bool {
    if self.api_results.contains_key(name) {
      warn!(source = %name, "api_result_already_recorded");
      return false;
    }
    self.api_results.insert(name.to_string(), value);
    true
  }

  /// Register every component's `dependsOn` keys, recursively.
  pub fn track_dependencies(&mut self, components: &[Component]) {
    for component in components {
      for upstream in &component.depends_on {
        self
          .dependencies
          .entry(upstream.clone())
          .or_default()
          .insert(component.key.clone());
      }
      self.track_dependencies(&component.components);
    }
  }

  /// Keys of every component that transitively depends on `key`.
  pub fn dependents_of(&self, key: &str) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    let mut queue: VecDeque<&str> = VecDeque::from([key]);

    while let Some(current) = queue.pop_front() {
      if let Some(direct) = self.dependencies.get(current) {
        for dependent in direct {
          if dependent != key && found.insert(dependent.clone()) {
            queue.push_back(dependent);
          }
        }
      }
    }

    found
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use formwright_config::ComponentType;
  use serde_json::json;

  #[test]
  fn test_api_results_are_write_once() {
    let mut state = FormState::new(json!({}));
    assert!(state.record_api_result("users", json!([1])));
    assert!(!state.record_api_result("users", json!([2])));
    assert_eq!(state.api_result("users"), Some(&json!([1])));
  }

  #[test]
  fn test_transitive_dependents() {
    let mut country = Component::new("country", ComponentType::Select);
    country.depends_on = vec!["region".to_string()];
    let mut city = Component::new("city", ComponentType::Select);
    city.depends_on = vec!["country".to_string()];
    let mut summary = Component::new("summary", ComponentType::Content);
    summary.depends_on = vec!["city".to_string(), "region".to_string()];

    let mut panel = Component::new("panel", ComponentType::Other("panel".to_string()));
    panel.components = vec![city, summary];

    let mut state = FormState::default();
    state.track_dependencies(&[country, panel]);

    let dependents: Vec<_> = state.dependents_of("region").into_iter().collect();
    assert_eq!(dependents, vec!["city", "country", "summary"]);
    assert!(state.dependents_of("summary").is_empty());
  }

  #[test]
  fn test_dependency_cycle_terminates() {
    let mut a = Component::new("a", ComponentType::Select);
    a.depends_on = vec!["b".to_string()];
    let mut b = Component::new("b", ComponentType::Select);
    b.depends_on = vec!["a".to_string()];

    let mut state = FormState::default();
    state.track_dependencies(&[a, b]);

    let dependents: Vec<_> = state.dependents_of("a").into_iter().collect();
    assert_eq!(dependents, vec!["b"]);
  }
}
