//! Component hydration.
//!
//! Each component type has its own processor. Plain value components are
//! hydrated first, content and directory-backed selectboxes concurrently,
//! and everything else one at a time.

mod content;
mod default;
mod grid;
mod rows;
mod select;

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use formwright_config::{Component, ComponentType};
use formwright_host::DirectoryClient;
use futures::future::join_all;
use minijinja::Environment;
use serde_json::Value;
use tracing::{debug, error};

use crate::error::RenderError;
use crate::result::HydrationFailure;
use crate::state::FormState;

/// A named column transform: `(value, row) -> value`.
pub type ColumnTransform = Arc<dyn Fn(&Value, &Value) -> Value + Send + Sync>;

/// Fills components from graph data, API results, session data and the
/// directory.
pub struct Hydrator<'a> {
  state: &'a FormState,
  graph: &'a Value,
  directory: &'a dyn DirectoryClient,
  transforms: &'a HashMap<String, ColumnTransform>,
  templates: Environment<'static>,
}

impl<'a> Hydrator<'a> {
  pub fn new(
    state: &'a FormState,
    graph: &'a Value,
    directory: &'a dyn DirectoryClient,
    transforms: &'a HashMap<String, ColumnTransform>,
  ) -> Self {
    Self {
      state,
      graph,
      directory,
      transforms,
      templates: Environment::new(),
    }
  }

  /// Hydrate every component of the tree.
  pub async fn hydrate_all(&self, components: &mut [Component]) -> Vec<HydrationFailure> {
    let mut targets = Vec::new();
    collect_targets(components, None, &mut targets);
    self.hydrate_targets(targets).await
  }

  /// Hydrate only the components with the given keys.
  pub async fn hydrate_keys(
    &self,
    components: &mut [Component],
    keys: &BTreeSet<String>,
  ) -> Vec<HydrationFailure> {
    let mut targets = Vec::new();
    collect_targets(components, Some(keys), &mut targets);
    self.hydrate_targets(targets).await
  }

  async fn hydrate_targets(&self, targets: Vec<&mut Component>) -> Vec<HydrationFailure> {
    let mut plain = Vec::new();
    let mut concurrent = Vec::new();
    let mut sequential = Vec::new();
    for component in targets {
      match &component.component_type {
        ComponentType::Other(_) => plain.push(component),
        ComponentType::Content => concurrent.push(component),
        ComponentType::SelectBoxes if !component.ldap.is_empty() => concurrent.push(component),
        _ => sequential.push(component),
      }
    }

    let mut failures = Vec::new();

    for component in plain {
      let result = default::hydrate(self, component);
      record(component, result, &mut failures);
    }

    let results = join_all(concurrent.iter_mut().map(|component| async move {
      let result = self.hydrate_component(component).await;
      (component.key.clone(), result)
    }))
    .await;
    for (key, result) in results {
      record_key(key, result, &mut failures);
    }

    for component in sequential {
      let result = self.hydrate_component(component).await;
      record(component, result, &mut failures);
    }

    failures
  }

  /// Dispatch one component to the processor for its type.
  pub async fn hydrate_component(&self, component: &mut Component) -> Result<(), RenderError> {
    debug!(component = %component.key, kind = %component.component_type, "hydrating_component");
    match component.component_type {
      ComponentType::Select => select::hydrate(self, component),
      ComponentType::SelectBoxes => select::hydrate_boxes(self, component).await,
      ComponentType::DataGrid | ComponentType::EditGrid => grid::hydrate(self, component),
      ComponentType::Content => content::hydrate(self, component),
      ComponentType::Other(_) => default::hydrate(self, component),
    }
  }

  fn state(&self) -> &FormState {
    self.state
  }

  fn graph(&self) -> &Value {
    self.graph
  }

  fn directory(&self) -> &dyn DirectoryClient {
    self.directory
  }

  fn transform(&self, name: &str) -> Option<&ColumnTransform> {
    self.transforms.get(name)
  }

  /// Render a minijinja template for a component.
  fn render(&self, key: &str, template: &str, ctx: &Value) -> Result<String, RenderError> {
    self
      .templates
      .render_str(template, minijinja::Value::from_serialize(ctx))
      .map_err(|e| RenderError::Hydration {
        key: key.to_string(),
        message: format!("failed to render template: {}", e),
      })
  }
}

/// Leaf components, descending into layout containers.
fn collect_targets<'c>(
  components: &'c mut [Component],
  keys: Option<&BTreeSet<String>>,
  out: &mut Vec<&'c mut Component>,
) {
  for component in components.iter_mut() {
    if component.is_container() {
      collect_targets(&mut component.components, keys, out);
    } else if keys.is_none_or(|keys| keys.contains(&component.key)) {
      out.push(component);
    }
  }
}

fn record(component: &Component, result: Result<(), RenderError>, failures: &mut Vec<HydrationFailure>) {
  record_key(component.key.clone(), result, failures);
}

fn record_key(key: String, result: Result<(), RenderError>, failures: &mut Vec<HydrationFailure>) {
  if let Err(e) = result {
    error!(component = %key, error = %e, "component_hydration_failed");
    failures.push(HydrationFailure {
      key,
      message: e.to_string(),
    });
  }
}
