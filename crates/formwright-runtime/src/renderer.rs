//! Render entry point.
//!
//! The [`Renderer`] owns the collaborators and provides
//! `render(form, session)` to produce a hydrated component tree, and
//! `on_change` to re-hydrate the components depending on a changed field.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use formwright_config::{Component, FormDef};
use formwright_host::{ApiClient, DirectoryClient, QueryClient};
use serde_json::Value;
use tracing::{error, info, instrument};

use crate::error::RenderError;
use crate::hydrate::{ColumnTransform, Hydrator};
use crate::result::{HydrationFailure, RenderOutput, RenderReport};
use crate::scheduler::Scheduler;
use crate::state::FormState;

/// Renders form definitions.
pub struct Renderer {
  query: Arc<dyn QueryClient>,
  api: Arc<dyn ApiClient>,
  directory: Arc<dyn DirectoryClient>,
  transforms: HashMap<String, ColumnTransform>,
}

impl Renderer {
  pub fn new(
    query: Arc<dyn QueryClient>,
    api: Arc<dyn ApiClient>,
    directory: Arc<dyn DirectoryClient>,
  ) -> Self {
    Self {
      query,
      api,
      directory,
      transforms: HashMap::new(),
    }
  }

  /// Register a column transform usable as `columns.<key>.transform`.
  pub fn with_transform<F>(mut self, name: impl Into<String>, transform: F) -> Self
  where
    F: Fn(&Value, &Value) -> Value + Send + Sync + 'static,
  {
    self.transforms.insert(name.into(), Arc::new(transform));
    self
  }

  /// Render a form for the given session.
  ///
  /// Fails only when the form has no schema or the primary query fails.
  #[instrument(name = "render", skip(self, form, session), fields(form_id = %form.form_id))]
  pub async fn render(&self, form: &FormDef, session: Value) -> Result<RenderOutput, RenderError> {
    let render_id = uuid::Uuid::new_v4().to_string();

    info!(
      render_id = %render_id,
      form_id = %form.form_id,
      apis = form.apis.len(),
      "render_started"
    );

    let Some(schema) = &form.schema else {
      error!(render_id = %render_id, "render_failed: missing schema");
      return Err(RenderError::MissingSchema {
        form_id: form.form_id.clone(),
      });
    };

    let graph = match &form.query {
      Some(query) => self.query.execute(query).await.map_err(|e| {
        error!(render_id = %render_id, error = %e, "primary_query_failed");
        RenderError::PrimaryQuery { source: e }
      })?,
      None => Value::Object(Default::default()),
    };

    let mut state = FormState::new(session).with_values(form.values.clone());
    let mut components = schema.components.clone();
    state.track_dependencies(&components);

    let scheduler = Scheduler::new(self.api.clone(), form.scheduler.clone());
    let scheduler_report = scheduler.run(&form.apis, &mut state, &graph).await;

    let hydration_failures = self
      .hydrate(&state, &graph, &mut components, None)
      .await;
    record_values(&mut state, &components, None);

    info!(
      render_id = %render_id,
      executed = scheduler_report.executed.len(),
      stuck = scheduler_report.stuck.len(),
      hydration_failures = hydration_failures.len(),
      "render_completed"
    );

    Ok(RenderOutput {
      render_id,
      form_id: form.form_id.clone(),
      components,
      state,
      graph,
      report: RenderReport {
        scheduler: scheduler_report,
        hydration_failures,
      },
    })
  }

  /// Record a new value for `key` and re-hydrate every component that
  /// depends on it, directly or transitively.
  #[instrument(name = "on_change", skip(self, output, value), fields(form_id = %output.form_id))]
  pub async fn on_change(
    &self,
    output: &mut RenderOutput,
    key: &str,
    value: Value,
  ) -> Vec<HydrationFailure> {
    output.state.set_value(key, value);

    let dependents = output.state.dependents_of(key);
    if dependents.is_empty() {
      return Vec::new();
    }
    info!(field = %key, dependents = ?dependents, "rehydrating_dependents");

    let RenderOutput {
      components,
      state,
      graph,
      report,
      ..
    } = output;

    for dependent in &dependents {
      if let Some(component) = components.iter_mut().find_map(|c| c.find_mut(dependent)) {
        component.clear_output();
      }
    }

    let failures = self
      .hydrate(state, graph, components, Some(&dependents))
      .await;
    record_values(state, components, Some(&dependents));
    report.hydration_failures.extend(failures.iter().cloned());
    failures
  }

  async fn hydrate(
    &self,
    state: &FormState,
    graph: &Value,
    components: &mut [Component],
    keys: Option<&BTreeSet<String>>,
  ) -> Vec<HydrationFailure> {
    let hydrator = Hydrator::new(state, graph, self.directory.as_ref(), &self.transforms);
    match keys {
      Some(keys) => hydrator.hydrate_keys(components, keys).await,
      None => hydrator.hydrate_all(components).await,
    }
  }
}

/// Copy hydrated default values into the form values. Without `keys` only
/// missing values are filled; with `keys` those values are replaced.
fn record_values(state: &mut FormState, components: &[Component], keys: Option<&BTreeSet<String>>) {
  for component in components {
    if component.is_container() {
      record_values(state, &component.components, keys);
      continue;
    }
    let Some(value) = &component.default_value else {
      continue;
    };
    let replace = match keys {
      Some(keys) => keys.contains(&component.key),
      None => state.value(&component.key).is_none(),
    };
    if replace {
      state.set_value(component.key.clone(), value.clone());
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use formwright_host::{HostError, StaticDirectory, StaticQuery};
  use serde_json::json;

  struct NoApi;

  #[async_trait::async_trait]
  impl ApiClient for NoApi {
    async fn call(
      &self,
      source: &str,
      _request: &formwright_host::ResolvedRequest,
    ) -> Result<Value, HostError> {
      Err(HostError::NotFound {
        message: source.to_string(),
      })
    }
  }

  struct FailingQuery;

  #[async_trait::async_trait]
  impl QueryClient for FailingQuery {
    async fn execute(&self, _query: &formwright_config::QueryDef) -> Result<Value, HostError> {
      Err(HostError::Query {
        message: "down".to_string(),
      })
    }
  }

  fn renderer(query: Arc<dyn QueryClient>) -> Renderer {
    Renderer::new(query, Arc::new(NoApi), Arc::new(StaticDirectory::default()))
  }

  fn form(value: Value) -> FormDef {
    serde_json::from_value(value).unwrap()
  }

  #[tokio::test]
  async fn test_missing_schema() {
    let result = renderer(Arc::new(StaticQuery::default()))
      .render(&form(json!({ "formId": "f1" })), json!({}))
      .await;
    assert!(matches!(result, Err(RenderError::MissingSchema { form_id }) if form_id == "f1"));
  }

  #[tokio::test]
  async fn test_primary_query_failure_fails_render() {
    let result = renderer(Arc::new(FailingQuery))
      .render(
        &form(json!({
          "formId": "f1",
          "query": { "query": "{ x }" },
          "schema": { "components": [] }
        })),
        json!({}),
      )
      .await;
    assert!(matches!(result, Err(RenderError::PrimaryQuery { .. })));
  }

  #[tokio::test]
  async fn test_failed_api_still_renders() {
    let output = renderer(Arc::new(StaticQuery::new(json!({ "org": { "name": "Acme" } }))))
      .render(
        &form(json!({
          "formId": "f1",
          "query": { "query": "{ org { name } }" },
          "apis": { "users": { "url": "/users" } },
          "schema": {
            "components": [
              { "key": "name", "type": "textfield", "table": "org" },
              { "key": "user", "type": "select", "apiSource": "users" }
            ]
          }
        })),
        json!({}),
      )
      .await
      .unwrap();

    assert_eq!(output.report.scheduler.failed, vec!["users"]);
    assert_eq!(output.components[0].default_value, Some(json!("Acme")));
    assert!(output.components[1].data.values.is_empty());
    assert_eq!(output.state.value("name"), Some(&json!("Acme")));
  }

  #[tokio::test]
  async fn test_on_change_rehydrates_dependents() {
    let renderer = renderer(Arc::new(StaticQuery::default()));
    let mut output = renderer
      .render(
        &form(json!({
          "formId": "f1",
          "values": { "country": "NO" },
          "schema": {
            "components": [
              { "key": "country", "type": "textfield" },
              {
                "key": "summary",
                "type": "content",
                "html": "Country: {{ values.country }}",
                "dependsOn": ["country"]
              },
              { "key": "other", "type": "content", "html": "{{ values.country }}" }
            ]
          }
        })),
        json!({}),
      )
      .await
      .unwrap();
    assert_eq!(output.components[1].html.as_deref(), Some("Country: NO"));

    let failures = renderer.on_change(&mut output, "country", json!("SE")).await;
    assert!(failures.is_empty());
    assert_eq!(output.state.value("country"), Some(&json!("SE")));
    assert_eq!(output.components[1].html.as_deref(), Some("Country: SE"));
    assert_eq!(output.components[2].html.as_deref(), Some("NO"));
  }
}
