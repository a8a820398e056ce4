//! Workflow (process) engine client.
//!
//! Form submissions usually start a process instance or complete the
//! pending user task of one. The REST shape follows the common
//! process-engine convention:
//!
//! ```text
//! POST {base}/process-definition/key/{key}/start       { "variables": {…} }
//! GET  {base}/task?processInstanceId=…&taskDefinitionKey=…
//! POST {base}/task/{id}/complete                      { "variables": {…} }
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::info;
use url::Url;

use crate::error::HostError;
use crate::http::read_body;

#[async_trait]
pub trait ProcessEngine: Send + Sync {
  /// Start a process instance and return its id.
  async fn start(
    &self,
    definition_key: &str,
    variables: &serde_json::Map<String, serde_json::Value>,
  ) -> Result<String, HostError>;

  /// Complete the pending task `task_definition_key` of an instance.
  async fn complete(
    &self,
    instance_id: &str,
    task_definition_key: &str,
    variables: &serde_json::Map<String, serde_json::Value>,
  ) -> Result<(), HostError>;
}

#[derive(Debug, Deserialize)]
struct IdResponse {
  id: String,
}

/// reqwest-backed [`ProcessEngine`].
#[derive(Debug, Clone)]
pub struct RestProcessEngine {
  client: Client,
  base_url: Url,
}

impl RestProcessEngine {
  pub fn new(base_url: Url) -> Self {
    Self {
      client: Client::new(),
      base_url,
    }
  }

  fn endpoint(&self, segments: &[&str]) -> Result<Url, HostError> {
    let mut url = self.base_url.clone();
    url
      .path_segments_mut()
      .map_err(|_| HostError::InvalidUrl {
        url: self.base_url.to_string(),
        message: "base url cannot have path segments".to_string(),
      })?
      .pop_if_empty()
      .extend(segments);
    Ok(url)
  }

  fn start_url(&self, definition_key: &str) -> Result<Url, HostError> {
    self.endpoint(&["process-definition", "key", definition_key, "start"])
  }

  fn task_query_url(&self, instance_id: &str, task_definition_key: &str) -> Result<Url, HostError> {
    let mut url = self.endpoint(&["task"])?;
    url
      .query_pairs_mut()
      .append_pair("processInstanceId", instance_id)
      .append_pair("taskDefinitionKey", task_definition_key);
    Ok(url)
  }
}

/// Wrap each variable as `{ "value": … }`.
fn encode_variables(variables: &serde_json::Map<String, serde_json::Value>) -> serde_json::Value {
  serde_json::Value::Object(
    variables
      .iter()
      .map(|(k, v)| (k.clone(), serde_json::json!({ "value": v })))
      .collect(),
  )
}

#[async_trait]
impl ProcessEngine for RestProcessEngine {
  async fn start(
    &self,
    definition_key: &str,
    variables: &serde_json::Map<String, serde_json::Value>,
  ) -> Result<String, HostError> {
    let response = self
      .client
      .post(self.start_url(definition_key)?)
      .json(&serde_json::json!({ "variables": encode_variables(variables) }))
      .send()
      .await?;

    let started: IdResponse = serde_json::from_value(read_body(response).await?)?;
    info!(definition_key = %definition_key, instance_id = %started.id, "process_started");
    Ok(started.id)
  }

  async fn complete(
    &self,
    instance_id: &str,
    task_definition_key: &str,
    variables: &serde_json::Map<String, serde_json::Value>,
  ) -> Result<(), HostError> {
    let response = self
      .client
      .get(self.task_query_url(instance_id, task_definition_key)?)
      .send()
      .await?;
    let tasks: Vec<IdResponse> = serde_json::from_value(read_body(response).await?)?;

    let task = tasks.into_iter().next().ok_or_else(|| HostError::NotFound {
      message: format!(
        "no pending task '{}' for process instance '{}'",
        task_definition_key, instance_id
      ),
    })?;

    let response = self
      .client
      .post(self.endpoint(&["task", &task.id, "complete"])?)
      .json(&serde_json::json!({ "variables": encode_variables(variables) }))
      .send()
      .await?;
    read_body(response).await?;

    info!(
      instance_id = %instance_id,
      task_definition_key = %task_definition_key,
      task_id = %task.id,
      "task_completed"
    );
    Ok(())
  }
}
