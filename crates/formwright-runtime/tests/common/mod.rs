//! Shared fakes for the runtime integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use formwright_config::FormDef;
use formwright_host::{ApiClient, HostError, ResolvedRequest, StaticDirectory, StaticQuery};
use formwright_runtime::Renderer;
use serde_json::Value;

type Handler = Box<dyn Fn(&str, &ResolvedRequest) -> Result<Value, HostError> + Send + Sync>;

/// An [`ApiClient`] answering from a closure and recording every call in
/// order.
pub struct FakeApi {
  handler: Handler,
  calls: Mutex<Vec<(String, ResolvedRequest)>>,
}

impl FakeApi {
  pub fn new<F>(handler: F) -> Arc<Self>
  where
    F: Fn(&str, &ResolvedRequest) -> Result<Value, HostError> + Send + Sync + 'static,
  {
    Arc::new(Self {
      handler: Box::new(handler),
      calls: Mutex::new(Vec::new()),
    })
  }

  /// Answer by source name; unknown sources fail.
  pub fn with_responses(responses: Value) -> Arc<Self> {
    let responses: HashMap<String, Value> = serde_json::from_value(responses).unwrap();
    Self::new(move |source, _| {
      responses
        .get(source)
        .cloned()
        .ok_or_else(|| HostError::NotFound {
          message: format!("no response for {}", source),
        })
    })
  }

  pub fn calls(&self) -> Vec<(String, ResolvedRequest)> {
    self.calls.lock().unwrap().clone()
  }

  /// Sources in call order.
  pub fn sources(&self) -> Vec<String> {
    self.calls().into_iter().map(|(source, _)| source).collect()
  }

  pub fn calls_to(&self, source: &str) -> Vec<ResolvedRequest> {
    self
      .calls()
      .into_iter()
      .filter(|(name, _)| name == source)
      .map(|(_, request)| request)
      .collect()
  }
}

#[async_trait]
impl ApiClient for FakeApi {
  async fn call(&self, source: &str, request: &ResolvedRequest) -> Result<Value, HostError> {
    self
      .calls
      .lock()
      .unwrap()
      .push((source.to_string(), request.clone()));
    (self.handler)(source, request)
  }
}

pub fn form(value: Value) -> FormDef {
  serde_json::from_value(value).unwrap()
}

pub fn failure(source: &str) -> HostError {
  HostError::Status {
    url: format!("http://api.test/{}", source),
    status: 500,
    body: "boom".to_string(),
  }
}

pub fn renderer(graph: Value, api: Arc<FakeApi>, directory: StaticDirectory) -> Renderer {
  Renderer::new(
    Arc::new(StaticQuery::new(graph)),
    api,
    Arc::new(directory),
  )
}
