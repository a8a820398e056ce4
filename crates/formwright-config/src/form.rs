use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::api::ApiDescriptor;
use crate::component::Component;
use crate::query::QueryDef;

/// The component tree of a form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormSchema {
  #[serde(default)]
  pub components: Vec<Component>,

  #[serde(flatten)]
  pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Limits for the API dependency scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulerConfig {
  /// Consecutive iterations without progress before pending work is stuck.
  pub stuck_threshold: usize,
  /// Lower bound of the iteration budget.
  pub min_iteration_budget: usize,
  /// Iterations granted per declared API source.
  pub budget_per_api: usize,
}

impl Default for SchedulerConfig {
  fn default() -> Self {
    Self {
      stuck_threshold: 3,
      min_iteration_budget: 50,
      budget_per_api: 3,
    }
  }
}

impl SchedulerConfig {
  /// Iteration budget for a render declaring `api_count` sources.
  pub fn iteration_budget(&self, api_count: usize) -> usize {
    self
      .min_iteration_budget
      .max(self.budget_per_api.saturating_mul(api_count))
  }
}

/// Everything one render needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDef {
  pub form_id: String,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub query: Option<QueryDef>,

  #[serde(default)]
  pub apis: BTreeMap<String, ApiDescriptor>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub schema: Option<FormSchema>,

  /// Initial field values, addressable as `${values.<key>}`.
  #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
  pub values: serde_json::Map<String, serde_json::Value>,

  #[serde(default)]
  pub scheduler: SchedulerConfig,
}
