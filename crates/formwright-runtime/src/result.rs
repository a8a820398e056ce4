//! Render result types.

use formwright_config::Component;
use serde::Serialize;

use crate::state::FormState;

/// An API source that never became ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StuckDescriptor {
  /// Source name.
  pub source: String,
  /// API sources without a usable result.
  pub missing_api_deps: Vec<String>,
  /// Graph paths without a usable value.
  pub missing_graph_deps: Vec<String>,
}

/// How the fixed-point loop ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopOutcome {
  /// Nothing left pending.
  #[default]
  Completed,
  /// The pending set stopped shrinking.
  Stalled,
  /// The iteration budget ran out.
  BudgetExhausted,
}

/// What the scheduler did during one render.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerReport {
  /// Sources with a recorded result.
  pub executed: Vec<String>,
  /// Sources whose call (or every fan-out call) failed.
  pub failed: Vec<String>,
  /// Sources whose resolved descriptor was not a valid request.
  pub unresolved: Vec<String>,
  /// Sources that were never executed.
  pub stuck: Vec<StuckDescriptor>,
  /// Sources executed together, in execution order. Phase 1 is the first
  /// batch.
  pub batches: Vec<Vec<String>>,
  /// Fixed-point loop iterations.
  pub iterations: usize,
  pub outcome: LoopOutcome,
}

impl SchedulerReport {
  pub fn stuck_source(&self, name: &str) -> Option<&StuckDescriptor> {
    self.stuck.iter().find(|stuck| stuck.source == name)
  }
}

/// A component that could not be hydrated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HydrationFailure {
  pub key: String,
  pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderReport {
  pub scheduler: SchedulerReport,
  pub hydration_failures: Vec<HydrationFailure>,
}

/// Result of a complete render invocation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderOutput {
  /// Unique render ID.
  pub render_id: String,
  pub form_id: String,
  /// Hydrated component tree.
  pub components: Vec<Component>,
  pub state: FormState,
  /// Primary query result.
  pub graph: serde_json::Value,
  pub report: RenderReport,
}
