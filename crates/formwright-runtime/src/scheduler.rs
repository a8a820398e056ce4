//! API dependency scheduler.
//!
//! Runs every independent and graph-only source at once, then loops over
//! API-dependent sources until nothing is pending, no progress is made for
//! `stuck_threshold` iterations, or the iteration budget runs out.

use std::collections::BTreeMap;
use std::sync::Arc;

use formwright_config::{ApiDescriptor, SchedulerConfig};
use formwright_graph::{Dependencies, DependencyClass, DependencyGraph};
use formwright_host::{ApiClient, ResolvedRequest};
use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use crate::readiness::{is_ready, missing_dependencies};
use crate::resolve::{ResolveContext, expand, merge_fan_out};
use crate::result::{LoopOutcome, SchedulerReport, StuckDescriptor};
use crate::state::FormState;

/// Result of executing one source.
#[derive(Debug)]
enum CallOutcome {
  Resolved(Value),
  Failed,
  Unresolved,
}

/// Resolves API sources into a [`FormState`].
#[derive(Clone)]
pub struct Scheduler {
  client: Arc<dyn ApiClient>,
  config: SchedulerConfig,
}

impl Scheduler {
  pub fn new(client: Arc<dyn ApiClient>, config: SchedulerConfig) -> Self {
    Self { client, config }
  }

  /// Execute every source whose dependencies can be satisfied and record
  /// the results in `state`.
  ///
  /// Individual call failures never abort the run. Sources that were never
  /// executed are listed in [`SchedulerReport::stuck`].
  #[instrument(name = "scheduler_run", skip_all, fields(sources = apis.len()))]
  pub async fn run(
    &self,
    apis: &BTreeMap<String, ApiDescriptor>,
    state: &mut FormState,
    graph: &Value,
  ) -> SchedulerReport {
    let mut report = SchedulerReport::default();
    let dependency_graph = DependencyGraph::new(apis);

    let plan = dependency_graph.plan();
    for members in &plan.cycles {
      warn!(members = ?members, "dependency_cycle_detected");
    }
    for (source, names) in &plan.unknown {
      warn!(source = %source, unknown = ?names, "unknown_api_reference");
    }

    // Phase 1: independent and graph-only sources.
    let mut immediate = Vec::new();
    let mut pending = Vec::new();
    for (name, deps) in dependency_graph.sources() {
      match deps.class() {
        DependencyClass::Independent => immediate.push(name.clone()),
        DependencyClass::GraphOnly if is_ready(deps, state, graph) => immediate.push(name.clone()),
        DependencyClass::GraphOnly => {
          report.stuck.push(stuck_descriptor(name, deps, state, graph));
        }
        DependencyClass::ApiDependent => pending.push(name.clone()),
      }
    }

    if !immediate.is_empty() {
      info!(sources = ?immediate, "executing independent sources");
      self
        .execute_batch(&immediate, apis, state, graph, &mut report)
        .await;
      report.batches.push(immediate);
    }

    // Phase 2: fixed-point loop over API-dependent sources.
    let budget = self.config.iteration_budget(apis.len());
    let mut idle = 0;
    while !pending.is_empty() {
      if report.iterations >= budget {
        warn!(budget = budget, pending = ?pending, "scheduler_budget_exhausted");
        report.outcome = LoopOutcome::BudgetExhausted;
        break;
      }
      report.iterations += 1;

      let (ready, still_pending): (Vec<String>, Vec<String>) =
        pending.into_iter().partition(|name| {
          dependency_graph
            .dependencies(name)
            .is_some_and(|deps| is_ready(deps, state, graph))
        });
      pending = still_pending;

      if ready.is_empty() {
        idle += 1;
        debug!(
          iteration = report.iterations,
          pending = pending.len(),
          idle = idle,
          "no_ready_sources"
        );
        if idle >= self.config.stuck_threshold {
          warn!(iteration = report.iterations, pending = ?pending, "scheduler_stuck");
          report.outcome = LoopOutcome::Stalled;
          break;
        }
        continue;
      }
      idle = 0;

      info!(
        iteration = report.iterations,
        sources = ?ready,
        "executing batch of ready sources"
      );
      self
        .execute_batch(&ready, apis, state, graph, &mut report)
        .await;
      report.batches.push(ready);
    }

    let empty = Dependencies::default();
    for name in pending {
      let deps = dependency_graph.dependencies(&name).unwrap_or(&empty);
      report.stuck.push(stuck_descriptor(&name, deps, state, graph));
    }

    info!(
      executed = report.executed.len(),
      failed = report.failed.len(),
      stuck = report.stuck.len(),
      iterations = report.iterations,
      "scheduler_completed"
    );
    report
  }

  /// Execute a batch concurrently against the current state, then record
  /// every result. Each source writes only its own key.
  async fn execute_batch(
    &self,
    names: &[String],
    apis: &BTreeMap<String, ApiDescriptor>,
    state: &mut FormState,
    graph: &Value,
    report: &mut SchedulerReport,
  ) {
    let outcomes = {
      let ctx = ResolveContext::new(state, graph);
      let ctx = &ctx;
      let calls = names.iter().filter_map(|name| {
        let descriptor = apis.get(name)?;
        Some(async move { (name, self.execute_source(name, descriptor, ctx).await) })
      });
      join_all(calls).await
    };

    for (name, outcome) in outcomes {
      match outcome {
        CallOutcome::Resolved(value) => {
          if state.record_api_result(name, value) {
            report.executed.push(name.clone());
          }
        }
        CallOutcome::Failed => report.failed.push(name.clone()),
        CallOutcome::Unresolved => report.unresolved.push(name.clone()),
      }
    }
  }

  async fn execute_source(
    &self,
    name: &str,
    descriptor: &ApiDescriptor,
    ctx: &ResolveContext<'_>,
  ) -> CallOutcome {
    let expansion = match expand(name, descriptor, ctx) {
      Ok(expansion) => expansion,
      Err(e) => {
        error!(source = %name, error = %e, "template_parse_failed");
        return CallOutcome::Unresolved;
      }
    };

    if !expansion.fan_out {
      return match expansion.requests.first() {
        Some(request) => match self.call(name, request).await {
          Some(value) => CallOutcome::Resolved(value),
          None => CallOutcome::Failed,
        },
        None => CallOutcome::Unresolved,
      };
    }

    let calls = expansion.requests.len();
    let results: Vec<Value> = join_all(
      expansion
        .requests
        .iter()
        .map(|request| self.call(name, request)),
    )
    .await
    .into_iter()
    .flatten()
    .collect();

    if results.is_empty() {
      warn!(source = %name, calls = calls, "fan_out_failed");
      return CallOutcome::Failed;
    }

    debug!(
      source = %name,
      calls = calls,
      succeeded = results.len(),
      "fan_out_merged"
    );
    CallOutcome::Resolved(merge_fan_out(results))
  }

  /// One isolated call. Failures and empty bodies yield `None`.
  async fn call(&self, name: &str, request: &ResolvedRequest) -> Option<Value> {
    match self.client.call(name, request).await {
      Ok(Value::Null) => {
        warn!(source = %name, url = %request.url, "api_call_empty");
        None
      }
      Ok(value) => Some(value),
      Err(e) => {
        error!(source = %name, url = %request.url, error = %e, "api_call_failed");
        None
      }
    }
  }
}

fn stuck_descriptor(
  name: &str,
  deps: &Dependencies,
  state: &FormState,
  graph: &Value,
) -> StuckDescriptor {
  let (missing_api_deps, missing_graph_deps) = missing_dependencies(deps, state, graph);
  warn!(
    source = %name,
    missing_api_deps = ?missing_api_deps,
    missing_graph_deps = ?missing_graph_deps,
    "dependency_stuck"
  );
  StuckDescriptor {
    source: name.to_string(),
    missing_api_deps,
    missing_graph_deps,
  }
}
