//! Integration tests for the API dependency scheduler.

mod common;

use std::collections::BTreeMap;

use common::{FakeApi, failure};
use formwright_config::{ApiDescriptor, SchedulerConfig};
use formwright_runtime::{FormState, LoopOutcome, Scheduler};
use serde_json::{Value, json};

fn apis(value: Value) -> BTreeMap<String, ApiDescriptor> {
  serde_json::from_value(value).unwrap()
}

#[tokio::test]
async fn test_independent_and_graph_only_sources_run_first() {
  let api = FakeApi::with_responses(json!({
    "countries": [{ "code": "no" }],
    "org": { "id": 1 },
    "cities": [{ "name": "Oslo" }],
    "streets": [{ "name": "Karl Johans gate" }]
  }));
  let scheduler = Scheduler::new(api.clone(), SchedulerConfig::default());
  let mut state = FormState::default();

  let report = scheduler
    .run(
      &apis(json!({
        "streets": { "url": "/cities/${api.cities.name}/streets" },
        "cities": { "url": "/countries/${api.countries.code}/cities" },
        "countries": { "url": "/countries" },
        "org": { "url": "/orgs/${graph.org.code}" }
      })),
      &mut state,
      &json!({ "org": { "code": "acme" } }),
    )
    .await;

  assert_eq!(report.batches[0], vec!["countries", "org"]);
  assert_eq!(report.batches[1], vec!["cities"]);
  assert_eq!(report.batches[2], vec!["streets"]);

  let sources = api.sources();
  let mut first_two = sources[..2].to_vec();
  first_two.sort();
  assert_eq!(first_two, vec!["countries", "org"]);
  assert_eq!(&sources[2..], &["cities", "streets"]);
}

#[tokio::test]
async fn test_dependent_never_runs_before_its_dependencies() {
  let api = FakeApi::new(|source, _| match source {
    "c" => Err(failure(source)),
    other => Ok(json!({ "id": other })),
  });
  let scheduler = Scheduler::new(api.clone(), SchedulerConfig::default());
  let mut state = FormState::default();

  let report = scheduler
    .run(
      &apis(json!({
        "a": { "url": "/a" },
        "b": { "url": "/b/${api.a.id}" },
        "c": { "url": "/c/${api.a.id}" },
        "d": { "url": "/d", "query": { "b": "${api.b.id}", "c": "${api.c.id}" } }
      })),
      &mut state,
      &json!({}),
    )
    .await;

  let sources = api.sources();
  let position = |name: &str| sources.iter().position(|s| s == name);
  assert!(position("a") < position("b"));
  assert!(position("a") < position("c"));
  assert_eq!(position("d"), None);

  assert_eq!(report.failed, vec!["c"]);
  let stuck = report.stuck_source("d").unwrap();
  assert_eq!(stuck.missing_api_deps, vec!["c"]);
  assert!(stuck.missing_graph_deps.is_empty());
  assert!(state.api_result("d").is_none());
}

#[tokio::test]
async fn test_fan_out_calls_once_per_element_and_drops_failures() {
  let api = FakeApi::new(|source, request| match source {
    "teams" => Ok(json!([{ "id": "t1" }, { "id": "t2" }, { "id": "t3" }])),
    "members" => {
      let team = request.path["team"].clone();
      if team == "t2" {
        Err(failure(source))
      } else {
        Ok(json!([{ "name": format!("{}-lead", team) }]))
      }
    }
    _ => Err(failure(source)),
  });
  let scheduler = Scheduler::new(api.clone(), SchedulerConfig::default());
  let mut state = FormState::default();

  let report = scheduler
    .run(
      &apis(json!({
        "teams": { "url": "/teams" },
        "members": { "url": "/teams/{team}/members", "path": { "team": "${api.teams.id}" } }
      })),
      &mut state,
      &json!({}),
    )
    .await;

  let calls = api.calls_to("members");
  assert_eq!(calls.len(), 3);
  let mut teams: Vec<_> = calls.iter().map(|c| c.path["team"].clone()).collect();
  teams.sort();
  assert_eq!(teams, vec!["t1", "t2", "t3"]);

  assert!(report.executed.contains(&"members".to_string()));
  let merged = state.api_result("members").unwrap().as_array().unwrap();
  let mut names: Vec<_> = merged.iter().map(|m| m["name"].as_str().unwrap()).collect();
  names.sort();
  assert_eq!(names, vec!["t1-lead", "t3-lead"]);
}

#[tokio::test]
async fn test_mutual_dependency_is_reported_stuck() {
  let api = FakeApi::with_responses(json!({ "a": { "id": 1 }, "b": { "id": 2 } }));
  let scheduler = Scheduler::new(api.clone(), SchedulerConfig::default());
  let mut state = FormState::default();

  let report = scheduler
    .run(
      &apis(json!({
        "a": { "url": "/a/${api.b.id}" },
        "b": { "url": "/b/${api.a.id}" }
      })),
      &mut state,
      &json!({}),
    )
    .await;

  assert_eq!(report.outcome, LoopOutcome::Stalled);
  assert_eq!(report.iterations, 3);
  assert!(api.calls().is_empty());
  assert_eq!(report.stuck_source("a").unwrap().missing_api_deps, vec!["b"]);
  assert_eq!(report.stuck_source("b").unwrap().missing_api_deps, vec!["a"]);
}

#[tokio::test]
async fn test_failed_source_leaves_dependent_stuck() {
  let api = FakeApi::new(|source, _| match source {
    "A" => Err(failure(source)),
    _ => Ok(json!({ "ok": true })),
  });
  let scheduler = Scheduler::new(api.clone(), SchedulerConfig::default());
  let mut state = FormState::default();

  let report = scheduler
    .run(
      &apis(json!({
        "A": { "url": "/a" },
        "B": { "url": "/b/${api.A.id}" }
      })),
      &mut state,
      &json!({}),
    )
    .await;

  assert_eq!(report.failed, vec!["A"]);
  assert_eq!(api.sources(), vec!["A"]);
  let stuck = report.stuck_source("B").unwrap();
  assert_eq!(stuck.missing_api_deps, vec!["A"]);
  assert!(report.iterations <= SchedulerConfig::default().iteration_budget(2));
}

#[tokio::test]
async fn test_long_chain_completes_within_budget() {
  let mut descriptors = serde_json::Map::new();
  descriptors.insert("s00".to_string(), json!({ "url": "/s00" }));
  for i in 1..20 {
    descriptors.insert(
      format!("s{:02}", i),
      json!({ "url": format!("/s{:02}/${{api.s{:02}.id}}", i, i - 1) }),
    );
  }

  let api = FakeApi::new(|source, _| Ok(json!({ "id": source })));
  let scheduler = Scheduler::new(api.clone(), SchedulerConfig::default());
  let mut state = FormState::default();

  let report = scheduler
    .run(&apis(Value::Object(descriptors)), &mut state, &json!({}))
    .await;

  assert_eq!(report.outcome, LoopOutcome::Completed);
  assert_eq!(report.iterations, 19);
  assert_eq!(report.executed.len(), 20);
  assert!(report.stuck.is_empty());
  assert_eq!(api.calls().last().unwrap().1.url, "/s19/s18");
}

#[tokio::test]
async fn test_session_and_value_references() {
  let api = FakeApi::with_responses(json!({ "profile": { "ok": true } }));
  let scheduler = Scheduler::new(api.clone(), SchedulerConfig::default());
  let mut state = FormState::new(json!({ "user": { "id": "u-9" } }))
    .with_values(serde_json::from_value(json!({ "country": "NO" })).unwrap());

  scheduler
    .run(
      &apis(json!({
        "profile": {
          "url": "/users/${session.user.id}",
          "query": { "country": "${values.country}" },
          "headers": { "authorization": "Bearer ${session.token}" }
        }
      })),
      &mut state,
      &json!({}),
    )
    .await;

  let calls = api.calls_to("profile");
  assert_eq!(calls[0].url, "/users/u-9");
  assert_eq!(calls[0].query["country"], "NO");
  assert_eq!(calls[0].headers["authorization"], "Bearer ");
}
