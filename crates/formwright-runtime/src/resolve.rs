//! Template resolution and fan-out expansion of API descriptors.
//!
//! A descriptor is resolved into a JSON object with the shape of a
//! [`ResolvedRequest`] and then deserialized into one. A substitution that
//! breaks that shape (an object landing in a URL, for example) surfaces as
//! [`RenderError::TemplateParse`] and the source is left unresolved.

use std::collections::BTreeMap;

use formwright_config::ApiDescriptor;
use formwright_graph::{Reference, Template};
use formwright_host::ResolvedRequest;
use serde_json::{Map, Value};

use crate::error::RenderError;
use crate::state::FormState;

/// Everything a reference can be resolved against.
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
  pub state: &'a FormState,
  pub graph: &'a Value,
}

impl<'a> ResolveContext<'a> {
  pub fn new(state: &'a FormState, graph: &'a Value) -> Self {
    Self { state, graph }
  }

  fn root(&self, reference: &Reference) -> Option<&'a Value> {
    match reference {
      Reference::Api { name, .. } => self.state.api_result(name),
      Reference::Value { key, .. } => self.state.value(key),
      Reference::Graph { .. } => Some(self.graph),
      Reference::Session { .. } => Some(self.state.session()),
    }
  }

  /// First non-null value at the reference.
  pub fn first(&self, reference: &Reference) -> Option<&'a Value> {
    let root = self.root(reference)?;
    reference_path(reference).first(root)
  }

  /// Every non-null value at the reference, a trailing array flattened.
  pub fn all(&self, reference: &Reference) -> Vec<&'a Value> {
    match self.root(reference) {
      Some(root) => reference_path(reference).all(root),
      None => Vec::new(),
    }
  }
}

fn reference_path(reference: &Reference) -> &formwright_graph::JsonPath {
  match reference {
    Reference::Api { path, .. }
    | Reference::Value { path, .. }
    | Reference::Graph { path }
    | Reference::Session { path } => path,
  }
}

/// The requests one descriptor expands to.
#[derive(Debug, Clone, PartialEq)]
pub struct Expansion {
  pub requests: Vec<ResolvedRequest>,
  /// Whether the requests come from a fan-out axis and their results must be
  /// merged.
  pub fan_out: bool,
}

/// A reference pinned to one element of its values.
struct Axis {
  reference: Reference,
  values: Vec<Value>,
}

struct Resolver<'c, 'a> {
  ctx: &'c ResolveContext<'a>,
  pinned: Option<(&'c Reference, &'c Value)>,
}

impl Resolver<'_, '_> {
  fn lookup(&self, reference: &Reference) -> Option<Value> {
    if let Some((pinned, value)) = self.pinned
      && pinned == reference
    {
      return Some(value.clone());
    }
    self.ctx.first(reference).cloned()
  }

  /// Resolve a string-typed field. A lone reference to a scalar becomes its
  /// string form and an array contributes its first non-null element.
  /// Objects are kept as JSON so the final deserialization rejects them.
  fn string_field(&self, raw: &str) -> Value {
    let template = Template::parse(raw);
    match template.single_reference() {
      Some(reference) => match self.lookup(reference) {
        None | Some(Value::Null) => Value::String(String::new()),
        Some(Value::Array(items)) => items
          .into_iter()
          .find(|item| !item.is_null())
          .map(scalar_string)
          .unwrap_or_else(|| Value::String(String::new())),
        Some(value) => scalar_string(value),
      },
      None => Value::String(self.render(&template)),
    }
  }

  /// Resolve a field of the JSON body. A lone reference keeps the shape of
  /// the referenced value.
  fn data_field(&self, value: &Value) -> Value {
    match value {
      Value::String(raw) => {
        let template = Template::parse(raw);
        match template.single_reference() {
          Some(reference) => self.lookup(reference).unwrap_or(Value::Null),
          None => Value::String(self.render(&template)),
        }
      }
      Value::Array(items) => Value::Array(items.iter().map(|item| self.data_field(item)).collect()),
      Value::Object(map) => Value::Object(
        map
          .iter()
          .map(|(key, item)| (key.clone(), self.data_field(item)))
          .collect(),
      ),
      other => other.clone(),
    }
  }

  fn render(&self, template: &Template) -> String {
    template.render(|reference| self.lookup(reference).map(|value| embed(&value)))
  }

  fn string_map(&self, map: &BTreeMap<String, String>) -> Value {
    Value::Object(
      map
        .iter()
        .map(|(key, raw)| (key.clone(), self.string_field(raw)))
        .collect(),
    )
  }

  fn resolve(&self, name: &str, descriptor: &ApiDescriptor) -> Result<ResolvedRequest, RenderError> {
    let mut query = match self.string_map(&descriptor.query) {
      Value::Object(map) => map,
      _ => Map::new(),
    };
    for (param, raw) in &descriptor.aggregate {
      query.insert(param.clone(), Value::String(aggregate(self.ctx, raw)));
    }

    let mut request = Map::new();
    request.insert("method".to_string(), Value::String(descriptor.method.clone()));
    request.insert("url".to_string(), self.string_field(&descriptor.url));
    request.insert("path".to_string(), self.string_map(&descriptor.path));
    request.insert("query".to_string(), Value::Object(query));
    request.insert("headers".to_string(), self.string_map(&descriptor.headers));
    if let Some(data) = &descriptor.data {
      request.insert("data".to_string(), self.data_field(data));
    }

    serde_json::from_value(Value::Object(request)).map_err(|e| RenderError::TemplateParse {
      source_name: name.to_string(),
      message: e.to_string(),
    })
  }
}

fn scalar_string(value: Value) -> Value {
  match value {
    Value::Number(n) => Value::String(n.to_string()),
    Value::Bool(b) => Value::String(b.to_string()),
    other => other,
  }
}

/// String form of a value embedded in a larger string.
fn embed(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    Value::Null => String::new(),
    other => other.to_string(),
  }
}

/// Comma-join every value of every reference in an `in` template.
fn aggregate(ctx: &ResolveContext<'_>, raw: &str) -> String {
  Template::parse(raw).render(|reference| {
    let joined = ctx
      .all(reference)
      .into_iter()
      .map(embed)
      .collect::<Vec<_>>()
      .join(",");
    Some(joined)
  })
}

/// Find the fan-out axis: the first API or graph reference with more than
/// one value, searching path values, then the URL, then query values.
fn find_axis(descriptor: &ApiDescriptor, ctx: &ResolveContext<'_>) -> Option<Axis> {
  let fields = descriptor
    .path
    .values()
    .chain(std::iter::once(&descriptor.url))
    .chain(descriptor.query.values());

  for raw in fields {
    for reference in Template::parse(raw).references() {
      if !matches!(reference, Reference::Api { .. } | Reference::Graph { .. }) {
        continue;
      }
      let values = ctx.all(reference);
      if values.len() > 1 {
        return Some(Axis {
          reference: reference.clone(),
          values: values.into_iter().cloned().collect(),
        });
      }
    }
  }

  None
}

/// Resolve a descriptor against the current context.
///
/// Produces one request per fan-out element, or a single request when no
/// referenced value has more than one element.
pub fn expand(
  name: &str,
  descriptor: &ApiDescriptor,
  ctx: &ResolveContext<'_>,
) -> Result<Expansion, RenderError> {
  let Some(axis) = find_axis(descriptor, ctx) else {
    let request = Resolver { ctx, pinned: None }.resolve(name, descriptor)?;
    return Ok(Expansion {
      requests: vec![request],
      fan_out: false,
    });
  };

  let requests = axis
    .values
    .iter()
    .map(|value| {
      Resolver {
        ctx,
        pinned: Some((&axis.reference, value)),
      }
      .resolve(name, descriptor)
    })
    .collect::<Result<Vec<_>, _>>()?;

  Ok(Expansion {
    requests,
    fan_out: true,
  })
}

/// Merge fan-out results: nulls are dropped and array results are flattened
/// one level when any result is an array.
pub fn merge_fan_out(results: Vec<Value>) -> Value {
  let results: Vec<Value> = results.into_iter().filter(|v| !v.is_null()).collect();
  if !results.iter().any(Value::is_array) {
    return Value::Array(results);
  }

  let mut merged = Vec::new();
  for result in results {
    match result {
      Value::Array(items) => merged.extend(items),
      other => merged.push(other),
    }
  }
  Value::Array(merged)
}
