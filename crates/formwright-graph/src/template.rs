//! Template references embedded in descriptor strings.
//!
//! ```text
//! ${api.<name>[.<path>]}     a named API result
//! ${graph.<path>}            the primary query result
//! ${session.<path>}          the read-only session context
//! ${values.<key>[.<path>]}   a current field value
//! ```
//!
//! Anything else inside `${…}` is kept as literal text.

use std::fmt;

use crate::path::JsonPath;

/// A reference to a value that only exists at render time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Reference {
  Api { name: String, path: JsonPath },
  Graph { path: JsonPath },
  Session { path: JsonPath },
  Value { key: String, path: JsonPath },
}

impl Reference {
  /// Parse the inside of a `${…}` marker.
  pub fn parse(expr: &str) -> Option<Self> {
    let (scope, rest) = expr.trim().split_once('.')?;
    let path = JsonPath::parse(rest).ok()?;
    if path.is_empty() {
      return None;
    }

    match scope {
      "api" => {
        let (name, path) = path.split_first_key()?;
        Some(Reference::Api {
          name: name.to_string(),
          path,
        })
      }
      "values" => {
        let (key, path) = path.split_first_key()?;
        Some(Reference::Value {
          key: key.to_string(),
          path,
        })
      }
      "graph" => Some(Reference::Graph { path }),
      "session" => Some(Reference::Session { path }),
      _ => None,
    }
  }
}

impl fmt::Display for Reference {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let (scope, head, path) = match self {
      Reference::Api { name, path } => ("api", Some(name), path),
      Reference::Value { key, path } => ("values", Some(key), path),
      Reference::Graph { path } => ("graph", None, path),
      Reference::Session { path } => ("session", None, path),
    };

    write!(f, "{}", scope)?;
    if let Some(head) = head {
      write!(f, ".{}", head)?;
    }
    match path.segments().first() {
      None => Ok(()),
      Some(crate::PathSegment::Index(_)) if head.is_some() => write!(f, "{}", path),
      Some(_) => write!(f, ".{}", path),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  Literal(String),
  Reference(Reference),
}

/// A parsed templateable string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
  segments: Vec<Segment>,
}

impl Template {
  pub fn parse(input: &str) -> Self {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut rest = input;

    while let Some(start) = rest.find("${") {
      let after = &rest[start + 2..];
      let Some(end) = after.find('}') else {
        break;
      };

      literal.push_str(&rest[..start]);
      match Reference::parse(&after[..end]) {
        Some(reference) => {
          if !literal.is_empty() {
            segments.push(Segment::Literal(std::mem::take(&mut literal)));
          }
          segments.push(Segment::Reference(reference));
        }
        None => literal.push_str(&rest[start..start + 2 + end + 1]),
      }
      rest = &after[end + 1..];
    }

    literal.push_str(rest);
    if !literal.is_empty() {
      segments.push(Segment::Literal(literal));
    }

    Self { segments }
  }

  pub fn segments(&self) -> &[Segment] {
    &self.segments
  }

  pub fn references(&self) -> impl Iterator<Item = &Reference> {
    self.segments.iter().filter_map(|segment| match segment {
      Segment::Reference(reference) => Some(reference),
      Segment::Literal(_) => None,
    })
  }

  /// The reference, when the whole string is exactly one marker.
  ///
  /// Such strings are replaced by the referenced value itself, keeping
  /// objects and arrays intact.
  pub fn single_reference(&self) -> Option<&Reference> {
    match self.segments.as_slice() {
      [Segment::Reference(reference)] => Some(reference),
      _ => None,
    }
  }

  pub fn is_literal(&self) -> bool {
    self.references().next().is_none()
  }

  /// Interpolate references into a string. Unresolved references render as
  /// the empty string.
  pub fn render<F>(&self, mut resolve: F) -> String
  where
    F: FnMut(&Reference) -> Option<String>,
  {
    let mut out = String::new();
    for segment in &self.segments {
      match segment {
        Segment::Literal(text) => out.push_str(text),
        Segment::Reference(reference) => {
          if let Some(value) = resolve(reference) {
            out.push_str(&value);
          }
        }
      }
    }
    out
  }
}
