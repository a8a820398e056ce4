//! Dot-path addressing into JSON documents.
//!
//! `users[0].address.city` walks keys and array subscripts. A key applied to
//! an array is applied to each element, which is what lets
//! `${api.users.id}` address the ids of every user.

use std::fmt;

use serde_json::Value;

use crate::error::GraphError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
  Key(String),
  Index(usize),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JsonPath {
  segments: Vec<PathSegment>,
}

impl JsonPath {
  /// The empty path, addressing the document itself.
  pub fn root() -> Self {
    Self::default()
  }

  /// Parse a dot path such as `rows[2].name`.
  pub fn parse(path: &str) -> Result<Self, GraphError> {
    let invalid = |message: &str| GraphError::InvalidPath {
      path: path.to_string(),
      message: message.to_string(),
    };

    let mut segments = Vec::new();
    if path.is_empty() {
      return Ok(Self { segments });
    }

    for part in path.split('.') {
      if part.is_empty() {
        return Err(invalid("empty segment"));
      }

      let (key, mut rest) = match part.find('[') {
        Some(pos) => (&part[..pos], &part[pos..]),
        None => (part, ""),
      };
      if !key.is_empty() {
        segments.push(PathSegment::Key(key.to_string()));
      }

      while !rest.is_empty() {
        let Some(inner) = rest.strip_prefix('[') else {
          return Err(invalid("unexpected characters after subscript"));
        };
        let Some(close) = inner.find(']') else {
          return Err(invalid("unterminated subscript"));
        };
        let index = inner[..close]
          .trim()
          .parse::<usize>()
          .map_err(|_| invalid("subscript is not an array index"))?;
        segments.push(PathSegment::Index(index));
        rest = &inner[close + 1..];
      }
    }

    Ok(Self { segments })
  }

  /// Build a path from literal keys, e.g. a component's `dataPath`.
  pub fn from_keys<I, S>(keys: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      segments: keys
        .into_iter()
        .map(|k| PathSegment::Key(k.into()))
        .collect(),
    }
  }

  pub fn segments(&self) -> &[PathSegment] {
    &self.segments
  }

  pub fn is_empty(&self) -> bool {
    self.segments.is_empty()
  }

  /// Split off the leading key, e.g. the source name of `users.id`.
  pub fn split_first_key(&self) -> Option<(&str, JsonPath)> {
    match self.segments.split_first() {
      Some((PathSegment::Key(key), rest)) => Some((
        key.as_str(),
        JsonPath {
          segments: rest.to_vec(),
        },
      )),
      _ => None,
    }
  }

  /// Append another path.
  pub fn join(&self, other: &JsonPath) -> JsonPath {
    let mut segments = self.segments.clone();
    segments.extend(other.segments.iter().cloned());
    JsonPath { segments }
  }

  /// First non-null value at this path.
  ///
  /// Keys applied to arrays search the elements in order and return the
  /// first match.
  pub fn first<'a>(&self, value: &'a Value) -> Option<&'a Value> {
    first_in(&self.segments, value)
  }

  /// Every non-null value at this path, flattening a trailing array one
  /// level.
  pub fn all<'a>(&self, value: &'a Value) -> Vec<&'a Value> {
    let mut out = Vec::new();
    collect_in(&self.segments, value, &mut out);
    out
  }
}

fn first_in<'a>(segments: &[PathSegment], value: &'a Value) -> Option<&'a Value> {
  let Some((head, rest)) = segments.split_first() else {
    return (!value.is_null()).then_some(value);
  };

  match (head, value) {
    (PathSegment::Key(key), Value::Object(map)) => first_in(rest, map.get(key)?),
    (PathSegment::Key(_), Value::Array(items)) => {
      items.iter().find_map(|item| first_in(segments, item))
    }
    (PathSegment::Index(index), Value::Array(items)) => first_in(rest, items.get(*index)?),
    _ => None,
  }
}

fn collect_in<'a>(segments: &[PathSegment], value: &'a Value, out: &mut Vec<&'a Value>) {
  let Some((head, rest)) = segments.split_first() else {
    match value {
      Value::Null => {}
      Value::Array(items) => out.extend(items.iter().filter(|v| !v.is_null())),
      other => out.push(other),
    }
    return;
  };

  match (head, value) {
    (PathSegment::Key(key), Value::Object(map)) => {
      if let Some(next) = map.get(key) {
        collect_in(rest, next, out);
      }
    }
    (PathSegment::Key(_), Value::Array(items)) => {
      for item in items {
        collect_in(segments, item, out);
      }
    }
    (PathSegment::Index(index), Value::Array(items)) => {
      if let Some(next) = items.get(*index) {
        collect_in(rest, next, out);
      }
    }
    _ => {}
  }
}

impl fmt::Display for JsonPath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, segment) in self.segments.iter().enumerate() {
      match segment {
        PathSegment::Key(key) if i == 0 => write!(f, "{}", key)?,
        PathSegment::Key(key) => write!(f, ".{}", key)?,
        PathSegment::Index(index) => write!(f, "[{}]", index)?,
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_parse_keys_and_subscripts() {
    let path = JsonPath::parse("rows[2].name").unwrap();
    assert_eq!(
      path.segments(),
      &[
        PathSegment::Key("rows".to_string()),
        PathSegment::Index(2),
        PathSegment::Key("name".to_string()),
      ]
    );
    assert_eq!(path.to_string(), "rows[2].name");
  }

  #[test]
  fn test_parse_errors() {
    assert!(JsonPath::parse("a..b").is_err());
    assert!(JsonPath::parse("a[x]").is_err());
    assert!(JsonPath::parse("a[1").is_err());
    assert!(JsonPath::parse("a[1]b").is_err());
  }

  #[test]
  fn test_first_searches_arrays() {
    let doc = json!({
      "users": [
        { "name": "no id" },
        { "id": null },
        { "id": 7 },
        { "id": 8 }
      ]
    });

    let path = JsonPath::parse("users.id").unwrap();
    assert_eq!(path.first(&doc), Some(&json!(7)));
    assert_eq!(
      JsonPath::parse("users[3].id").unwrap().first(&doc),
      Some(&json!(8))
    );
    assert_eq!(JsonPath::parse("users.email").unwrap().first(&doc), None);
  }

  #[test]
  fn test_all_collects_every_match() {
    let doc = json!({
      "teams": [
        { "members": [{ "id": 1 }, { "id": 2 }] },
        { "members": [{ "id": 3 }] }
      ],
      "tags": ["a", null, "b"]
    });

    let ids: Vec<_> = JsonPath::parse("teams.members.id").unwrap().all(&doc);
    assert_eq!(ids, vec![&json!(1), &json!(2), &json!(3)]);

    let tags = JsonPath::parse("tags").unwrap().all(&doc);
    assert_eq!(tags, vec![&json!("a"), &json!("b")]);
  }

  #[test]
  fn test_split_first_key() {
    let path = JsonPath::parse("users[0].id").unwrap();
    let (name, rest) = path.split_first_key().unwrap();
    assert_eq!(name, "users");
    assert_eq!(rest.to_string(), "[0].id");
  }
}
