use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use crate::error::HostError;

/// A member of a directory group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryMember {
  /// Unique member identifier, e.g. a uid.
  pub id: String,
  /// Display label.
  pub label: String,
}

impl DirectoryMember {
  pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      label: label.into(),
    }
  }
}

/// Organizational directory lookup.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
  /// Members of the given groups, in group order. A member of several groups
  /// may appear more than once.
  async fn members(&self, groups: &[String]) -> Result<Vec<DirectoryMember>, HostError>;
}

/// In-memory directory keyed by group name.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
  groups: HashMap<String, Vec<DirectoryMember>>,
}

impl StaticDirectory {
  pub fn new(groups: HashMap<String, Vec<DirectoryMember>>) -> Self {
    Self { groups }
  }

  /// Load a JSON file of the form `{ "group": [{ "id": …, "label": … }] }`.
  pub async fn from_file(path: &Path) -> Result<Self, HostError> {
    let content = fs::read_to_string(path).await?;
    let groups: HashMap<String, Vec<DirectoryMember>> = serde_json::from_str(&content)?;
    Ok(Self { groups })
  }

  pub fn insert(&mut self, group: impl Into<String>, members: Vec<DirectoryMember>) {
    self.groups.insert(group.into(), members);
  }
}

#[async_trait]
impl DirectoryClient for StaticDirectory {
  async fn members(&self, groups: &[String]) -> Result<Vec<DirectoryMember>, HostError> {
    let mut members = Vec::new();
    for group in groups {
      match self.groups.get(group) {
        Some(found) => members.extend(found.iter().cloned()),
        None => debug!(group = %group, "directory_group_not_found"),
      }
    }
    Ok(members)
  }
}
