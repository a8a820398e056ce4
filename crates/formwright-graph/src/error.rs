use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
  #[error("invalid path '{path}': {message}")]
  InvalidPath { path: String, message: String },

  #[error("dependency cycle between API sources: {}", members.join(" -> "))]
  Cycle { members: Vec<String> },

  #[error("API source '{descriptor}' references unknown source '{source_name}'")]
  UnknownSource {
    descriptor: String,
    source_name: String,
  },
}
