use thiserror::Error;

/// Errors raised by external collaborators.
#[derive(Debug, Error)]
pub enum HostError {
  /// Transport-level failure.
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  /// The remote answered with a non-success status.
  #[error("request to {url} failed with status {status}: {body}")]
  Status { url: String, status: u16, body: String },

  #[error("invalid url '{url}': {message}")]
  InvalidUrl { url: String, message: String },

  #[error("invalid request field '{field}': {message}")]
  InvalidRequest { field: String, message: String },

  /// The primary query returned errors or no data.
  #[error("query failed: {message}")]
  Query { message: String },

  #[error("not found: {message}")]
  NotFound { message: String },

  #[error("failed to decode response: {0}")]
  Decode(#[from] serde_json::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}
