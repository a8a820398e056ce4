//! Render error types.

use formwright_host::HostError;

/// Errors that can occur while rendering a form.
///
/// Only [`RenderError::PrimaryQuery`] and [`RenderError::MissingSchema`] fail
/// a render; the others are logged and recorded in the render report.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
  /// The primary query could not be obtained.
  #[error("primary query failed: {source}")]
  PrimaryQuery {
    #[source]
    source: HostError,
  },

  /// The form definition has no component schema.
  #[error("form '{form_id}' has no schema")]
  MissingSchema { form_id: String },

  /// A resolved descriptor no longer has the shape of a request.
  #[error("API source '{source_name}' did not resolve to a valid request: {message}")]
  TemplateParse {
    source_name: String,
    message: String,
  },

  /// A call to an external collaborator failed.
  #[error("external call '{target}' failed: {source}")]
  ExternalCall {
    target: String,
    #[source]
    source: HostError,
  },

  /// A component could not be hydrated.
  #[error("failed to hydrate component '{key}': {message}")]
  Hydration { key: String, message: String },
}
