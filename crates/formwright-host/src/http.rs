//! Shared reqwest helpers.

use reqwest::{Method, Response};
use url::Url;

use crate::error::HostError;

pub(crate) fn parse_method(method: &str) -> Result<Method, HostError> {
  match method.to_uppercase().as_str() {
    "GET" => Ok(Method::GET),
    "POST" => Ok(Method::POST),
    "PUT" => Ok(Method::PUT),
    "DELETE" => Ok(Method::DELETE),
    "PATCH" => Ok(Method::PATCH),
    "HEAD" => Ok(Method::HEAD),
    "OPTIONS" => Ok(Method::OPTIONS),
    _ => Err(HostError::InvalidRequest {
      field: "method".to_string(),
      message: format!("unsupported HTTP method: {}", method),
    }),
  }
}

/// Parse an absolute URL, or join a relative one onto `base`.
pub(crate) fn resolve_url(base: Option<&Url>, raw: &str) -> Result<Url, HostError> {
  let invalid = |e: url::ParseError| HostError::InvalidUrl {
    url: raw.to_string(),
    message: e.to_string(),
  };

  match Url::parse(raw) {
    Ok(url) => Ok(url),
    Err(url::ParseError::RelativeUrlWithoutBase) => match base {
      Some(base) => base.join(raw).map_err(invalid),
      None => Err(HostError::InvalidUrl {
        url: raw.to_string(),
        message: "relative url without a configured base url".to_string(),
      }),
    },
    Err(e) => Err(invalid(e)),
  }
}

/// Read a response body as JSON, falling back to a JSON string.
pub(crate) async fn read_body(response: Response) -> Result<serde_json::Value, HostError> {
  let url = response.url().to_string();
  let status = response.status();
  let body = response.text().await?;

  if !status.is_success() {
    return Err(HostError::Status {
      url,
      status: status.as_u16(),
      body,
    });
  }

  if body.trim().is_empty() {
    return Ok(serde_json::Value::Null);
  }
  Ok(serde_json::from_str(&body).unwrap_or(serde_json::Value::String(body)))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_method() {
    assert_eq!(parse_method("post").unwrap(), Method::POST);
    assert!(parse_method("FETCH").is_err());
  }

  #[test]
  fn test_resolve_url() {
    let base = Url::parse("https://api.example.com/v1/").unwrap();
    assert_eq!(
      resolve_url(Some(&base), "users").unwrap().as_str(),
      "https://api.example.com/v1/users"
    );
    assert_eq!(
      resolve_url(None, "https://other.example.com/x").unwrap().as_str(),
      "https://other.example.com/x"
    );
    assert!(matches!(
      resolve_url(None, "/users"),
      Err(HostError::InvalidUrl { .. })
    ));
  }
}
