//! Error types
//!
//! Every fallible library call returns [`Result`]. Nothing in the crate retries
//! or swallows an error; response payloads are attached where one exists.

use crate::filter::FilterError;
use serde_json::Value;
use thiserror::Error;

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, Error>;

/// Library error
#[derive(Debug, Error)]
pub enum Error {
    /// The API answered with a non-success status
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A successful response did not have the shape the caller depends on
    #[error("unexpected response: {message}")]
    UnexpectedResponse { message: String, json: Value },

    /// Attempt to set a field that is not declared mutable
    #[error("cannot set immutable field '{field}' on {kind}")]
    ImmutableField { kind: String, field: String },

    /// The resource type declares no such field
    #[error("{kind} has no field '{field}'")]
    UnknownField { kind: String, field: String },

    /// No resource definition is registered under this key
    #[error("unknown resource type '{0}'")]
    UnknownType(String),

    #[error(transparent)]
    Filter(#[from] FilterError),

    /// Malformed input rejected before any request is sent
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A resource definition failed validation while loading the registry
    #[error("invalid resource definition: {0}")]
    Registry(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn unexpected(message: impl Into<String>, json: &Value) -> Self {
        Error::UnexpectedResponse {
            message: message.into(),
            json: json.clone(),
        }
    }

    /// The API error behind this error, if any
    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            Error::Api(e) => Some(e),
            _ => None,
        }
    }
}

/// Non-success HTTP response from the API
#[derive(Debug, Clone, Error)]
#[error("API request failed: {status} {}", .messages.join("; "))]
pub struct ApiError {
    /// HTTP status code
    pub status: u16,
    /// `reason` strings from the `errors` array, if the body had one
    pub messages: Vec<String>,
    /// Parsed body, or the raw text as a JSON string when it was not JSON
    pub json: Value,
}

impl ApiError {
    /// Build from a status and the raw response body
    pub fn from_response(status: u16, body: &str) -> Self {
        let json = serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()));
        let messages = error_reasons(&json);
        Self {
            status,
            messages,
            json,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}

/// Collect `errors[].reason` (and a bare `error` string) from a response body
fn error_reasons(json: &Value) -> Vec<String> {
    let mut reasons: Vec<String> = json
        .get("errors")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|e| {
                    let reason = e.get("reason").and_then(|r| r.as_str())?;
                    Some(match e.get("field").and_then(|f| f.as_str()) {
                        Some(field) => format!("{}: {}", field, reason),
                        None => reason.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    if let Some(error) = json.get("error").and_then(|v| v.as_str()) {
        reasons.push(error.to_string());
    }

    reasons
}

/// Whether a 2xx body signals a soft failure
pub fn has_error_marker(json: &Value) -> bool {
    json.get("error").is_some() || json.get("errors").is_some()
}

/// Format an API error for display
/// Security: generic messages per status class, never the raw body
pub fn format_api_error(error: &Error) -> String {
    if let Some(api) = error.as_api() {
        return match api.status {
            401 => "Authentication failed. Check your API token.".to_string(),
            403 => "Permission denied. Check your token's scopes.".to_string(),
            404 => "Resource not found.".to_string(),
            409 => "Resource conflict. The resource may already exist or be in use.".to_string(),
            429 => "Rate limit exceeded. Please try again later.".to_string(),
            400 => match api.messages.first() {
                Some(reason) => format!("Invalid request: {}", truncate(reason, 80)),
                None => "Invalid request. Check your parameters.".to_string(),
            },
            500..=599 => "Service temporarily unavailable. Please try again.".to_string(),
            _ => "Request failed. Check your network connection and try again.".to_string(),
        };
    }

    truncate(&error.to_string(), 80)
}

fn truncate(message: &str, max: usize) -> String {
    let sanitized = message
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .take(max)
        .collect::<String>();

    if sanitized.len() < message.len() {
        format!("{}...", sanitized)
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_api_error_collects_reasons() {
        let body = json!({
            "errors": [
                {"reason": "Not found"},
                {"reason": "must be unique", "field": "label"}
            ]
        })
        .to_string();

        let err = ApiError::from_response(404, &body);
        assert!(err.is_not_found());
        assert_eq!(err.messages, vec!["Not found", "label: must be unique"]);
        assert_eq!(err.json["errors"][0]["reason"], "Not found");
    }

    #[test]
    fn test_api_error_keeps_non_json_body() {
        let err = ApiError::from_response(502, "<html>bad gateway</html>");
        assert!(err.messages.is_empty());
        assert_eq!(err.json, Value::String("<html>bad gateway</html>".to_string()));
    }

    #[test]
    fn test_error_marker() {
        assert!(has_error_marker(&json!({"error": "nope"})));
        assert!(has_error_marker(&json!({"errors": []})));
        assert!(!has_error_marker(&json!({"id": 1})));
        assert!(!has_error_marker(&json!({})));
    }

    #[test]
    fn test_format_api_error_by_status() {
        let err = Error::Api(ApiError::from_response(403, "{}"));
        assert_eq!(
            format_api_error(&err),
            "Permission denied. Check your token's scopes."
        );

        let err = Error::Api(ApiError::from_response(
            400,
            r#"{"errors":[{"reason":"bad region","field":"region"}]}"#,
        ));
        assert_eq!(format_api_error(&err), "Invalid request: region: bad region");

        let err = Error::Api(ApiError::from_response(503, ""));
        assert!(format_api_error(&err).contains("temporarily unavailable"));
    }

    #[test]
    fn test_format_local_error_truncates() {
        let err = Error::InvalidInput("x".repeat(200));
        let msg = format_api_error(&err);
        assert!(msg.ends_with("..."));
        assert!(msg.len() <= 83);
    }
}
