//! Transport-independent decoding of registry responses
//!
//! Registries in the wild answer with three shapes: a structured error body,
//! an HTML page (usually an authentication redirect) or the expected JSON.
//! Each shape maps to its own [`RegistryError`] variant.

use crate::core::registry::{ErrorResponse, RegistryError};
use serde::de::DeserializeOwned;
use serde_json::Value;

const HTML_DOCTYPE: &str = "<!doctype html";

/// Decode a complete response body into JSON according to its status code
pub fn decode_response(status: u16, reason: Option<&str>, body: &str) -> Result<Value, RegistryError> {
    if !(200..=299).contains(&status) {
        if let Ok(error) = serde_json::from_str::<ErrorResponse>(body) {
            if let Some(message) = error.message.filter(|m| !m.is_empty()) {
                return Err(RegistryError::Server(message));
            }
        }
        return Err(RegistryError::Status {
            status,
            reason: reason.map(str::to_string),
        });
    }

    if is_html(body) {
        return Err(RegistryError::Html(body.to_string()));
    }

    serde_json::from_str(body).map_err(|e| RegistryError::Json(e.to_string()))
}

/// [`decode_response`] followed by conversion into a typed body
pub fn decode_as<T: DeserializeOwned>(
    status: u16,
    reason: Option<&str>,
    body: &str,
) -> Result<T, RegistryError> {
    let value = decode_response(status, reason, body)?;
    serde_json::from_value(value).map_err(|e| RegistryError::Json(e.to_string()))
}

fn is_html(body: &str) -> bool {
    body.trim_start()
        .get(..HTML_DOCTYPE.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(HTML_DOCTYPE))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::core::registry::{CheckedResponse, Extension};
    use serde_json::json;

    #[test]
    fn test_error_field_on_created_is_logical_failure() {
        let ext: Extension = decode_as(201, Some("Created"), r#"{"error":"boom"}"#).unwrap();
        let err = ext.check().unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_server_message_on_failure_status() {
        let err = decode_response(500, Some("Internal Server Error"), r#"{"message":"bad token"}"#)
            .unwrap_err();
        assert!(matches!(err, RegistryError::Server(_)));
        assert!(err.to_string().contains("bad token"));
    }

    #[test]
    fn test_failure_status_without_message_is_generic() {
        let err = decode_response(404, Some("Not Found"), r#"{"error":"Not Found"}"#).unwrap_err();
        assert_eq!(err.to_string(), "The server responded with status 404: Not Found");
    }

    #[test]
    fn test_failure_status_with_unparseable_body() {
        let err = decode_response(502, Some("Bad Gateway"), "<html>proxy error</html>").unwrap_err();
        assert_eq!(err.status(), Some(502));
    }

    #[test]
    fn test_html_body_rejected_with_raw_text() {
        let body = "<!DOCTYPE html><html><body>Sign in</body></html>";
        let err = decode_response(200, Some("OK"), body).unwrap_err();
        assert!(matches!(err, RegistryError::Html(_)));
        assert!(err.to_string().contains(body));
    }

    #[test]
    fn test_html_detection_ignores_case_and_leading_whitespace() {
        assert!(is_html("\n  <!doctype HTML>"));
        assert!(!is_html("{\"html\": true}"));
        assert!(!is_html("<!do"));
    }

    #[test]
    fn test_valid_json_resolves() {
        let value = decode_response(200, Some("OK"), r#"{"name":"x"}"#).unwrap();
        assert_eq!(value, json!({"name": "x"}));
    }

    #[test]
    fn test_malformed_json_is_distinct_failure() {
        let err = decode_response(200, Some("OK"), "{\"name\":").unwrap_err();
        assert!(matches!(err, RegistryError::Json(_)));
    }
}
