//! HTTP plumbing for the Daily X backend.
//!
//! DESIGN
//! ======
//! `auth_api` sits behind a trait so the session store can be driven by a
//! mock in tests; `expense_api` is a concrete client because nothing but the
//! CLI consumes it. Response parsing is kept in pure functions next to each
//! client so the wire rules (error bodies on HTTP 200, raw `Authorization`
//! header) are testable without a server.

pub mod auth_api;
pub mod error;
pub mod expense_api;
pub mod types;

use std::time::Duration;

use crate::config::HttpTimeouts;
use error::ApiError;

/// Build the shared `reqwest` client with the configured timeouts.
pub(crate) fn build_http_client(timeouts: HttpTimeouts) -> Result<reqwest::Client, ApiError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeouts.request_secs))
        .connect_timeout(Duration::from_secs(timeouts.connect_secs))
        .build()
        .map_err(|e| ApiError::HttpClientBuild(e.to_string()))
}

/// Shared response screening for every backend endpoint: error-shaped bodies
/// become [`ApiError::Reported`], other non-2xx statuses [`ApiError::Status`].
pub(crate) fn check_body(status: u16, body: &str) -> Result<serde_json::Value, ApiError> {
    let success = (200..300).contains(&status);
    if success && body.trim().is_empty() {
        return Ok(serde_json::Value::Null);
    }
    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) if !success => return Err(ApiError::Status { status, body: body.to_owned() }),
        Err(e) => return Err(ApiError::Parse(e.to_string())),
    };
    if let Some(error) = value.get("error").filter(|e| is_truthy(e)) {
        return Err(ApiError::Reported { status, message: error_message(error) });
    }
    if !success {
        return Err(ApiError::Status { status, body: body.to_owned() });
    }
    Ok(value)
}

/// JavaScript truthiness: `null`, `false`, `0` and `""` do not signal an
/// error.
fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(flag) => *flag,
        serde_json::Value::Number(number) => number.as_f64().is_some_and(|n| n.abs() > 0.0),
        serde_json::Value::String(text) => !text.is_empty(),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => true,
    }
}

fn error_message(error: &serde_json::Value) -> String {
    match error {
        serde_json::Value::String(message) => message.clone(),
        serde_json::Value::Object(map) => match map.get("message") {
            Some(serde_json::Value::String(message)) => message.clone(),
            _ => error.to_string(),
        },
        other => other.to_string(),
    }
}
