//! Remote service error taxonomy.
//!
//! Transport failures, non-success statuses (with or without a readable
//! body) and undecodable success bodies each get their own variant so
//! call sites can log and surface them uniformly.

use reqwest::StatusCode;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Cannot reach server at {0}")]
    Connection(String),
    #[error("Request timed out")]
    Timeout,
    #[error("Request failed: {0}")]
    Transport(String),
    /// Non-success status. `message` comes from the JSON body when there
    /// is one, otherwise it is `HTTP <status>`.
    #[error("{message}")]
    Status { status: u16, message: String },
    #[error("Unexpected response: {0}")]
    Decode(String),
    /// Success status, but the body says the operation did not happen.
    #[error("{0}")]
    Rejected(String),
}

impl ApiError {
    pub(crate) fn from_reqwest(err: reqwest::Error, base_url: &str) -> Self {
        if err.is_connect() {
            ApiError::Connection(base_url.to_string())
        } else if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }

    /// Build the error for a non-success response, reading its body.
    pub(crate) async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("application/json"));

        let body = if is_json {
            response.json::<Value>().await.ok()
        } else {
            None
        };
        ApiError::Status {
            status: status.as_u16(),
            message: status_message(status, body.as_ref()),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED.as_u16())
    }
}

/// User-facing message for a failed response.
///
/// Prefers the body's `error`, then `message`, then `detail`; falls back
/// to the whole body as JSON, then to `HTTP <status>` when nothing is
/// readable.
pub fn status_message(status: StatusCode, body: Option<&Value>) -> String {
    let Some(body) = body.filter(|b| !b.is_null()) else {
        return format!("HTTP {}", status.as_u16());
    };

    ["error", "message", "detail"]
        .iter()
        .filter_map(|key| body.get(*key))
        .find_map(|v| match v {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Null | Value::Bool(false) | Value::String(_) => None,
            other => Some(other.to_string()),
        })
        .unwrap_or_else(|| body.to_string())
}
