//! Error types for the API client.
//!
//! [`ClientError`] is what every request returns on failure. [`RefreshError`] is the
//! outcome of a failed token refresh; it is `Clone` because one failure is handed to
//! every request that was queued behind the refresh.

use reqwest::StatusCode;
use serde_json::Value;

/// The decoded body of a non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiErrorBody {
    /// No body at all.
    Empty,
    /// `{"detail": "..."}`
    Detail(String),
    /// Field-keyed validation errors, in the order the backend sent them.
    Fields(Vec<(String, Vec<String>)>),
    /// Anything that is not a JSON object.
    Raw(String),
}

impl ApiErrorBody {
    pub fn parse(body: &[u8]) -> Self {
        if body.iter().all(u8::is_ascii_whitespace) {
            return ApiErrorBody::Empty;
        }

        let value: Value = match serde_json::from_slice(body) {
            Ok(v) => v,
            Err(_) => return ApiErrorBody::Raw(String::from_utf8_lossy(body).trim().to_string()),
        };

        let Value::Object(map) = value else {
            return ApiErrorBody::Raw(value.to_string());
        };

        if let Some(Value::String(detail)) = map.get("detail") {
            return ApiErrorBody::Detail(detail.clone());
        }

        let fields = map
            .into_iter()
            .map(|(field, messages)| (field, messages_of(messages)))
            .collect();
        ApiErrorBody::Fields(fields)
    }

    /// Messages reported against one field of a validation body.
    pub fn messages_for(&self, field: &str) -> Option<&[String]> {
        match self {
            ApiErrorBody::Fields(fields) => fields
                .iter()
                .find(|(name, _)| name == field)
                .map(|(_, msgs)| msgs.as_slice()),
            _ => None,
        }
    }

    /// One display line: `field: msg1, msg2, other: msg3`, or the detail text.
    pub fn summary(&self) -> String {
        match self {
            ApiErrorBody::Empty => String::new(),
            ApiErrorBody::Detail(detail) => detail.clone(),
            ApiErrorBody::Raw(raw) => raw.clone(),
            ApiErrorBody::Fields(fields) => fields
                .iter()
                .map(|(field, msgs)| format!("{field}: {}", msgs.join(", ")))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

fn messages_of(value: Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s],
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        other => vec![other.to_string()],
    }
}

/// Reads the top-level `code` string of a JSON error body.
pub(crate) fn error_code(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    value.get("code")?.as_str().map(str::to_owned)
}

/// Why a token refresh did not produce a new access token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    #[error("no refresh token available")]
    MissingRefreshToken,
    #[error("refresh rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("network error during refresh: {0}")]
    Transport(String),
    #[error("refresh request timed out")]
    Timeout,
    #[error("malformed refresh response: {0}")]
    Malformed(String),
    #[error("refresh was abandoned before it completed")]
    Abandoned,
    #[error("could not persist refreshed token: {0}")]
    Storage(String),
}

impl From<reqwest::Error> for RefreshError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RefreshError::Timeout
        } else {
            RefreshError::Transport(err.to_string())
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("request timed out")]
    Timeout,
    #[error("request failed with status {status}: {}", body.summary())]
    Api { status: StatusCode, body: ApiErrorBody },
    #[error("session refresh failed: {0}")]
    Refresh(#[from] RefreshError),
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("not logged in")]
    NotAuthenticated,
    #[error("session storage error: {0}")]
    Storage(String),
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("{0}")]
    InvalidInput(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else {
            ClientError::Transport(err)
        }
    }
}

impl ClientError {
    /// HTTP status of a backend rejection, if that is what this is.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    /// True when the session is gone and the user has to log in again.
    ///
    /// An abandoned refresh leaves the session intact and is not terminal.
    pub fn is_auth_terminal(&self) -> bool {
        match self {
            ClientError::Refresh(err) => *err != RefreshError::Abandoned,
            ClientError::NotAuthenticated | ClientError::InvalidCredentials => true,
            _ => false,
        }
    }

    /// Text suitable for showing to an operator.
    ///
    /// Validation bodies are flattened to `field: msg1, msg2, other: msg3`; a
    /// `detail` message wins over everything else; transport errors fall back to
    /// their own message.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Api { status, body } => {
                let summary = body.summary();
                if summary.is_empty() {
                    format!("Request failed with status {status}")
                } else {
                    summary
                }
            }
            other => other.to_string(),
        }
    }
}
