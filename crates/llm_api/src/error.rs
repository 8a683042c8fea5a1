use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Error as JsonError;

#[derive(Debug)]
pub enum LlmApiError {
    MissingModel,
    InvalidBaseUrl(String),
    Request(reqwest::Error),
    Status(StatusCode, String),
    Serde(JsonError),
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayload {
    pub error: Option<String>,
}

impl LlmApiError {
    /// True when the request exceeded the configured client timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Request(error) if error.is_timeout())
    }

    /// True when the service could not be reached at all.
    pub fn is_connect(&self) -> bool {
        matches!(self, Self::Request(error) if error.is_connect())
    }

    /// Short stable label for the failure class, suitable for logs and
    /// user-facing messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingModel => "MissingModel",
            Self::InvalidBaseUrl(_) => "InvalidBaseUrl",
            Self::Request(error) if error.is_timeout() => "Timeout",
            Self::Request(error) if error.is_connect() => "ConnectionError",
            Self::Request(error) if error.is_decode() => "DecodeError",
            Self::Request(error) if error.is_body() => "BodyError",
            Self::Request(_) => "RequestError",
            Self::Status(..) => "HTTPError",
            Self::Serde(_) => "JSONDecodeError",
        }
    }
}

impl fmt::Display for LlmApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingModel => write!(f, "model name is required"),
            Self::InvalidBaseUrl(value) => write!(f, "invalid base URL: {value}"),
            Self::Request(error) => write!(f, "request error: {error}"),
            Self::Status(status, message) => write!(f, "HTTP {status} {message}"),
            Self::Serde(error) => write!(f, "serialization error: {error}"),
        }
    }
}

impl std::error::Error for LlmApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Request(error) => Some(error),
            Self::Serde(error) => Some(error),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for LlmApiError {
    fn from(error: reqwest::Error) -> Self {
        Self::Request(error)
    }
}

impl From<JsonError> for LlmApiError {
    fn from(error: JsonError) -> Self {
        Self::Serde(error)
    }
}

/// Extracts the service's `{"error": "..."}` message, falling back to the raw
/// body or the status reason.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(ErrorPayload { error: Some(message) }) = serde_json::from_str::<ErrorPayload>(body) {
        if !message.trim().is_empty() {
            return message;
        }
    }

    if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.trim().to_string()
    }
}
