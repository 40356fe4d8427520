//! Error types for API models and responses.

use thiserror::Error;

/// Errors that can occur when reading or building API resources.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with an unexpected status.
    #[error("unexpected status {status}: {message}")]
    Status {
        status: u16,
        message: String,
        reason: Option<String>,
    },

    /// The resource was modified concurrently (HTTP 409).
    #[error("conflict updating {kind} {name}: {message}")]
    Conflict {
        kind: String,
        name: String,
        message: String,
    },

    /// The device reports a rendered version that is not a positive integer.
    #[error("invalid rendered version {0:?}")]
    InvalidRenderedVersion(String),

    /// A field the caller relies on is absent.
    #[error("{kind} {name} has no {field}")]
    MissingField {
        kind: &'static str,
        name: String,
        field: &'static str,
    },

    /// JSON (de)serialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML (de)serialization failed.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ApiError {
    /// Create a status error.
    pub fn status(status: u16, message: impl Into<String>, reason: Option<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
            reason,
        }
    }

    /// Create a missing field error.
    pub fn missing(kind: &'static str, name: impl Into<String>, field: &'static str) -> Self {
        Self::MissingField {
            kind,
            name: name.into(),
            field,
        }
    }

    /// HTTP status code, when this error came from a response.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Conflict { .. } => Some(409),
            _ => None,
        }
    }

    /// Whether the server reported the resource as missing.
    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }
}
