//! Error types shared with the backend.

use serde::{Deserialize, Serialize};

/// Error body returned by the backend on non-2xx responses.
///
/// The backend is inconsistent about the field name, so both `message`
/// and `error` (and FastAPI's `detail`) are accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

impl ApiErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Best human-readable message in the body.
    pub fn summary(&self) -> Option<String> {
        if let Some(message) = &self.message {
            return Some(message.clone());
        }
        if let Some(error) = &self.error {
            return Some(error.clone());
        }
        match &self.detail {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
            None => None,
        }
    }
}

/// Media encoding errors.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Not a data URL")]
    NotDataUrl,

    #[error("Data URL is not base64 encoded")]
    NotBase64,

    #[error("Invalid base64 payload: {0}")]
    Decode(String),

    #[error("Unknown media kind: {0}")]
    UnknownKind(String),
}
