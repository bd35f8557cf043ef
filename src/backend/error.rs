//! Backend errors

/// Errors from a backend call
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("{endpoint} returned {status}: {message}")]
    Status {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("Invalid response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Result type for backend calls
pub type BackendResult<T> = Result<T, BackendError>;

impl BackendError {
    /// The request never got an answer from the backend.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, BackendError::Connection(_) | BackendError::Timeout(_))
    }

    /// Whether a "try again" affordance makes sense.
    pub fn is_retryable(&self) -> bool {
        match self {
            BackendError::Connection(_) | BackendError::Timeout(_) => true,
            BackendError::Status { status, .. } => *status == 408 || *status == 429 || *status >= 500,
            BackendError::Decode { .. } | BackendError::InvalidUrl(_) => false,
        }
    }

    /// HTTP status, when the backend answered
    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
