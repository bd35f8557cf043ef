//! Session errors and their CLI exit codes

use doorflow_api::{DoorRequirement, MediaKind, MobileStatus};

use crate::backend::BackendError;
use crate::capture::CaptureError;
use crate::store::{ChangeKind, StoreError};

/// Input rejected before anything was changed
pub const EXIT_VALIDATION: i32 = 2;
/// Needs a connection the device does not have
pub const EXIT_OFFLINE: i32 = 3;
/// Replay or upload of offline work failed; the work is still queued
pub const EXIT_SYNC: i32 = 4;
pub const EXIT_BACKEND: i32 = 5;
pub const EXIT_STORE: i32 = 6;

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(", ")
}

/// Errors from `JobWorkerSession` operations.
///
/// Precondition failures (everything up to `Capture`) are raised before the
/// backend or the device store is touched.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Job {job_id} is not available offline")]
    NotAvailableOffline { job_id: String },

    #[error("Device is offline")]
    Offline,

    #[error("No job loaded")]
    NoJobLoaded,

    #[error("Unknown door {door_id}")]
    UnknownDoor { door_id: String },

    #[error("Unknown line item {line_item_id} on door {door_id}")]
    UnknownLineItem { door_id: String, line_item_id: String },

    #[error("Door {door_id} is not ready for sign-off, missing: {}", join(.missing))]
    DoorNotReady {
        door_id: String,
        missing: Vec<DoorRequirement>,
    },

    #[error("Door {door_id} is already completed")]
    DoorAlreadyCompleted { door_id: String },

    #[error("Job is not ready for completion, incomplete doors: {}", join(.incomplete))]
    JobNotReady { incomplete: Vec<String> },

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: MobileStatus, to: MobileStatus },

    #[error("Signer name is required")]
    MissingSignerName,

    #[error("Video upload requires a connection")]
    VideoRequiresConnection,

    #[error("Photo is too large to keep offline ({size} bytes, limit {limit})")]
    PhotoTooLarge { size: usize, limit: usize },

    #[error("Capture failed: {0}")]
    Capture(#[from] CaptureError),

    #[error("Replay of {kind} #{seq} for job {job_id} failed, {remaining} change(s) still queued: {source}")]
    SyncReplayFailure {
        job_id: String,
        seq: u64,
        kind: ChangeKind,
        remaining: usize,
        #[source]
        source: BackendError,
    },

    #[error("Upload of stored {kind} for door {door_id} failed: {source}")]
    MediaUploadFailure {
        door_id: String,
        kind: MediaKind,
        #[source]
        source: BackendError,
    },

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl SessionError {
    /// Process exit code for the CLI
    pub fn exit_code(&self) -> i32 {
        match self {
            SessionError::NotAvailableOffline { .. }
            | SessionError::Offline
            | SessionError::VideoRequiresConnection => EXIT_OFFLINE,
            SessionError::SyncReplayFailure { .. } | SessionError::MediaUploadFailure { .. } => EXIT_SYNC,
            SessionError::Backend(_) => EXIT_BACKEND,
            SessionError::Store(_) => EXIT_STORE,
            _ => EXIT_VALIDATION,
        }
    }

    /// Whether trying the same action again later may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            SessionError::Backend(e) => e.is_retryable(),
            SessionError::SyncReplayFailure { source, .. } | SessionError::MediaUploadFailure { source, .. } => {
                source.is_retryable()
            }
            SessionError::Offline | SessionError::NotAvailableOffline { .. } | SessionError::VideoRequiresConnection => {
                true
            }
            SessionError::Capture(CaptureError::CameraUnavailable { .. }) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(SessionError::MissingSignerName.exit_code(), EXIT_VALIDATION);
        assert_eq!(SessionError::VideoRequiresConnection.exit_code(), EXIT_OFFLINE);
        assert_eq!(
            SessionError::Backend(BackendError::Connection("down".into())).exit_code(),
            EXIT_BACKEND
        );
        let replay = SessionError::SyncReplayFailure {
            job_id: "j1".into(),
            seq: 2,
            kind: ChangeKind::JobStart,
            remaining: 2,
            source: BackendError::Timeout("slow".into()),
        };
        assert_eq!(replay.exit_code(), EXIT_SYNC);
        assert!(replay.is_retryable());
    }

    #[test]
    fn test_messages() {
        let err = SessionError::DoorNotReady {
            door_id: "d1".into(),
            missing: vec![DoorRequirement::LineItem("li1".into()), DoorRequirement::Video],
        };
        assert_eq!(
            err.to_string(),
            "Door d1 is not ready for sign-off, missing: line item li1, video"
        );

        let err = SessionError::JobNotReady {
            incomplete: vec!["d2".into(), "d3".into()],
        };
        assert!(err.to_string().ends_with("d2, d3"));
        assert!(!err.is_retryable());
    }
}
