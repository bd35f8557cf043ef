//! Mutation request bodies sent by the job worker.

use serde::{Deserialize, Serialize};

use crate::media::{MediaKind, MediaPayload};

/// Body of `POST /mobile/jobs/{id}/start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartJobRequest {
    /// Signature image as a data URL.
    pub signature: String,
    pub signer_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signer_title: Option<String>,
}

/// Body of `POST /mobile/jobs/{id}/doors/{door}/complete`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteDoorRequest {
    pub signature: String,
    pub signer_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signer_title: Option<String>,
}

/// Body of `POST /mobile/jobs/{id}/complete`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteJobRequest {
    pub signature: String,
    pub signer_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signer_title: Option<String>,
}

/// Body of `PUT /mobile/jobs/{id}/doors/{door}/line-items/{item}`.
///
/// Carries the target state rather than a flip so repeating the request
/// has no further effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemRequest {
    pub completed: bool,
}

/// Body of the door photo and video upload endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaUploadRequest {
    pub kind: MediaKind,
    pub content_type: String,
    /// Base64 of the raw bytes.
    pub data: String,
    pub size: u64,
    pub content_sha256: String,
}

impl MediaUploadRequest {
    pub fn new(kind: MediaKind, payload: &MediaPayload) -> Self {
        use base64::Engine;
        Self {
            kind,
            content_type: payload.content_type.clone(),
            data: base64::engine::general_purpose::STANDARD.encode(&payload.data),
            size: payload.len() as u64,
            content_sha256: payload.sha256(),
        }
    }
}
