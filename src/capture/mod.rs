//! Signature and camera capture
//!
//! - `SignaturePad` turns pointer strokes into a greyscale signature image
//! - `CameraCapture` drives a `CameraDevice` for door photos and videos

mod camera;
mod signature;

pub use camera::{CameraCapture, CameraDevice, CameraState, FileCamera};
pub use signature::{Point, Signature, SignaturePad, SignatureStrokes, Stroke, MAX_CANVAS_SIDE, SIGNATURE_CONTENT_TYPE};

/// Capture errors
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Signature is empty")]
    EmptySignature,

    #[error("Camera unavailable: {reason}")]
    CameraUnavailable { reason: String },

    #[error("Camera stream is not open")]
    StreamClosed,

    #[error("Already recording")]
    AlreadyRecording,

    #[error("Not recording")]
    NotRecording,

    #[error("Camera returned no data")]
    EmptyCapture,

    #[error("Device error: {0}")]
    Device(#[source] std::io::Error),

    #[error("Signature canvas {width}x{height} out of range (1..={max} per side)")]
    CanvasSize { width: u32, height: u32, max: u32 },

    #[error("Invalid stroke data: {0}")]
    InvalidStrokes(#[from] serde_json::Error),
}
