//! Camera capture
//!
//! `CameraCapture` owns the stream lifecycle (open, photo, record, close)
//! over a `CameraDevice`. Devices report plain I/O errors; the capture
//! layer maps them to `CaptureError`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use doorflow_api::MediaPayload;
use tracing::{debug, warn};

use super::CaptureError;

/// Hardware (or stand-in) behind a `CameraCapture`
pub trait CameraDevice {
    /// Acquire the stream
    fn acquire(&mut self) -> io::Result<()>;

    /// Grab the current frame as a still image
    fn grab_frame(&mut self) -> io::Result<MediaPayload>;

    fn start_recording(&mut self) -> io::Result<()>;

    /// Finish recording and return the encoded clip
    fn stop_recording(&mut self) -> io::Result<MediaPayload>;

    /// Release the stream; must be safe to call more than once
    fn release(&mut self);
}

/// Stream state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraState {
    Closed,
    Open,
    Recording,
}

/// Photo and video capture over a device
pub struct CameraCapture<D: CameraDevice> {
    device: D,
    state: CameraState,
    last_error: Option<String>,
}

impl<D: CameraDevice> CameraCapture<D> {
    pub fn new(device: D) -> Self {
        Self {
            device,
            state: CameraState::Closed,
            last_error: None,
        }
    }

    pub fn state(&self) -> CameraState {
        self.state
    }

    /// Reason the last open attempt failed, if it did
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Acquire the stream. Opening an open stream is a no-op.
    pub fn open(&mut self) -> Result<(), CaptureError> {
        if self.state != CameraState::Closed {
            return Ok(());
        }
        match self.device.acquire() {
            Ok(()) => {
                self.state = CameraState::Open;
                self.last_error = None;
                debug!("camera stream open");
                Ok(())
            }
            Err(e) => {
                let reason = e.to_string();
                warn!(reason = %reason, "camera unavailable");
                self.last_error = Some(reason.clone());
                Err(CaptureError::CameraUnavailable { reason })
            }
        }
    }

    /// Try to open again after `CameraUnavailable`
    pub fn retry(&mut self) -> Result<(), CaptureError> {
        self.open()
    }

    /// Freeze the current frame into a photo
    pub fn capture_photo(&mut self) -> Result<MediaPayload, CaptureError> {
        if self.state == CameraState::Closed {
            return Err(CaptureError::StreamClosed);
        }
        let photo = self.device.grab_frame().map_err(CaptureError::Device)?;
        if photo.is_empty() {
            return Err(CaptureError::EmptyCapture);
        }
        Ok(photo)
    }

    pub fn start_recording(&mut self) -> Result<(), CaptureError> {
        match self.state {
            CameraState::Closed => Err(CaptureError::StreamClosed),
            CameraState::Recording => Err(CaptureError::AlreadyRecording),
            CameraState::Open => {
                self.device.start_recording().map_err(CaptureError::Device)?;
                self.state = CameraState::Recording;
                Ok(())
            }
        }
    }

    pub fn stop_recording(&mut self) -> Result<MediaPayload, CaptureError> {
        match self.state {
            CameraState::Closed => Err(CaptureError::StreamClosed),
            CameraState::Open => Err(CaptureError::NotRecording),
            CameraState::Recording => {
                self.state = CameraState::Open;
                let video = self.device.stop_recording().map_err(CaptureError::Device)?;
                if video.is_empty() {
                    return Err(CaptureError::EmptyCapture);
                }
                Ok(video)
            }
        }
    }

    /// Release the stream, discarding any recording in progress
    pub fn close(&mut self) {
        if self.state == CameraState::Recording {
            let _ = self.device.stop_recording();
        }
        if self.state != CameraState::Closed {
            self.device.release();
            self.state = CameraState::Closed;
            debug!("camera stream closed");
        }
    }
}

impl<D: CameraDevice> Drop for CameraCapture<D> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Device that serves a photo file and a video file from disk.
///
/// Lets the CLI attach media captured by other tools.
#[derive(Debug, Clone)]
pub struct FileCamera {
    photo: Option<PathBuf>,
    video: Option<PathBuf>,
}

impl FileCamera {
    pub fn new(photo: Option<PathBuf>, video: Option<PathBuf>) -> Self {
        Self { photo, video }
    }

    fn read(path: Option<&Path>, what: &str) -> io::Result<MediaPayload> {
        let path = path.ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no {} file configured", what)))?;
        let data = fs::read(path)?;
        Ok(MediaPayload::new(content_type_for(path), data))
    }
}

impl CameraDevice for FileCamera {
    fn acquire(&mut self) -> io::Result<()> {
        for path in self.photo.iter().chain(self.video.iter()) {
            if !path.is_file() {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{} not found", path.display()),
                ));
            }
        }
        Ok(())
    }

    fn grab_frame(&mut self) -> io::Result<MediaPayload> {
        Self::read(self.photo.as_deref(), "photo")
    }

    fn start_recording(&mut self) -> io::Result<()> {
        match &self.video {
            Some(_) => Ok(()),
            None => Err(io::Error::new(io::ErrorKind::NotFound, "no video file configured")),
        }
    }

    fn stop_recording(&mut self) -> io::Result<MediaPayload> {
        Self::read(self.video.as_deref(), "video")
    }

    fn release(&mut self) {}
}

/// Content type from a file extension
pub(crate) fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "heic" => "image/heic",
        "pgm" => "image/x-portable-graymap",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}
