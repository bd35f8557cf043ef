//! Door and job sign-off
//!
//! Checklist, media and signature requirements for completing doors and
//! jobs, online and offline.

mod common;

use std::fs;

use common::{job, photo, sign_off, video, Device};
use doorflow_field::api::{MediaKind, MobileStatus};
use doorflow_field::capture::{CameraState, CaptureError};
use doorflow_field::mock::BackendOp;
use doorflow_field::store::ChangeKind;
use doorflow_field::{CameraCapture, FileCamera, SessionError, SignOff, SignaturePad};
use tempfile::TempDir;

fn finish_door(device: &mut Device, door: &str, item: &str) {
    device.session.capture_media(door, MediaKind::Photo, photo()).unwrap();
    device.session.capture_media(door, MediaKind::Video, video()).unwrap();
    device.session.toggle_line_item(door, item).unwrap();
    device.session.complete_door(door, &sign_off()).unwrap();
}

#[test]
fn test_online_door_then_job_not_ready() {
    let mut device = Device::new(job("J1", 2, MobileStatus::Started), true);
    device.session.load_job("J1").unwrap();

    finish_door(&mut device, "door1", "item1");

    let door = device.backend.job("J1").unwrap().door("door1").unwrap().clone();
    assert!(door.completed);
    assert!(door.has_signature);
    assert!(device.session.job().unwrap().door("door1").unwrap().completed);

    let err = device.session.complete_job(&sign_off()).unwrap_err();
    match err {
        SessionError::JobNotReady { incomplete } => assert_eq!(incomplete, vec!["door2".to_string()]),
        other => panic!("expected JobNotReady, got {:?}", other),
    }
    assert_eq!(device.session.job().unwrap().mobile_status, MobileStatus::Started);
    assert_eq!(device.backend.count(BackendOp::CompleteJob), 0);
}

#[test]
fn test_job_completes_when_every_door_done() {
    let mut device = Device::new(job("J1", 2, MobileStatus::Started), true);
    device.session.load_job("J1").unwrap();

    finish_door(&mut device, "door1", "item1");
    finish_door(&mut device, "door2", "item2");
    device.session.complete_job(&sign_off()).unwrap();

    assert_eq!(device.session.job().unwrap().mobile_status, MobileStatus::Completed);
    assert_eq!(device.backend.job("J1").unwrap().mobile_status, MobileStatus::Completed);

    // Completed and fully synced, so the cache entry can go
    assert_eq!(device.store().prune_completed().unwrap(), vec!["J1".to_string()]);
    assert!(device.store().cache().get("J1").unwrap().is_none());
}

#[test]
fn test_door_without_video_is_rejected_before_backend() {
    let mut device = Device::new(job("J1", 1, MobileStatus::Started), true);
    device.session.load_job("J1").unwrap();
    device.session.capture_media("door1", MediaKind::Photo, photo()).unwrap();
    device.session.toggle_line_item("door1", "item1").unwrap();
    device.backend.reset_calls();

    let err = device.session.complete_door("door1", &sign_off()).unwrap_err();
    assert!(matches!(err, SessionError::DoorNotReady { .. }));
    assert!(device.backend.calls().is_empty());
    assert!(!device.session.job().unwrap().door("door1").unwrap().completed);
}

#[test]
fn test_completed_door_cannot_be_signed_twice() {
    let mut device = Device::new(job("J1", 1, MobileStatus::Started), true);
    device.session.load_job("J1").unwrap();
    finish_door(&mut device, "door1", "item1");

    let err = device.session.complete_door("door1", &sign_off()).unwrap_err();
    assert!(matches!(err, SessionError::DoorAlreadyCompleted { .. }));
    assert_eq!(device.backend.count(BackendOp::CompleteDoor), 1);
}

#[test]
fn test_offline_door_completion_replays_after_checklist() {
    let mut start = job("J1", 1, MobileStatus::Started);
    start.doors[0].has_photo = true;
    start.doors[0].has_video = true;
    let mut device = Device::new(start, false);
    device.session.load_job("J1").unwrap();

    device.session.toggle_line_item("door1", "item1").unwrap();
    device.session.complete_door("door1", &sign_off()).unwrap();
    assert!(device.session.job().unwrap().door("door1").unwrap().completed);

    let kinds: Vec<ChangeKind> = device
        .store()
        .queue()
        .pending("J1")
        .unwrap()
        .iter()
        .map(|c| c.kind())
        .collect();
    assert_eq!(kinds, vec![ChangeKind::LineItem, ChangeKind::DoorComplete]);

    device.come_online().sync.unwrap().unwrap();
    assert!(device.backend.job("J1").unwrap().door("door1").unwrap().completed);
    assert_eq!(
        device.backend.ops().into_iter().filter(|op| op.is_mutation()).collect::<Vec<_>>(),
        vec![BackendOp::SetLineItem, BackendOp::CompleteDoor]
    );
}

#[test]
fn test_empty_signature_stops_before_backend() {
    let mut pad = SignaturePad::default();
    pad.pointer_up();
    assert!(matches!(pad.finish(), Err(CaptureError::EmptySignature)));

    // Strokes that were cleared count as empty too
    pad.pointer_down(10.0, 10.0);
    pad.pointer_move(40.0, 20.0);
    pad.clear();
    assert!(matches!(pad.finish(), Err(CaptureError::EmptySignature)));
}

#[test]
fn test_blank_signer_name_changes_nothing() {
    let mut device = Device::new(job("J1", 1, MobileStatus::NotStarted), true);
    device.session.load_job("J1").unwrap();
    device.backend.reset_calls();

    let unnamed = SignOff::new(sign_off().signature, "  ");
    let err = device.session.start_job(&unnamed).unwrap_err();
    assert!(matches!(err, SessionError::MissingSignerName));
    assert!(device.backend.calls().is_empty());
    assert_eq!(device.session.job().unwrap().mobile_status, MobileStatus::NotStarted);
}

#[test]
fn test_camera_retry_then_attach() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("door1.jpg");

    let mut camera = CameraCapture::new(FileCamera::new(Some(path.clone()), None));
    let err = camera.open().unwrap_err();
    assert!(matches!(err, CaptureError::CameraUnavailable { .. }));
    assert_eq!(camera.state(), CameraState::Closed);
    assert!(camera.last_error().is_some());

    fs::write(&path, [0xFF, 0xD8, 0xFF, 0xE0, 9, 9]).unwrap();
    camera.retry().unwrap();
    assert_eq!(camera.state(), CameraState::Open);

    let payload = camera.capture_photo().unwrap();
    assert_eq!(payload.content_type, "image/jpeg");
    camera.close();

    let mut device = Device::new(job("J1", 1, MobileStatus::Started), true);
    device.session.load_job("J1").unwrap();
    device.session.capture_media("door1", MediaKind::Photo, payload).unwrap();
    assert!(device.session.job().unwrap().door("door1").unwrap().has_photo);
}
