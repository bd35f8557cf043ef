//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::sync::Arc;

use doorflow_field::api::{Door, Job, LineItem, MediaKind, MediaPayload, MobileStatus};
use doorflow_field::mock::MockBackend;
use doorflow_field::{ConnectivityMonitor, DeviceStore, JobWorkerSession, SignOff, SignaturePad};
use tempfile::TempDir;

/// Job with `doors` doors of one unticked line item each, no media
pub fn job(id: &str, doors: usize, status: MobileStatus) -> Job {
    Job {
        id: id.to_string(),
        job_number: format!("J-{}", id),
        customer_name: "Lakeside Cold Storage".to_string(),
        address: "400 Dock Rd".to_string(),
        contact_name: Some("Sam Ortiz".to_string()),
        contact_phone: None,
        scope: "Install rapid roll doors".to_string(),
        mobile_status: status,
        start_time: None,
        doors: (1..=doors)
            .map(|n| Door {
                id: format!("door{}", n),
                door_number: n.to_string(),
                location: format!("Bay {}", n),
                door_type: "Rapid roll".to_string(),
                dimensions: "8'x10'".to_string(),
                labor_description: String::new(),
                line_items: vec![LineItem {
                    id: format!("item{}", n),
                    description: "Mount guide rails".to_string(),
                    part_number: None,
                    quantity: 1.0,
                    completed: false,
                }],
                has_photo: false,
                has_video: false,
                has_signature: false,
                completed: false,
            })
            .collect(),
    }
}

pub fn sign_off() -> SignOff {
    let mut pad = SignaturePad::new(64, 24);
    pad.pointer_down(4.0, 12.0);
    pad.pointer_move(30.0, 4.0);
    pad.pointer_move(60.0, 20.0);
    pad.pointer_up();
    SignOff::new(pad.finish().unwrap(), "Sam Ortiz").with_title("Facilities manager")
}

pub fn photo() -> MediaPayload {
    MediaPayload::new("image/jpeg", vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3, 4])
}

pub fn video() -> MediaPayload {
    MediaPayload::new("video/mp4", vec![0, 0, 0, 0x18, b'f', b't', b'y', b'p'])
}

pub fn media(kind: MediaKind) -> MediaPayload {
    match kind {
        MediaKind::Photo => photo(),
        MediaKind::Video => video(),
    }
}

/// A device with one cached job, a mock backend holding the same job, and
/// a session wired to a monitor in the given state
pub struct Device {
    pub dir: TempDir,
    pub backend: Arc<MockBackend>,
    pub monitor: ConnectivityMonitor,
    pub session: JobWorkerSession,
}

impl Device {
    pub fn new(job: Job, online: bool) -> Self {
        let dir = TempDir::new().unwrap();
        let store = DeviceStore::open(dir.path()).unwrap();
        store.cache().put(&job.id, &job).unwrap();

        let backend = Arc::new(MockBackend::with_jobs([job]));
        backend.set_reachable(online);
        let monitor = ConnectivityMonitor::new(online);
        let session = JobWorkerSession::new(backend.clone(), store, monitor.handle());
        Self {
            dir,
            backend,
            monitor,
            session,
        }
    }

    pub fn store(&self) -> DeviceStore {
        DeviceStore::open(self.dir.path()).unwrap()
    }

    pub fn go_offline(&mut self) {
        self.backend.set_reachable(false);
        self.monitor.observe(false);
    }

    /// Network back and the monitor told so, which syncs the session
    pub fn come_online(&mut self) -> doorflow_field::connectivity::Reconnect {
        self.backend.set_reachable(true);
        self.monitor.observe_and_sync(true, &mut self.session)
    }
}
