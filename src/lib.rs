//! Doorflow field worker
//!
//! Offline-capable client for overhead-door installation crews. A
//! technician opens a field job, ticks each door's checklist, attaches
//! photo and video evidence, and collects customer signatures. Every action
//! works without a connection: changes are applied to a device-local cache
//! and queued, then replayed in order when the backend is reachable again.

pub mod backend;
pub mod capture;
pub mod config;
pub mod connectivity;
pub mod dispatch;
pub mod logging;
pub mod mock;
pub mod session;
pub mod store;
pub mod sync;

pub use backend::{Backend, BackendError, BackendResult, HttpBackend, HttpConfig};
pub use capture::{CameraCapture, CameraDevice, CaptureError, FileCamera, Signature, SignaturePad};
pub use config::{ConfigError, EffectiveConfig, FieldSettings};
pub use connectivity::{ConnectivityHandle, ConnectivityMonitor, Transition};
pub use dispatch::{Column, DispatchBoard, DispatchError};
pub use session::{JobWorkerSession, SessionConfig, SessionError, SignOff};
pub use store::{DeviceStore, PendingChange, StoreError, SyncQueue};
pub use sync::{drain_all, drain_every, sync_device, sync_job, DrainReport, JobSyncReport};

pub use doorflow_api as api;
