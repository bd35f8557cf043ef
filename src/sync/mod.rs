//! Queue replay
//!
//! Pushes work recorded offline to the backend once connectivity returns:
//!
//! 1. Stored photos are uploaded first, so a queued door completion finds
//!    the photo flag already set server-side.
//! 2. Queued changes are replayed strictly in insertion order, one at a
//!    time. Each entry is removed (and the queue persisted) only after the
//!    backend accepted it.
//! 3. The first failure stops the drain. The failed entry and everything
//!    behind it stay queued for the next attempt.

use doorflow_api::{MediaKind, MediaUploadRequest};
use serde::Serialize;
use tracing::{info, warn};

use crate::backend::{Backend, BackendError, BackendResult};
use crate::store::{ChangeKind, DeviceStore, MediaStore, PendingChange, StoreError, SyncQueue};

/// Issue the backend call a change stands for. Queued changes pass their
/// change id as `key`.
pub fn replay(backend: &dyn Backend, job_id: &str, change: &PendingChange, key: &str) -> BackendResult<()> {
    match change {
        PendingChange::JobStart { sign_off } => backend.start_job(job_id, &sign_off.start_request(), key),
        PendingChange::DoorComplete { door_id, sign_off } => {
            backend.complete_door(job_id, door_id, &sign_off.complete_door_request(), key)
        }
        PendingChange::JobComplete { sign_off } => {
            backend.complete_job(job_id, &sign_off.complete_job_request(), key)
        }
        PendingChange::LineItem {
            door_id,
            line_item_id,
            completed,
        } => backend.set_line_item(
            job_id,
            door_id,
            line_item_id,
            doorflow_api::LineItemRequest { completed: *completed },
            key,
        ),
    }
}

/// The entry a drain stopped at
#[derive(Debug, Serialize)]
pub struct ReplayFailure {
    pub seq: u64,
    pub kind: ChangeKind,
    pub change_id: String,
    #[serde(serialize_with = "serialize_error")]
    pub error: BackendError,
}

/// Outcome of draining one job's queue
#[derive(Debug, Serialize)]
pub struct DrainReport {
    pub job_id: String,
    /// Sequence numbers accepted by the backend, in replay order
    pub replayed: Vec<u64>,
    pub failure: Option<ReplayFailure>,
    /// Entries still queued, including the failed one
    pub remaining: usize,
}

impl DrainReport {
    fn not_attempted(job_id: &str, remaining: usize) -> Self {
        Self {
            job_id: job_id.to_string(),
            replayed: Vec::new(),
            failure: None,
            remaining,
        }
    }

    /// Nothing left queued
    pub fn is_complete(&self) -> bool {
        self.failure.is_none() && self.remaining == 0
    }
}

/// Replay a job's queue, oldest first, stopping at the first failure
pub fn drain_all(queue: &SyncQueue, job_id: &str, backend: &dyn Backend) -> Result<DrainReport, StoreError> {
    let mut replayed = Vec::new();
    let mut failure = None;

    while let Some(front) = queue.front(job_id)? {
        match replay(backend, job_id, &front.change, &front.change_id) {
            Ok(()) => {
                queue.acknowledge(job_id, front.seq)?;
                replayed.push(front.seq);
            }
            Err(error) => {
                warn!(
                    job_id,
                    seq = front.seq,
                    kind = %front.kind(),
                    error = %error,
                    "replay failed, keeping queue"
                );
                failure = Some(ReplayFailure {
                    seq: front.seq,
                    kind: front.kind(),
                    change_id: front.change_id.clone(),
                    error,
                });
                break;
            }
        }
    }

    let remaining = queue.len(job_id)?;
    if !replayed.is_empty() {
        info!(job_id, replayed = replayed.len(), remaining, "drained queue");
    }
    Ok(DrainReport {
        job_id: job_id.to_string(),
        replayed,
        failure,
        remaining,
    })
}

/// Drain every job's queue independently. A failure in one job does not
/// stop the others.
pub fn drain_every(queue: &SyncQueue, backend: &dyn Backend) -> Result<Vec<DrainReport>, StoreError> {
    queue
        .jobs_with_pending()?
        .iter()
        .map(|job_id| drain_all(queue, job_id, backend))
        .collect()
}

/// An upload that could not be delivered
#[derive(Debug, Serialize)]
pub struct UploadFailure {
    pub door_id: String,
    pub kind: MediaKind,
    #[serde(serialize_with = "serialize_error")]
    pub error: BackendError,
}

/// Outcome of uploading a job's stored media
#[derive(Debug, Default, Serialize)]
pub struct FlushReport {
    /// (door id, kind) uploaded and removed from the store
    pub uploaded: Vec<(String, MediaKind)>,
    pub failure: Option<UploadFailure>,
}

impl FlushReport {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

/// Upload stored media for a job, oldest first, stopping at the first
/// failure. Uploaded payloads are removed from the store.
pub fn flush_media(media: &MediaStore, job_id: &str, backend: &dyn Backend) -> Result<FlushReport, StoreError> {
    let mut report = FlushReport::default();

    for stored in media.list(job_id)? {
        let request = MediaUploadRequest::new(stored.kind, &stored.payload);
        match backend.upload_media(job_id, &stored.door_id, &request, &stored.upload_id) {
            Ok(()) => {
                media.remove(job_id, &stored.door_id, stored.kind)?;
                info!(
                    job_id,
                    door_id = %stored.door_id,
                    kind = %stored.kind,
                    bytes = stored.payload.len(),
                    "uploaded stored media"
                );
                report.uploaded.push((stored.door_id, stored.kind));
            }
            Err(error) => {
                warn!(
                    job_id,
                    door_id = %stored.door_id,
                    kind = %stored.kind,
                    error = %error,
                    "media upload failed, keeping payload"
                );
                report.failure = Some(UploadFailure {
                    door_id: stored.door_id,
                    kind: stored.kind,
                    error,
                });
                break;
            }
        }
    }

    Ok(report)
}

/// Media flush followed by queue drain for one job
#[derive(Debug, Serialize)]
pub struct JobSyncReport {
    pub job_id: String,
    pub media: FlushReport,
    pub drain: DrainReport,
}

impl JobSyncReport {
    pub fn is_complete(&self) -> bool {
        self.media.is_complete() && self.drain.is_complete()
    }
}

/// Flush media, then drain the queue. The queue is left untouched when a
/// media upload fails, since queued completions may depend on it.
pub fn sync_job(store: &DeviceStore, job_id: &str, backend: &dyn Backend) -> Result<JobSyncReport, StoreError> {
    let media = flush_media(store.media(), job_id, backend)?;
    let drain = if media.is_complete() {
        drain_all(store.queue(), job_id, backend)?
    } else {
        DrainReport::not_attempted(job_id, store.queue().len(job_id)?)
    };
    Ok(JobSyncReport {
        job_id: job_id.to_string(),
        media,
        drain,
    })
}

/// `sync_job` for every job with queued changes or stored media
pub fn sync_device(store: &DeviceStore, backend: &dyn Backend) -> Result<Vec<JobSyncReport>, StoreError> {
    let mut job_ids = store.queue().jobs_with_pending()?;
    job_ids.extend(store.media().job_ids()?);
    job_ids.sort();
    job_ids.dedup();

    job_ids
        .iter()
        .map(|job_id| sync_job(store, job_id, backend))
        .collect()
}

fn serialize_error<S: serde::Serializer>(error: &BackendError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{BackendOp, FailureConfig, MockBackend};
    use crate::store::test_support::sample_job;
    use crate::store::SignOffRecord;
    use doorflow_api::{MediaPayload, MobileStatus};
    use tempfile::TempDir;

    fn toggle(item: &str, completed: bool) -> PendingChange {
        PendingChange::LineItem {
            door_id: "d1".to_string(),
            line_item_id: item.to_string(),
            completed,
        }
    }

    fn setup() -> (TempDir, DeviceStore, MockBackend) {
        let dir = TempDir::new().unwrap();
        let store = DeviceStore::open(dir.path()).unwrap();
        let mut job = sample_job("j1");
        job.doors[0].line_items[0].completed = false;
        let backend = MockBackend::with_jobs([job]);
        (dir, store, backend)
    }

    #[test]
    fn test_drain_replays_in_order() {
        let (_dir, store, backend) = setup();
        store.queue().enqueue("j1", toggle("li1", true)).unwrap();
        store.queue().enqueue("j1", toggle("li1", false)).unwrap();
        store.queue().enqueue("j1", toggle("li1", true)).unwrap();

        let report = drain_all(store.queue(), "j1", &backend).unwrap();

        assert!(report.is_complete());
        assert_eq!(report.replayed, vec![1, 2, 3]);
        assert_eq!(backend.count(BackendOp::SetLineItem), 3);
        assert!(backend.job("j1").unwrap().doors[0].line_items[0].completed);
    }

    #[test]
    fn test_drain_keys_are_change_ids() {
        let (_dir, store, backend) = setup();
        let queued = store.queue().enqueue("j1", toggle("li1", true)).unwrap();

        drain_all(store.queue(), "j1", &backend).unwrap();

        assert_eq!(backend.calls()[0].key.as_deref(), Some(queued.change_id.as_str()));
    }

    #[test]
    fn test_drain_offline_keeps_everything() {
        let (_dir, store, backend) = setup();
        store.queue().enqueue("j1", toggle("li1", true)).unwrap();
        store.queue().enqueue("j1", toggle("li1", false)).unwrap();
        backend.set_reachable(false);

        let report = drain_all(store.queue(), "j1", &backend).unwrap();

        let failure = report.failure.as_ref().unwrap();
        assert_eq!(failure.seq, 1);
        assert!(failure.error.is_connectivity());
        assert!(report.replayed.is_empty());
        assert_eq!(report.remaining, 2);
        // Only the head was attempted
        assert_eq!(backend.count(BackendOp::SetLineItem), 1);
    }

    #[test]
    fn test_drain_stops_mid_queue() {
        let (_dir, store, backend) = setup();
        store.queue().enqueue("j1", toggle("li1", true)).unwrap();
        store
            .queue()
            .enqueue(
                "j1",
                PendingChange::DoorComplete {
                    door_id: "missing".to_string(),
                    sign_off: SignOffRecord {
                        signature: "data:image/x-portable-graymap;base64,AA==".to_string(),
                        signer_name: "Pat".to_string(),
                        signer_title: None,
                    },
                },
            )
            .unwrap();
        store.queue().enqueue("j1", toggle("li1", false)).unwrap();

        let report = drain_all(store.queue(), "j1", &backend).unwrap();

        assert_eq!(report.replayed, vec![1]);
        let failure = report.failure.as_ref().unwrap();
        assert_eq!(failure.seq, 2);
        assert_eq!(failure.kind, ChangeKind::DoorComplete);
        assert_eq!(failure.error.status(), Some(404));
        assert_eq!(report.remaining, 2);

        let seqs: Vec<u64> = store.queue().pending("j1").unwrap().iter().map(|c| c.seq).collect();
        assert_eq!(seqs, vec![2, 3]);
    }

    #[test]
    fn test_drain_every_isolates_jobs() {
        let (_dir, store, backend) = setup();
        store.queue().enqueue("ghost", toggle("li1", true)).unwrap();
        store.queue().enqueue("j1", toggle("li1", true)).unwrap();

        let reports = drain_every(store.queue(), &backend).unwrap();

        assert_eq!(reports.len(), 2);
        let ghost = reports.iter().find(|r| r.job_id == "ghost").unwrap();
        let j1 = reports.iter().find(|r| r.job_id == "j1").unwrap();
        assert!(!ghost.is_complete());
        assert!(j1.is_complete());
    }

    #[test]
    fn test_flush_media_then_drain() {
        let (_dir, store, backend) = setup();
        let mut job = backend.job("j1").unwrap();
        job.doors[0].has_photo = false;
        job.mobile_status = MobileStatus::Started;
        backend.insert_job(job);

        store
            .media()
            .put("j1", "d1", MediaKind::Photo, MediaPayload::new("image/jpeg", vec![9; 16]))
            .unwrap();
        store.queue().enqueue("j1", toggle("li1", true)).unwrap();

        let report = sync_job(&store, "j1", &backend).unwrap();

        assert!(report.is_complete());
        assert_eq!(backend.ops(), vec![BackendOp::UploadMedia, BackendOp::SetLineItem]);
        assert!(backend.job("j1").unwrap().doors[0].has_photo);
        assert!(store.media().list("j1").unwrap().is_empty());
    }

    #[test]
    fn test_media_failure_skips_drain() {
        let (_dir, store, backend) = setup();
        store
            .media()
            .put("j1", "d1", MediaKind::Photo, MediaPayload::new("image/jpeg", vec![1]))
            .unwrap();
        store.queue().enqueue("j1", toggle("li1", true)).unwrap();
        backend.inject(BackendOp::UploadMedia, FailureConfig::unreachable());

        let report = sync_job(&store, "j1", &backend).unwrap();

        assert!(!report.is_complete());
        assert_eq!(report.drain.remaining, 1);
        assert_eq!(backend.count(BackendOp::SetLineItem), 0);
        assert_eq!(store.media().list("j1").unwrap().len(), 1);
    }

    #[test]
    fn test_sync_device_covers_media_only_jobs() {
        let (_dir, store, backend) = setup();
        store
            .media()
            .put("j1", "d1", MediaKind::Photo, MediaPayload::new("image/jpeg", vec![1]))
            .unwrap();

        let reports = sync_device(&store, &backend).unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].media.uploaded, vec![("d1".to_string(), MediaKind::Photo)]);
    }
}
