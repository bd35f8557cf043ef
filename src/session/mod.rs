//! Job worker session
//!
//! Mediates every technician action on one field job. Each operation checks
//! connectivity first:
//!
//! - Online: call the backend, then reload the job and refresh the cache.
//! - Offline: update the cached copy and queue the change for replay.
//!
//! Preconditions (door checklist, status transitions, signer name) are
//! checked before either path runs, so a rejected action changes nothing.
//! While the job's queue is non-empty, new changes are queued behind it even
//! when online, keeping replay order equal to the order of the actions.

mod error;
mod sign_off;
mod timer;

pub use error::{SessionError, EXIT_BACKEND, EXIT_OFFLINE, EXIT_STORE, EXIT_SYNC, EXIT_VALIDATION};
pub use sign_off::SignOff;
pub use timer::{elapsed_since, format_elapsed, ElapsedTicker, TickCallback, TICK_INTERVAL};

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use doorflow_api::{Job, MediaKind, MediaPayload, MediaUploadRequest, MobileStatus};
use tracing::{info, warn};
use uuid::Uuid;

use crate::backend::Backend;
use crate::capture::CaptureError;
use crate::connectivity::ConnectivityHandle;
use crate::store::{DeviceStore, PendingChange, StoreError};
use crate::sync::{self, JobSyncReport};

/// Default cap on a photo kept on the device while offline
pub const DEFAULT_MAX_OFFLINE_PHOTO_BYTES: usize = 8 * 1024 * 1024;

/// Session tuning
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub max_offline_photo_bytes: usize,
    pub tick_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_offline_photo_bytes: DEFAULT_MAX_OFFLINE_PHOTO_BYTES,
            tick_interval: TICK_INTERVAL,
        }
    }
}

/// Lifecycle of the field job currently open on the device
pub struct JobWorkerSession {
    backend: Arc<dyn Backend>,
    store: DeviceStore,
    connectivity: ConnectivityHandle,
    config: SessionConfig,
    job: Option<Job>,
    on_tick: Option<TickCallback>,
    ticker: Option<ElapsedTicker>,
}

fn check_transition(from: MobileStatus, to: MobileStatus) -> Result<(), SessionError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(SessionError::InvalidTransition { from, to })
    }
}

impl JobWorkerSession {
    pub fn new(backend: Arc<dyn Backend>, store: DeviceStore, connectivity: ConnectivityHandle) -> Self {
        Self {
            backend,
            store,
            connectivity,
            config: SessionConfig::default(),
            job: None,
            on_tick: None,
            ticker: None,
        }
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Receive the elapsed time once per tick while the job is started
    pub fn on_tick(&mut self, callback: TickCallback) {
        self.on_tick = Some(callback);
        self.stop_ticker();
        self.update_ticker();
    }

    pub fn job(&self) -> Option<&Job> {
        self.job.as_ref()
    }

    pub fn store(&self) -> &DeviceStore {
        &self.store
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    pub fn ticker_running(&self) -> bool {
        self.ticker.as_ref().is_some_and(ElapsedTicker::is_running)
    }

    /// Changes queued for the loaded job
    pub fn pending_changes(&self) -> Result<usize, SessionError> {
        let job_id = &self.current()?.id;
        Ok(self.store.queue().len(job_id)?)
    }

    /// Time on site while the job is started
    pub fn elapsed(&self) -> Option<Duration> {
        let job = self.job.as_ref()?;
        if job.mobile_status != MobileStatus::Started {
            return None;
        }
        job.start_time.map(|start| elapsed_since(start, Utc::now()))
    }

    fn current(&self) -> Result<&Job, SessionError> {
        self.job.as_ref().ok_or(SessionError::NoJobLoaded)
    }

    // === Loading ===

    /// Make `job_id` the session's job.
    ///
    /// Online the job is fetched and cached; offline the cached copy is
    /// used. Reading the cache never writes it.
    pub fn load_job(&mut self, job_id: &str) -> Result<&Job, SessionError> {
        let job = if self.is_online() {
            self.fetch_online(job_id)?
        } else {
            self.store
                .cache()
                .get(job_id)?
                .ok_or_else(|| SessionError::NotAvailableOffline {
                    job_id: job_id.to_string(),
                })?
        };
        info!(job_id, status = %job.mobile_status, online = self.is_online(), "loaded job");
        self.set_job(job);
        self.current()
    }

    /// Forget the loaded job and stop its ticker
    pub fn close_job(&mut self) {
        self.job = None;
        self.stop_ticker();
    }

    fn has_unsynced(&self, job_id: &str) -> Result<bool, StoreError> {
        Ok(!self.store.queue().is_empty(job_id)? || !self.store.media().list(job_id)?.is_empty())
    }

    fn fetch_online(&self, job_id: &str) -> Result<Job, SessionError> {
        // Push offline work first so the fetched copy already contains it
        if self.has_unsynced(job_id)? {
            let report = sync::sync_job(&self.store, job_id, self.backend.as_ref())?;
            if !report.is_complete() {
                if let Some(cached) = self.store.cache().get(job_id)? {
                    warn!(job_id, "offline changes not yet synced, using cached copy");
                    return Ok(cached);
                }
            }
        }

        match self.backend.field_job(job_id) {
            Ok(job) => {
                self.store.cache().put(job_id, &job)?;
                Ok(job)
            }
            Err(e) if e.is_connectivity() => match self.store.cache().get(job_id)? {
                Some(cached) => {
                    warn!(job_id, error = %e, "backend unreachable, using cached copy");
                    Ok(cached)
                }
                None => Err(e.into()),
            },
            Err(e) => Err(e.into()),
        }
    }

    fn set_job(&mut self, job: Job) {
        self.job = Some(job);
        self.update_ticker();
    }

    fn reload(&mut self) -> Result<(), SessionError> {
        let job_id = self.current()?.id.clone();
        let job = self.backend.field_job(&job_id)?;
        self.store.cache().put(&job_id, &job)?;
        self.set_job(job);
        Ok(())
    }

    // === Ticker ===

    fn update_ticker(&mut self) {
        let wanted = match (&self.job, &self.on_tick) {
            (Some(job), Some(callback)) if job.mobile_status == MobileStatus::Started => job
                .start_time
                .map(|start| (job.id.clone(), start, callback.clone())),
            _ => None,
        };

        match wanted {
            Some((job_id, start, callback)) => {
                if self.ticker.as_ref().is_some_and(|t| t.tracks(&job_id, start)) {
                    return;
                }
                self.stop_ticker();
                self.ticker = Some(ElapsedTicker::start(&job_id, start, self.config.tick_interval, callback));
            }
            None => self.stop_ticker(),
        }
    }

    fn stop_ticker(&mut self) {
        if let Some(mut ticker) = self.ticker.take() {
            ticker.stop();
        }
    }

    // === Mutations ===

    /// Apply an edit to the working copy and write it to the cache
    fn apply_local(&mut self, apply: impl FnOnce(&mut Job)) -> Result<(), SessionError> {
        if let Some(job) = self.job.as_mut() {
            apply(job);
            self.store.cache().put(&job.id, job)?;
        }
        self.update_ticker();
        Ok(())
    }

    /// Refresh from the backend after an accepted change. If the refresh
    /// fails the change is mirrored locally instead.
    fn refresh_after(&mut self, apply: impl FnOnce(&mut Job)) -> Result<(), SessionError> {
        match self.reload() {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(error = %e, "reload after change failed, applying locally");
                self.apply_local(apply)
            }
        }
    }

    /// Try to push unsynced work while online. A failure leaves it stored.
    fn sync_if_online(&mut self, job_id: &str) {
        if self.is_online() {
            if let Err(e) = self.sync() {
                warn!(job_id, error = %e, "change kept behind unsynced work");
            }
        }
    }

    /// Send `change` to the backend, or queue it and edit locally.
    ///
    /// While the job has queued changes or stored media the change waits
    /// behind them, even online, since the backend checks door sign-off
    /// against media it may not have received yet.
    fn commit(&mut self, change: PendingChange, apply: impl FnOnce(&mut Job)) -> Result<(), SessionError> {
        let job_id = self.current()?.id.clone();
        let kind = change.kind();

        if self.is_online() && !self.has_unsynced(&job_id)? {
            let key = Uuid::new_v4().to_string();
            sync::replay(self.backend.as_ref(), &job_id, &change, &key)?;
            info!(job_id = %job_id, kind = %kind, "applied change");
            return self.refresh_after(apply);
        }

        self.store.queue().enqueue(&job_id, change)?;
        self.apply_local(apply)?;
        self.sync_if_online(&job_id);
        Ok(())
    }

    /// Customer signs in; `not_started -> started`
    pub fn start_job(&mut self, sign_off: &SignOff) -> Result<(), SessionError> {
        sign_off.validate()?;
        check_transition(self.current()?.mobile_status, MobileStatus::Started)?;

        let change = PendingChange::JobStart {
            sign_off: sign_off.to_record(),
        };
        self.commit(change, |job| {
            job.mobile_status = MobileStatus::Started;
            job.start_time = Some(Utc::now());
        })
    }

    /// Customer signs off a door whose checklist, photo and video are done
    pub fn complete_door(&mut self, door_id: &str, sign_off: &SignOff) -> Result<(), SessionError> {
        sign_off.validate()?;
        let door = self
            .current()?
            .door(door_id)
            .ok_or_else(|| SessionError::UnknownDoor {
                door_id: door_id.to_string(),
            })?;
        if door.completed {
            return Err(SessionError::DoorAlreadyCompleted {
                door_id: door_id.to_string(),
            });
        }
        let missing = door.missing_requirements();
        if !missing.is_empty() {
            return Err(SessionError::DoorNotReady {
                door_id: door_id.to_string(),
                missing,
            });
        }

        let change = PendingChange::DoorComplete {
            door_id: door_id.to_string(),
            sign_off: sign_off.to_record(),
        };
        self.commit(change, |job| {
            if let Some(door) = job.door_mut(door_id) {
                door.has_signature = true;
                door.completed = true;
            }
        })
    }

    /// Final sign-off; `started -> completed` once every door is done
    pub fn complete_job(&mut self, sign_off: &SignOff) -> Result<(), SessionError> {
        sign_off.validate()?;
        let job = self.current()?;
        if !job.all_doors_completed() {
            return Err(SessionError::JobNotReady {
                incomplete: job.incomplete_doors(),
            });
        }
        check_transition(job.mobile_status, MobileStatus::Completed)?;

        let change = PendingChange::JobComplete {
            sign_off: sign_off.to_record(),
        };
        self.commit(change, |job| job.mobile_status = MobileStatus::Completed)
    }

    /// Flip a checklist item. Returns the new state.
    pub fn toggle_line_item(&mut self, door_id: &str, line_item_id: &str) -> Result<bool, SessionError> {
        let door = self
            .current()?
            .door(door_id)
            .ok_or_else(|| SessionError::UnknownDoor {
                door_id: door_id.to_string(),
            })?;
        let item = door
            .line_item(line_item_id)
            .ok_or_else(|| SessionError::UnknownLineItem {
                door_id: door_id.to_string(),
                line_item_id: line_item_id.to_string(),
            })?;
        let target = !item.completed;

        let change = PendingChange::LineItem {
            door_id: door_id.to_string(),
            line_item_id: line_item_id.to_string(),
            completed: target,
        };
        self.commit(change, |job| {
            if let Some(item) = job.door_mut(door_id).and_then(|d| d.line_item_mut(line_item_id)) {
                item.completed = target;
            }
        })?;
        Ok(target)
    }

    /// Attach a photo or video to a door.
    ///
    /// Offline, photos up to the configured size are kept on the device and
    /// uploaded on the next sync. Videos need a connection.
    pub fn capture_media(&mut self, door_id: &str, kind: MediaKind, payload: MediaPayload) -> Result<(), SessionError> {
        let job_id = {
            let job = self.current()?;
            if job.door(door_id).is_none() {
                return Err(SessionError::UnknownDoor {
                    door_id: door_id.to_string(),
                });
            }
            job.id.clone()
        };
        if payload.is_empty() {
            return Err(CaptureError::EmptyCapture.into());
        }

        let mark = move |job: &mut Job| {
            if let Some(door) = job.door_mut(door_id) {
                match kind {
                    MediaKind::Photo => door.has_photo = true,
                    MediaKind::Video => door.has_video = true,
                }
            }
        };

        if self.is_online() {
            let request = MediaUploadRequest::new(kind, &payload);
            let key = Uuid::new_v4().to_string();
            self.backend.upload_media(&job_id, door_id, &request, &key)?;
            info!(job_id = %job_id, door_id, kind = %kind, bytes = payload.len(), "uploaded media");

            // The new capture supersedes anything stored for this door
            if self.store.media().remove(&job_id, door_id, kind)? {
                info!(job_id = %job_id, door_id, kind = %kind, "dropped superseded stored media");
            }
            if self.has_unsynced(&job_id)? {
                // A reload would drop local flags for work the backend lacks
                self.apply_local(mark)?;
                self.sync_if_online(&job_id);
                return Ok(());
            }
            return self.refresh_after(mark);
        }

        if kind == MediaKind::Video {
            return Err(SessionError::VideoRequiresConnection);
        }
        let limit = self.config.max_offline_photo_bytes;
        if payload.len() > limit {
            return Err(SessionError::PhotoTooLarge {
                size: payload.len(),
                limit,
            });
        }

        self.store.media().put(&job_id, door_id, kind, payload)?;
        info!(job_id = %job_id, door_id, "stored photo for later upload");
        self.apply_local(mark)
    }

    /// Upload stored media, replay the queue, then reload the job
    pub fn sync(&mut self) -> Result<JobSyncReport, SessionError> {
        let job_id = self.current()?.id.clone();
        if !self.is_online() {
            return Err(SessionError::Offline);
        }

        let mut report = sync::sync_job(&self.store, &job_id, self.backend.as_ref())?;
        if let Some(failure) = report.media.failure.take() {
            return Err(SessionError::MediaUploadFailure {
                door_id: failure.door_id,
                kind: failure.kind,
                source: failure.error,
            });
        }
        if let Some(failure) = report.drain.failure.take() {
            return Err(SessionError::SyncReplayFailure {
                job_id,
                seq: failure.seq,
                kind: failure.kind,
                remaining: report.drain.remaining,
                source: failure.error,
            });
        }

        self.reload()?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::SignaturePad;
    use crate::mock::MockBackend;
    use crate::store::test_support::sample_job;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn sign_off() -> SignOff {
        let mut pad = SignaturePad::new(16, 8);
        pad.pointer_down(2.0, 2.0);
        pad.pointer_move(12.0, 6.0);
        SignOff::new(pad.finish().unwrap(), "Dana Cole")
    }

    fn session(online: bool, job: Job) -> (TempDir, Arc<MockBackend>, JobWorkerSession) {
        let dir = TempDir::new().unwrap();
        let store = DeviceStore::open(dir.path()).unwrap();
        store.cache().put(&job.id, &job).unwrap();
        let backend = Arc::new(MockBackend::with_jobs([job]));
        let session = JobWorkerSession::new(backend.clone(), store, ConnectivityHandle::new(online));
        (dir, backend, session)
    }

    fn not_started(id: &str) -> Job {
        let mut job = sample_job(id);
        job.mobile_status = MobileStatus::NotStarted;
        job.start_time = None;
        job
    }

    #[test]
    fn test_no_job_loaded() {
        let (_dir, _backend, mut session) = session(true, sample_job("j1"));
        assert!(matches!(session.start_job(&sign_off()), Err(SessionError::NoJobLoaded)));
        assert!(session.elapsed().is_none());
    }

    #[test]
    fn test_ticker_follows_status() {
        let (_dir, _backend, mut session) = session(false, not_started("j1"));
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        session.on_tick(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        session.load_job("j1").unwrap();
        assert!(!session.ticker_running());

        session.start_job(&sign_off()).unwrap();
        assert!(session.ticker_running());
        assert!(session.elapsed().is_some());

        session.close_job();
        assert!(!session.ticker_running());
        assert!(ticks.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn test_loading_other_job_stops_ticker() {
        let (_dir, backend, mut session) = session(true, sample_job("j1"));
        backend.insert_job(not_started("j2"));
        session.on_tick(Arc::new(|_| {}));

        session.load_job("j1").unwrap();
        assert!(session.ticker_running());

        session.load_job("j2").unwrap();
        assert!(!session.ticker_running());
    }

    #[test]
    fn test_start_twice_is_invalid() {
        let (_dir, _backend, mut session) = session(false, sample_job("j1"));
        session.load_job("j1").unwrap();
        let err = session.start_job(&sign_off()).unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidTransition {
                from: MobileStatus::Started,
                to: MobileStatus::Started
            }
        ));
        assert_eq!(session.pending_changes().unwrap(), 0);
    }

    #[test]
    fn test_unknown_ids() {
        let (_dir, _backend, mut session) = session(false, sample_job("j1"));
        session.load_job("j1").unwrap();
        assert!(matches!(
            session.toggle_line_item("nope", "li1"),
            Err(SessionError::UnknownDoor { .. })
        ));
        assert!(matches!(
            session.toggle_line_item("d1", "nope"),
            Err(SessionError::UnknownLineItem { .. })
        ));
    }

    #[test]
    fn test_offline_photo_size_cap() {
        let (_dir, _backend, session) = session(false, sample_job("j1"));
        let mut session = session.with_config(SessionConfig {
            max_offline_photo_bytes: 4,
            ..Default::default()
        });
        session.load_job("j1").unwrap();

        let err = session
            .capture_media("d1", MediaKind::Photo, MediaPayload::new("image/jpeg", vec![0; 5]))
            .unwrap_err();
        assert!(matches!(err, SessionError::PhotoTooLarge { size: 5, limit: 4 }));
        assert!(session.store().media().list("j1").unwrap().is_empty());
    }

    #[test]
    fn test_online_change_queues_behind_unsynced_work() {
        use crate::connectivity::ConnectivityMonitor;

        let dir = TempDir::new().unwrap();
        let store = DeviceStore::open(dir.path()).unwrap();
        let job = sample_job("j1");
        store.cache().put("j1", &job).unwrap();
        let backend = Arc::new(MockBackend::with_jobs([job]));
        let mut monitor = ConnectivityMonitor::new(false);
        let mut session = JobWorkerSession::new(backend.clone(), store, monitor.handle());

        session.load_job("j1").unwrap();
        assert!(!session.toggle_line_item("d1", "li1").unwrap());

        // Flag says online but the backend is not answering yet
        backend.set_reachable(false);
        monitor.observe(true);
        assert!(session.toggle_line_item("d1", "li1").unwrap());
        assert_eq!(session.pending_changes().unwrap(), 2);
        assert_eq!(backend.count(crate::mock::BackendOp::SetLineItem), 1);

        backend.set_reachable(true);
        session.sync().unwrap();
        assert_eq!(session.pending_changes().unwrap(), 0);
        assert!(backend.job("j1").unwrap().doors[0].line_items[0].completed);
    }
}
