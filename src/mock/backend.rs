//! Mock Backend Implementation

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{NaiveDate, Utc};
use doorflow_api::paths::{self, Endpoint};
use doorflow_api::{
    CompleteDoorRequest, CompleteJobRequest, DispatchDay, DispatchRequest, FieldJobSummary,
    FieldSummary, Job, LineItemRequest, MediaKind, MediaUploadRequest, MobileStatus,
    ScheduleRequest, StartJobRequest, User,
};

use crate::backend::{Backend, BackendError, BackendResult};

use super::failure::{FailureConfig, FailureInjector};

/// Backend operations, for failure injection and call assertions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendOp {
    Ping,
    Jobs,
    ScheduleJob,
    FieldJobs,
    FieldJob,
    FieldSummary,
    StartJob,
    CompleteDoor,
    CompleteJob,
    SetLineItem,
    UploadMedia,
    Dispatch,
    SaveDispatch,
    Users,
}

impl BackendOp {
    /// Operations that change server-side state
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            BackendOp::ScheduleJob
                | BackendOp::StartJob
                | BackendOp::CompleteDoor
                | BackendOp::CompleteJob
                | BackendOp::SetLineItem
                | BackendOp::UploadMedia
                | BackendOp::SaveDispatch
        )
    }
}

/// One call as seen by the mock, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub op: BackendOp,
    pub job_id: Option<String>,
    pub door_id: Option<String>,
    pub line_item_id: Option<String>,
    pub key: Option<String>,
    /// Whether the call returned Ok
    pub ok: bool,
}

#[derive(Debug, Default)]
struct MockState {
    jobs: HashMap<String, Job>,
    calls: Vec<RecordedCall>,
    seen_keys: HashSet<String>,
    dispatch_days: HashMap<NaiveDate, DispatchDay>,
    saved_dispatch: Vec<DispatchRequest>,
    scheduled: Vec<(String, ScheduleRequest)>,
    users: Vec<User>,
    uploads: Vec<(String, String, MediaKind, String)>,
}

/// Configurable in-memory backend for testing
pub struct MockBackend {
    state: Mutex<MockState>,
    failures: Mutex<FailureInjector>,
    reachable: AtomicBool,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Call context used while handling one request
struct Call<'a> {
    op: BackendOp,
    endpoint: Endpoint,
    job_id: Option<&'a str>,
    door_id: Option<&'a str>,
    line_item_id: Option<&'a str>,
    key: Option<&'a str>,
}

impl<'a> Call<'a> {
    fn new(op: BackendOp, endpoint: Endpoint) -> Self {
        Self {
            op,
            endpoint,
            job_id: None,
            door_id: None,
            line_item_id: None,
            key: None,
        }
    }

    fn job(mut self, job_id: &'a str) -> Self {
        self.job_id = Some(job_id);
        self
    }

    fn door(mut self, door_id: &'a str) -> Self {
        self.door_id = Some(door_id);
        self
    }

    fn line_item(mut self, line_item_id: &'a str) -> Self {
        self.line_item_id = Some(line_item_id);
        self
    }

    fn key(mut self, key: &'a str) -> Self {
        self.key = Some(key);
        self
    }

    fn error(&self, status: u16, message: impl Into<String>) -> BackendError {
        BackendError::Status {
            endpoint: self.endpoint.to_string(),
            status,
            message: message.into(),
        }
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            failures: Mutex::new(FailureInjector::new()),
            reachable: AtomicBool::new(true),
        }
    }

    /// Create a backend already holding `jobs`
    pub fn with_jobs(jobs: impl IntoIterator<Item = Job>) -> Self {
        let backend = Self::new();
        for job in jobs {
            backend.insert_job(job);
        }
        backend
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // === Test configuration ===

    pub fn insert_job(&self, job: Job) {
        self.state().jobs.insert(job.id.clone(), job);
    }

    pub fn insert_dispatch_day(&self, day: DispatchDay) {
        self.state().dispatch_days.insert(day.date, day);
    }

    pub fn set_users(&self, users: Vec<User>) {
        self.state().users = users;
    }

    /// When false every call fails as if the network were down
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }

    pub fn inject(&self, op: BackendOp, config: FailureConfig) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .inject(op, config);
    }

    pub fn clear_failures(&self) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    // === Inspection ===

    /// Server-side copy of a job
    pub fn job(&self, job_id: &str) -> Option<Job> {
        self.state().jobs.get(job_id).cloned()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state().calls.clone()
    }

    /// Operations of every call, in order
    pub fn ops(&self) -> Vec<BackendOp> {
        self.state().calls.iter().map(|c| c.op).collect()
    }

    /// Mutating calls only, in order
    pub fn mutations(&self) -> Vec<RecordedCall> {
        self.state()
            .calls
            .iter()
            .filter(|c| c.op.is_mutation())
            .cloned()
            .collect()
    }

    pub fn count(&self, op: BackendOp) -> usize {
        self.state().calls.iter().filter(|c| c.op == op).count()
    }

    pub fn saved_dispatch(&self) -> Vec<DispatchRequest> {
        self.state().saved_dispatch.clone()
    }

    /// (job, door, kind, sha256) for every accepted upload
    pub fn uploads(&self) -> Vec<(String, String, MediaKind, String)> {
        self.state().uploads.clone()
    }

    pub fn reset_calls(&self) {
        self.state().calls.clear();
    }

    // === Request handling ===

    /// Run `apply` unless the network is down, a failure is injected or the
    /// idempotency key was already seen. Records the call either way.
    fn handle<T, F>(&self, call: Call<'_>, apply: F) -> BackendResult<T>
    where
        T: Default,
        F: FnOnce(&mut MockState, &Call<'_>) -> BackendResult<T>,
    {
        let injected: Option<FailureConfig> = self
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .check(call.op)
            .cloned();

        let mut state = self.state();
        let result = if !self.is_reachable() {
            Err(BackendError::Connection(format!("{}: network unreachable", call.endpoint)))
        } else if let Some(failure) = injected {
            Err(failure.to_error(&call.endpoint.to_string()))
        } else if call.key.is_some_and(|k| state.seen_keys.contains(k)) {
            Ok(T::default())
        } else {
            let result = apply(&mut state, &call);
            if result.is_ok() {
                if let Some(key) = call.key {
                    state.seen_keys.insert(key.to_string());
                }
            }
            result
        };

        state.calls.push(RecordedCall {
            op: call.op,
            job_id: call.job_id.map(str::to_string),
            door_id: call.door_id.map(str::to_string),
            line_item_id: call.line_item_id.map(str::to_string),
            key: call.key.map(str::to_string),
            ok: result.is_ok(),
        });
        result
    }

    /// Like `handle` for reads that return a value without a sensible default
    fn read<T, F>(&self, call: Call<'_>, read: F) -> BackendResult<T>
    where
        F: FnOnce(&MockState, &Call<'_>) -> BackendResult<T>,
    {
        let mut out = None;
        self.handle(call, |state, call| {
            out = Some(read(state, call)?);
            Ok(())
        })?;
        out.ok_or_else(|| BackendError::Connection("mock produced no value".to_string()))
    }
}

fn job_mut<'s>(state: &'s mut MockState, call: &Call<'_>, job_id: &str) -> BackendResult<&'s mut Job> {
    state
        .jobs
        .get_mut(job_id)
        .ok_or_else(|| call.error(404, format!("Job {} not found", job_id)))
}

fn summarize(job: &Job) -> FieldJobSummary {
    FieldJobSummary {
        id: job.id.clone(),
        job_number: job.job_number.clone(),
        customer_name: job.customer_name.clone(),
        address: job.address.clone(),
        scheduled_date: None,
        truck_id: None,
        mobile_status: job.mobile_status,
        door_count: job.doors.len() as u32,
    }
}

fn sorted_summaries(state: &MockState) -> Vec<FieldJobSummary> {
    let mut rows: Vec<FieldJobSummary> = state.jobs.values().map(summarize).collect();
    rows.sort_by(|a, b| a.job_number.cmp(&b.job_number));
    rows
}

impl Backend for MockBackend {
    fn ping(&self) -> BackendResult<()> {
        self.handle(Call::new(BackendOp::Ping, paths::connectivity_test()), |_, _| Ok(()))
    }

    fn jobs(&self) -> BackendResult<Vec<FieldJobSummary>> {
        self.read(Call::new(BackendOp::Jobs, paths::jobs()), |state, _| {
            Ok(sorted_summaries(state))
        })
    }

    fn schedule_job(&self, job_id: &str, request: &ScheduleRequest) -> BackendResult<()> {
        let call = Call::new(BackendOp::ScheduleJob, paths::schedule_job(job_id)).job(job_id);
        self.handle(call, |state, call| {
            job_mut(state, call, job_id)?;
            state.scheduled.push((job_id.to_string(), request.clone()));
            Ok(())
        })
    }

    fn field_jobs(&self, date: Option<NaiveDate>) -> BackendResult<Vec<FieldJobSummary>> {
        self.read(Call::new(BackendOp::FieldJobs, paths::field_jobs(date)), |state, _| {
            Ok(sorted_summaries(state))
        })
    }

    fn field_job(&self, job_id: &str) -> BackendResult<Job> {
        let call = Call::new(BackendOp::FieldJob, paths::field_job(job_id)).job(job_id);
        self.read(call, |state, call| {
            state
                .jobs
                .get(job_id)
                .cloned()
                .ok_or_else(|| call.error(404, format!("Job {} not found", job_id)))
        })
    }

    fn field_summary(&self) -> BackendResult<FieldSummary> {
        self.read(Call::new(BackendOp::FieldSummary, paths::field_summary()), |state, _| {
            let count = |status: MobileStatus| {
                state.jobs.values().filter(|j| j.mobile_status == status).count() as u32
            };
            Ok(FieldSummary {
                today: state.jobs.len() as u32,
                not_started: count(MobileStatus::NotStarted),
                started: count(MobileStatus::Started),
                completed: count(MobileStatus::Completed),
                generated_at: Some(Utc::now()),
            })
        })
    }

    fn start_job(&self, job_id: &str, _request: &StartJobRequest, key: &str) -> BackendResult<()> {
        let call = Call::new(BackendOp::StartJob, paths::start_job(job_id)).job(job_id).key(key);
        self.handle(call, |state, call| {
            let job = job_mut(state, call, job_id)?;
            if job.mobile_status != MobileStatus::NotStarted {
                return Err(call.error(409, format!("Job is already {}", job.mobile_status)));
            }
            job.mobile_status = MobileStatus::Started;
            job.start_time = Some(Utc::now());
            Ok(())
        })
    }

    fn complete_door(
        &self,
        job_id: &str,
        door_id: &str,
        _request: &CompleteDoorRequest,
        key: &str,
    ) -> BackendResult<()> {
        let call = Call::new(BackendOp::CompleteDoor, paths::complete_door(job_id, door_id))
            .job(job_id)
            .door(door_id)
            .key(key);
        self.handle(call, |state, call| {
            let job = job_mut(state, call, job_id)?;
            let door = job
                .door_mut(door_id)
                .ok_or_else(|| call.error(404, format!("Door {} not found", door_id)))?;
            if !door.is_ready_for_signoff() {
                return Err(call.error(422, "Door is not ready for sign-off"));
            }
            door.has_signature = true;
            door.completed = true;
            Ok(())
        })
    }

    fn complete_job(&self, job_id: &str, _request: &CompleteJobRequest, key: &str) -> BackendResult<()> {
        let call = Call::new(BackendOp::CompleteJob, paths::complete_job(job_id)).job(job_id).key(key);
        self.handle(call, |state, call| {
            let job = job_mut(state, call, job_id)?;
            if job.mobile_status != MobileStatus::Started {
                return Err(call.error(409, format!("Job is {}", job.mobile_status)));
            }
            if !job.all_doors_completed() {
                return Err(call.error(422, "All doors must be completed"));
            }
            job.mobile_status = MobileStatus::Completed;
            Ok(())
        })
    }

    fn set_line_item(
        &self,
        job_id: &str,
        door_id: &str,
        line_item_id: &str,
        request: LineItemRequest,
        key: &str,
    ) -> BackendResult<()> {
        let call = Call::new(BackendOp::SetLineItem, paths::line_item(job_id, door_id, line_item_id))
            .job(job_id)
            .door(door_id)
            .line_item(line_item_id)
            .key(key);
        self.handle(call, |state, call| {
            let job = job_mut(state, call, job_id)?;
            let item = job
                .door_mut(door_id)
                .and_then(|d| d.line_item_mut(line_item_id))
                .ok_or_else(|| call.error(404, format!("Line item {} not found", line_item_id)))?;
            item.completed = request.completed;
            Ok(())
        })
    }

    fn upload_media(
        &self,
        job_id: &str,
        door_id: &str,
        request: &MediaUploadRequest,
        key: &str,
    ) -> BackendResult<()> {
        let call = Call::new(BackendOp::UploadMedia, paths::door_media(job_id, door_id, request.kind))
            .job(job_id)
            .door(door_id)
            .key(key);
        self.handle(call, |state, call| {
            let job = job_mut(state, call, job_id)?;
            let door = job
                .door_mut(door_id)
                .ok_or_else(|| call.error(404, format!("Door {} not found", door_id)))?;
            match request.kind {
                MediaKind::Photo => door.has_photo = true,
                MediaKind::Video => door.has_video = true,
            }
            state.uploads.push((
                job_id.to_string(),
                door_id.to_string(),
                request.kind,
                request.content_sha256.clone(),
            ));
            Ok(())
        })
    }

    fn dispatch(&self, date: NaiveDate) -> BackendResult<DispatchDay> {
        self.read(Call::new(BackendOp::Dispatch, paths::dispatch(date)), |state, _| {
            Ok(state.dispatch_days.get(&date).cloned().unwrap_or(DispatchDay {
                date,
                trucks: Vec::new(),
                jobs: Vec::new(),
            }))
        })
    }

    fn save_dispatch(&self, request: &DispatchRequest) -> BackendResult<()> {
        self.handle(Call::new(BackendOp::SaveDispatch, paths::save_dispatch()), |state, _| {
            if let Some(day) = state.dispatch_days.get_mut(&request.date) {
                for entry in day.jobs.iter_mut() {
                    match request.assignments.iter().find(|a| a.job_id == entry.job_id) {
                        Some(a) => {
                            entry.truck_id = Some(a.truck_id.clone());
                            entry.job_order = Some(a.job_order);
                            entry.is_visible = a.is_visible;
                        }
                        None => {
                            entry.truck_id = None;
                            entry.job_order = None;
                        }
                    }
                }
            }
            state.saved_dispatch.push(request.clone());
            Ok(())
        })
    }

    fn users(&self) -> BackendResult<Vec<User>> {
        self.read(Call::new(BackendOp::Users, paths::users()), |state, _| Ok(state.users.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doorflow_api::{Door, LineItem};

    fn job() -> Job {
        Job {
            id: "j1".to_string(),
            job_number: "J-1".to_string(),
            customer_name: "Acme Storage".to_string(),
            address: "1 Dock Rd".to_string(),
            contact_name: None,
            contact_phone: None,
            scope: String::new(),
            mobile_status: MobileStatus::NotStarted,
            start_time: None,
            doors: vec![Door {
                id: "d1".to_string(),
                door_number: "1".to_string(),
                location: String::new(),
                door_type: String::new(),
                dimensions: String::new(),
                labor_description: String::new(),
                line_items: vec![LineItem {
                    id: "li1".to_string(),
                    description: "Spring".to_string(),
                    part_number: None,
                    quantity: 1.0,
                    completed: false,
                }],
                has_photo: false,
                has_video: false,
                has_signature: false,
                completed: false,
            }],
        }
    }

    fn start_request() -> StartJobRequest {
        StartJobRequest {
            signature: "data:image/x-portable-graymap;base64,AA==".to_string(),
            signer_name: "Pat".to_string(),
            signer_title: None,
        }
    }

    #[test]
    fn test_start_job() {
        let backend = MockBackend::with_jobs([job()]);
        backend.start_job("j1", &start_request(), "k1").unwrap();

        let server = backend.job("j1").unwrap();
        assert_eq!(server.mobile_status, MobileStatus::Started);
        assert!(server.start_time.is_some());
        assert_eq!(backend.ops(), vec![BackendOp::StartJob]);
    }

    #[test]
    fn test_repeated_key_not_reapplied() {
        let backend = MockBackend::with_jobs([job()]);
        backend.start_job("j1", &start_request(), "k1").unwrap();
        // Second start would be a 409, but the key was already applied
        backend.start_job("j1", &start_request(), "k1").unwrap();
        assert!(backend.start_job("j1", &start_request(), "k2").is_err());
        assert_eq!(backend.count(BackendOp::StartJob), 3);
    }

    #[test]
    fn test_unreachable() {
        let backend = MockBackend::with_jobs([job()]);
        backend.set_reachable(false);
        let err = backend.field_job("j1").unwrap_err();
        assert!(err.is_connectivity());
        assert!(!backend.calls()[0].ok);
    }

    #[test]
    fn test_complete_door_checks_readiness() {
        let backend = MockBackend::with_jobs([job()]);
        let request = CompleteDoorRequest {
            signature: "sig".to_string(),
            signer_name: "Pat".to_string(),
            signer_title: None,
        };
        let err = backend.complete_door("j1", "d1", &request, "k1").unwrap_err();
        assert_eq!(err.status(), Some(422));
    }

    #[test]
    fn test_injected_failure() {
        let backend = MockBackend::with_jobs([job()]);
        backend.inject(BackendOp::FieldJob, FailureConfig::status(503, "maintenance").with_fail_count(1));
        assert_eq!(backend.field_job("j1").unwrap_err().status(), Some(503));
        assert!(backend.field_job("j1").is_ok());
    }

    #[test]
    fn test_missing_job() {
        let backend = MockBackend::new();
        assert_eq!(backend.field_job("nope").unwrap_err().status(), Some(404));
    }
}
