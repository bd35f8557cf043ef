//! Backend Seam
//!
//! Abstracts the REST backend for testability. Provides:
//! - Backend trait: every call the field worker and dashboard make
//! - HttpBackend: blocking reqwest client for production
//! - MockBackend (in `crate::mock`): in-process backend for tests

mod error;
mod http;

pub use error::{BackendError, BackendResult};
pub use http::{HttpBackend, HttpConfig};

use chrono::NaiveDate;
use doorflow_api::{
    CompleteDoorRequest, CompleteJobRequest, DispatchDay, DispatchRequest, FieldJobSummary,
    FieldSummary, Job, LineItemRequest, MediaUploadRequest, Role, ScheduleRequest,
    StartJobRequest, User,
};

/// Calls made against the field-service backend.
///
/// Mutations take an idempotency key. A replayed queue entry reuses the key
/// it was recorded with, so a backend that honours the header can drop the
/// duplicate.
pub trait Backend: Send + Sync {
    /// Reachability check (`GET /mobile/test`)
    fn ping(&self) -> BackendResult<()>;

    /// Office job list (`GET /jobs`)
    fn jobs(&self) -> BackendResult<Vec<FieldJobSummary>>;

    /// Schedule a job on a date (`POST /jobs/{id}/schedule`)
    fn schedule_job(&self, job_id: &str, request: &ScheduleRequest) -> BackendResult<()>;

    /// Jobs for the field worker, optionally for one date
    fn field_jobs(&self, date: Option<NaiveDate>) -> BackendResult<Vec<FieldJobSummary>>;

    /// Full job with doors and line items
    fn field_job(&self, job_id: &str) -> BackendResult<Job>;

    fn field_summary(&self) -> BackendResult<FieldSummary>;

    fn start_job(&self, job_id: &str, request: &StartJobRequest, key: &str) -> BackendResult<()>;

    fn complete_door(
        &self,
        job_id: &str,
        door_id: &str,
        request: &CompleteDoorRequest,
        key: &str,
    ) -> BackendResult<()>;

    fn complete_job(&self, job_id: &str, request: &CompleteJobRequest, key: &str) -> BackendResult<()>;

    /// Set a line item's completed flag to the requested state
    fn set_line_item(
        &self,
        job_id: &str,
        door_id: &str,
        line_item_id: &str,
        request: LineItemRequest,
        key: &str,
    ) -> BackendResult<()>;

    /// Upload a door photo or video
    fn upload_media(
        &self,
        job_id: &str,
        door_id: &str,
        request: &MediaUploadRequest,
        key: &str,
    ) -> BackendResult<()>;

    fn dispatch(&self, date: NaiveDate) -> BackendResult<DispatchDay>;

    fn save_dispatch(&self, request: &DispatchRequest) -> BackendResult<()>;

    fn users(&self) -> BackendResult<Vec<User>>;
}

/// Users holding `role`. The backend has no role filter, so this is done
/// client-side.
pub fn users_with_role(backend: &dyn Backend, role: &Role) -> BackendResult<Vec<User>> {
    Ok(backend
        .users()?
        .into_iter()
        .filter(|u| &u.role == role)
        .collect())
}
