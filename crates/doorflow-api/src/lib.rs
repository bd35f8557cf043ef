//! Doorflow API Types
//!
//! Defines the JSON bodies exchanged with the field-service REST backend:
//! jobs as the mobile worker sees them, the mutation requests the worker
//! sends, media uploads, dispatch boards and users.

pub mod dispatch;
pub mod error;
pub mod job;
pub mod media;
pub mod paths;
pub mod requests;
pub mod summary;
pub mod users;

pub use dispatch::{Assignment, DispatchDay, DispatchEntry, DispatchRequest, Truck};
pub use error::{ApiErrorBody, MediaError};
pub use job::{Door, DoorRequirement, Job, LineItem, MobileStatus};
pub use media::{MediaKind, MediaPayload};
pub use paths::{Endpoint, Method};
pub use requests::{CompleteDoorRequest, CompleteJobRequest, LineItemRequest, MediaUploadRequest, StartJobRequest};
pub use summary::{FieldJobSummary, FieldSummary, ScheduleRequest};
pub use users::{Role, User};

/// Header carrying the client-chosen idempotency key on mutations.
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";
