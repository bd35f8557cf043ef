//! Mock Backend
//!
//! In-process stand-in for the field-service REST backend. Used by the
//! unit and integration tests to drive the job worker without a network.
//!
//! - Keeps jobs, dispatch days and users in memory
//! - Applies mutations with the backend's own precondition checks
//! - Records every call in order, including failed ones
//! - Honours idempotency keys: a repeated key is acknowledged, not reapplied
//! - Supports per-operation failure injection and a global "unreachable" switch

mod backend;
mod failure;

pub use backend::{BackendOp, MockBackend, RecordedCall};
pub use failure::{FailureConfig, FailureInjector};
