//! Failure Injection for Mock Backend
//!
//! Supports configurable failure injection for testing error paths.

use std::collections::HashMap;

use crate::backend::BackendError;

use super::backend::BackendOp;

/// Failure configuration for an operation
#[derive(Debug, Clone)]
pub struct FailureConfig {
    /// HTTP status to answer with (ignored when `unreachable`)
    pub status: u16,
    /// Error message to return
    pub message: String,
    /// Simulate a dropped connection instead of an HTTP error
    pub unreachable: bool,
    /// Number of times to fail before succeeding (None = always fail)
    pub fail_count: Option<u32>,
}

impl FailureConfig {
    /// Create a config that answers with an HTTP error
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            unreachable: false,
            fail_count: None,
        }
    }

    /// Create a config that drops the connection
    pub fn unreachable() -> Self {
        Self {
            status: 0,
            message: "connection reset".to_string(),
            unreachable: true,
            fail_count: None,
        }
    }

    /// Set the number of times to fail before succeeding
    pub fn with_fail_count(mut self, count: u32) -> Self {
        self.fail_count = Some(count);
        self
    }

    /// Error a real backend call would surface for this failure
    pub fn to_error(&self, endpoint: &str) -> BackendError {
        if self.unreachable {
            BackendError::Connection(format!("{}: {}", endpoint, self.message))
        } else {
            BackendError::Status {
                endpoint: endpoint.to_string(),
                status: self.status,
                message: self.message.clone(),
            }
        }
    }
}

/// Failure injector for the mock backend
#[derive(Debug, Default)]
pub struct FailureInjector {
    /// Per-operation failure configs
    configs: HashMap<BackendOp, FailureConfig>,
    /// Call counts per operation (for fail_count tracking)
    call_counts: HashMap<BackendOp, u32>,
}

impl FailureInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject a failure for an operation
    pub fn inject(&mut self, op: BackendOp, config: FailureConfig) {
        self.configs.insert(op, config);
        self.call_counts.insert(op, 0);
    }

    /// Clear all failure injections
    pub fn clear(&mut self) {
        self.configs.clear();
        self.call_counts.clear();
    }

    /// Clear failure injection for a specific operation
    pub fn clear_op(&mut self, op: BackendOp) {
        self.configs.remove(&op);
        self.call_counts.remove(&op);
    }

    /// Check if a failure should occur for an operation
    pub fn check(&mut self, op: BackendOp) -> Option<&FailureConfig> {
        let config = self.configs.get(&op)?;
        let count = self.call_counts.entry(op).or_insert(0);
        *count += 1;

        if let Some(fail_limit) = config.fail_count {
            if *count > fail_limit {
                return None;
            }
        }

        Some(config)
    }
}
