//! Field job listing and summary types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::job::MobileStatus;

/// Row of `GET /mobile/field-jobs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldJobSummary {
    pub id: String,
    pub job_number: String,
    pub customer_name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub scheduled_date: Option<NaiveDate>,
    #[serde(default)]
    pub truck_id: Option<String>,
    #[serde(default)]
    pub mobile_status: MobileStatus,
    #[serde(default)]
    pub door_count: u32,
}

/// Body of `GET /mobile/field-summary`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldSummary {
    #[serde(default)]
    pub today: u32,
    #[serde(default)]
    pub not_started: u32,
    #[serde(default)]
    pub started: u32,
    #[serde(default)]
    pub completed: u32,
    #[serde(default)]
    pub generated_at: Option<DateTime<Utc>>,
}

/// Body of `POST /jobs/{id}/schedule`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub scheduled_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truck_id: Option<String>,
}
