//! Dispatch board types (`GET /dispatch/{date}`, `POST /dispatch`).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A truck crew that jobs can be assigned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Truck {
    pub id: String,
    pub name: String,
}

/// A job as it appears on the dispatch board for one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchEntry {
    pub job_id: String,
    #[serde(default)]
    pub job_number: String,
    #[serde(default)]
    pub customer_name: String,
    /// Older backends call this `truck_assignment`.
    #[serde(default, alias = "truck_assignment")]
    pub truck_id: Option<String>,
    #[serde(default)]
    pub job_order: Option<u32>,
    #[serde(default = "default_visible")]
    pub is_visible: bool,
}

fn default_visible() -> bool {
    true
}

/// Board contents for a single day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchDay {
    pub date: NaiveDate,
    #[serde(default)]
    pub trucks: Vec<Truck>,
    #[serde(default)]
    pub jobs: Vec<DispatchEntry>,
}

/// One job's placement in a saved board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub job_id: String,
    #[serde(alias = "truck_assignment")]
    pub truck_id: String,
    /// 1-based position within the truck's run.
    pub job_order: u32,
    pub is_visible: bool,
}

/// Body of `POST /dispatch`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub date: NaiveDate,
    pub assignments: Vec<Assignment>,
}
