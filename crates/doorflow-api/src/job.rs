//! Field job types.
//!
//! A job as served by `GET /mobile/field-jobs/{id}`: customer details, the
//! mobile status and the doors to be installed, each with a checklist.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Mobile status of a field job.
///
/// Status only advances: NOT_STARTED → STARTED → COMPLETED.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MobileStatus {
    /// Technician has not signed in on site yet.
    #[default]
    NotStarted,
    /// Work is under way; the elapsed timer runs.
    Started,
    /// Customer signed off the whole job.
    Completed,
}

impl MobileStatus {
    /// Check if transition from this status to target is valid
    pub fn can_transition_to(&self, target: MobileStatus) -> bool {
        matches!(
            (self, target),
            (MobileStatus::NotStarted, MobileStatus::Started)
                | (MobileStatus::Started, MobileStatus::Completed)
        )
    }

    /// Completed jobs accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, MobileStatus::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MobileStatus::NotStarted => "not_started",
            MobileStatus::Started => "started",
            MobileStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for MobileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A field job with its doors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub job_number: String,
    pub customer_name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
    /// Free-text scope of work.
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub mobile_status: MobileStatus,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub doors: Vec<Door>,
}

impl Job {
    pub fn door(&self, door_id: &str) -> Option<&Door> {
        self.doors.iter().find(|d| d.id == door_id)
    }

    pub fn door_mut(&mut self, door_id: &str) -> Option<&mut Door> {
        self.doors.iter_mut().find(|d| d.id == door_id)
    }

    /// True when every door is completed. A job without doors has nothing
    /// to sign off and is never ready.
    pub fn all_doors_completed(&self) -> bool {
        !self.doors.is_empty() && self.doors.iter().all(|d| d.completed)
    }

    /// Ids of doors that still block job completion.
    pub fn incomplete_doors(&self) -> Vec<String> {
        self.doors
            .iter()
            .filter(|d| !d.completed)
            .map(|d| d.id.clone())
            .collect()
    }

    /// Number of completed doors, for progress display.
    pub fn completed_door_count(&self) -> usize {
        self.doors.iter().filter(|d| d.completed).count()
    }
}

/// A single door on a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Door {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub door_number: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub door_type: String,
    /// Width x height as printed on the work order.
    #[serde(default)]
    pub dimensions: String,
    #[serde(default)]
    pub labor_description: String,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    #[serde(default)]
    pub has_photo: bool,
    #[serde(default)]
    pub has_video: bool,
    #[serde(default)]
    pub has_signature: bool,
    #[serde(default)]
    pub completed: bool,
}

/// Something still missing before a door can be signed off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "requirement", content = "id", rename_all = "snake_case")]
pub enum DoorRequirement {
    /// Checklist item not yet ticked.
    LineItem(String),
    Photo,
    Video,
}

impl fmt::Display for DoorRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DoorRequirement::LineItem(id) => write!(f, "line item {}", id),
            DoorRequirement::Photo => f.write_str("photo"),
            DoorRequirement::Video => f.write_str("video"),
        }
    }
}

impl Door {
    pub fn line_item(&self, line_item_id: &str) -> Option<&LineItem> {
        self.line_items.iter().find(|i| i.id == line_item_id)
    }

    pub fn line_item_mut(&mut self, line_item_id: &str) -> Option<&mut LineItem> {
        self.line_items.iter_mut().find(|i| i.id == line_item_id)
    }

    pub fn all_line_items_completed(&self) -> bool {
        self.line_items.iter().all(|i| i.completed)
    }

    /// Everything that still blocks sign-off, in checklist order.
    pub fn missing_requirements(&self) -> Vec<DoorRequirement> {
        let mut missing: Vec<DoorRequirement> = self
            .line_items
            .iter()
            .filter(|i| !i.completed)
            .map(|i| DoorRequirement::LineItem(i.id.clone()))
            .collect();
        if !self.has_photo {
            missing.push(DoorRequirement::Photo);
        }
        if !self.has_video {
            missing.push(DoorRequirement::Video);
        }
        missing
    }

    /// Ready for the customer signature.
    pub fn is_ready_for_signoff(&self) -> bool {
        self.missing_requirements().is_empty()
    }
}

/// A checklist entry (part or labor step) on a door.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub part_number: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: f64,
    #[serde(default)]
    pub completed: bool,
}

fn default_quantity() -> f64 {
    1.0
}

/// Accept ids serialized either as JSON strings or integers.
fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}
