//! Pending change queue
//!
//! Mutations made while offline are appended here, one FIFO per job, and
//! replayed in insertion order when connectivity returns (see `crate::sync`).
//! An entry leaves the queue only after the backend accepted it.

use chrono::{DateTime, Utc};
use doorflow_api::{CompleteDoorRequest, CompleteJobRequest, StartJobRequest};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tracing::info;
use uuid::Uuid;

use super::{check_schema, ensure_dir, file_key, json_files, read_json, remove_file, write_json, StoreError};

/// Schema version for queue documents
pub const SCHEMA_VERSION: u32 = 1;

/// Schema identifier
pub const SCHEMA_ID: &str = "doorflow-field/sync_queue@1";

/// Customer sign-off as recorded for replay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignOffRecord {
    /// Signature image as a data URL
    pub signature: String,
    pub signer_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signer_title: Option<String>,
}

impl SignOffRecord {
    pub fn start_request(&self) -> StartJobRequest {
        StartJobRequest {
            signature: self.signature.clone(),
            signer_name: self.signer_name.clone(),
            signer_title: self.signer_title.clone(),
        }
    }

    pub fn complete_door_request(&self) -> CompleteDoorRequest {
        CompleteDoorRequest {
            signature: self.signature.clone(),
            signer_name: self.signer_name.clone(),
            signer_title: self.signer_title.clone(),
        }
    }

    pub fn complete_job_request(&self) -> CompleteJobRequest {
        CompleteJobRequest {
            signature: self.signature.clone(),
            signer_name: self.signer_name.clone(),
            signer_title: self.signer_title.clone(),
        }
    }
}

/// Kind of a pending change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    JobStart,
    DoorComplete,
    JobComplete,
    LineItem,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChangeKind::JobStart => "job_start",
            ChangeKind::DoorComplete => "door_complete",
            ChangeKind::JobComplete => "job_complete",
            ChangeKind::LineItem => "line_item",
        })
    }
}

/// A mutation waiting to be replayed, carrying the backend call's arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PendingChange {
    JobStart {
        sign_off: SignOffRecord,
    },
    DoorComplete {
        door_id: String,
        sign_off: SignOffRecord,
    },
    JobComplete {
        sign_off: SignOffRecord,
    },
    /// Target state, not a flip, so a replay is idempotent
    LineItem {
        door_id: String,
        line_item_id: String,
        completed: bool,
    },
}

impl PendingChange {
    pub fn kind(&self) -> ChangeKind {
        match self {
            PendingChange::JobStart { .. } => ChangeKind::JobStart,
            PendingChange::DoorComplete { .. } => ChangeKind::DoorComplete,
            PendingChange::JobComplete { .. } => ChangeKind::JobComplete,
            PendingChange::LineItem { .. } => ChangeKind::LineItem,
        }
    }
}

/// A change as stored in the queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedChange {
    /// Position in the job's queue; strictly increasing
    pub seq: u64,
    /// Sent as the idempotency key on replay
    pub change_id: String,
    pub created_at: DateTime<Utc>,
    pub change: PendingChange,
}

impl QueuedChange {
    pub fn kind(&self) -> ChangeKind {
        self.change.kind()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct QueueDocument {
    schema_version: u32,
    schema_id: String,
    job_id: String,
    next_seq: u64,
    changes: Vec<QueuedChange>,
}

impl QueueDocument {
    fn empty(job_id: &str) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            schema_id: SCHEMA_ID.to_string(),
            job_id: job_id.to_string(),
            next_seq: 1,
            changes: Vec::new(),
        }
    }
}

/// Per-job FIFO of changes made offline
#[derive(Debug, Clone)]
pub struct SyncQueue {
    dir: PathBuf,
}

impl SyncQueue {
    pub fn open(dir: PathBuf) -> Result<Self, StoreError> {
        ensure_dir(&dir)?;
        Ok(Self { dir })
    }

    fn path(&self, job_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_key(job_id)))
    }

    fn load(&self, job_id: &str) -> Result<QueueDocument, StoreError> {
        let path = self.path(job_id);
        match read_json::<QueueDocument>(&path)? {
            Some(doc) => {
                check_schema(&path, SCHEMA_ID, &doc.schema_id)?;
                Ok(doc)
            }
            None => Ok(QueueDocument::empty(job_id)),
        }
    }

    fn save(&self, doc: &QueueDocument) -> Result<(), StoreError> {
        let path = self.path(&doc.job_id);
        if doc.changes.is_empty() {
            remove_file(&path)?;
            Ok(())
        } else {
            write_json(&path, doc)
        }
    }

    /// Append a change behind everything already queued for the job
    pub fn enqueue(&self, job_id: &str, change: PendingChange) -> Result<QueuedChange, StoreError> {
        let mut doc = self.load(job_id)?;
        let queued = QueuedChange {
            seq: doc.next_seq,
            change_id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            change,
        };
        doc.next_seq += 1;
        doc.changes.push(queued.clone());
        self.save(&doc)?;

        info!(
            job_id,
            seq = queued.seq,
            kind = %queued.kind(),
            pending = doc.changes.len(),
            "queued offline change"
        );
        Ok(queued)
    }

    /// Queued changes in replay order
    pub fn pending(&self, job_id: &str) -> Result<Vec<QueuedChange>, StoreError> {
        Ok(self.load(job_id)?.changes)
    }

    /// Oldest queued change
    pub fn front(&self, job_id: &str) -> Result<Option<QueuedChange>, StoreError> {
        Ok(self.load(job_id)?.changes.into_iter().next())
    }

    pub fn len(&self, job_id: &str) -> Result<usize, StoreError> {
        Ok(self.load(job_id)?.changes.len())
    }

    pub fn is_empty(&self, job_id: &str) -> Result<bool, StoreError> {
        Ok(self.len(job_id)? == 0)
    }

    /// Remove the front entry once it has been applied.
    ///
    /// Only the front may be acknowledged; anything else returns false and
    /// leaves the queue untouched.
    pub fn acknowledge(&self, job_id: &str, seq: u64) -> Result<bool, StoreError> {
        let mut doc = self.load(job_id)?;
        if doc.changes.first().map(|c| c.seq) != Some(seq) {
            return Ok(false);
        }
        doc.changes.remove(0);
        self.save(&doc)?;
        Ok(true)
    }

    /// Ids of jobs with at least one queued change
    pub fn jobs_with_pending(&self) -> Result<Vec<String>, StoreError> {
        let mut ids = Vec::new();
        for path in json_files(&self.dir)? {
            if let Some(doc) = read_json::<QueueDocument>(&path)? {
                if !doc.changes.is_empty() {
                    ids.push(doc.job_id);
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn queue() -> (TempDir, SyncQueue) {
        let dir = TempDir::new().unwrap();
        let queue = SyncQueue::open(dir.path().join("queue")).unwrap();
        (dir, queue)
    }

    fn toggle(item: &str, completed: bool) -> PendingChange {
        PendingChange::LineItem {
            door_id: "d1".to_string(),
            line_item_id: item.to_string(),
            completed,
        }
    }

    fn sign_off() -> SignOffRecord {
        SignOffRecord {
            signature: "data:image/x-portable-graymap;base64,AA==".to_string(),
            signer_name: "Dana Cole".to_string(),
            signer_title: Some("Facilities".to_string()),
        }
    }

    #[test]
    fn test_enqueue_preserves_order() {
        let (_dir, queue) = queue();
        queue.enqueue("j1", toggle("a", true)).unwrap();
        queue.enqueue("j1", PendingChange::JobStart { sign_off: sign_off() }).unwrap();
        queue.enqueue("j1", toggle("b", false)).unwrap();

        let pending = queue.pending("j1").unwrap();
        let seqs: Vec<u64> = pending.iter().map(|c| c.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
        assert_eq!(pending[1].kind(), ChangeKind::JobStart);
        assert_ne!(pending[0].change_id, pending[2].change_id);
    }

    #[test]
    fn test_queues_scoped_per_job() {
        let (_dir, queue) = queue();
        queue.enqueue("j1", toggle("a", true)).unwrap();
        queue.enqueue("j2", toggle("a", true)).unwrap();
        queue.enqueue("j2", toggle("b", true)).unwrap();

        assert_eq!(queue.len("j1").unwrap(), 1);
        assert_eq!(queue.len("j2").unwrap(), 2);
        assert_eq!(queue.jobs_with_pending().unwrap(), vec!["j1".to_string(), "j2".to_string()]);
    }

    #[test]
    fn test_acknowledge_only_front() {
        let (_dir, queue) = queue();
        queue.enqueue("j1", toggle("a", true)).unwrap();
        queue.enqueue("j1", toggle("b", true)).unwrap();

        assert!(!queue.acknowledge("j1", 2).unwrap());
        assert_eq!(queue.len("j1").unwrap(), 2);

        assert!(queue.acknowledge("j1", 1).unwrap());
        assert_eq!(queue.front("j1").unwrap().unwrap().seq, 2);
    }

    #[test]
    fn test_seq_keeps_increasing_after_ack() {
        let (_dir, queue) = queue();
        queue.enqueue("j1", toggle("a", true)).unwrap();
        queue.enqueue("j1", toggle("b", true)).unwrap();
        queue.acknowledge("j1", 1).unwrap();

        let next = queue.enqueue("j1", toggle("c", true)).unwrap();
        assert_eq!(next.seq, 3);
    }

    #[test]
    fn test_empty_queue_removes_file() {
        let (_dir, queue) = queue();
        queue.enqueue("j1", toggle("a", true)).unwrap();
        queue.acknowledge("j1", 1).unwrap();

        assert!(queue.is_empty("j1").unwrap());
        assert!(!queue.path("j1").exists());
        assert!(queue.jobs_with_pending().unwrap().is_empty());
    }

    #[test]
    fn test_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let queue = SyncQueue::open(dir.path().to_path_buf()).unwrap();
            queue.enqueue("j1", PendingChange::JobComplete { sign_off: sign_off() }).unwrap();
        }
        let queue = SyncQueue::open(dir.path().to_path_buf()).unwrap();
        let pending = queue.pending("j1").unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].change, PendingChange::JobComplete { sign_off: sign_off() });
    }

    #[test]
    fn test_wire_format() {
        let json = serde_json::to_value(toggle("li1", true)).unwrap();
        assert_eq!(json["kind"], "line_item");
        assert_eq!(json["line_item_id"], "li1");
        assert_eq!(json["completed"], true);
    }
}
