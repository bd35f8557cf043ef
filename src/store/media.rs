//! Media captured while offline
//!
//! Holds photo payloads until they can be uploaded. One document per
//! job + door + media kind; a later capture for the same door replaces the
//! earlier one.

use chrono::{DateTime, Utc};
use doorflow_api::{MediaKind, MediaPayload};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use uuid::Uuid;

use super::{check_schema, ensure_dir, file_key, json_files, read_json, remove_file, write_json, StoreError};

/// Schema version for stored media documents
pub const SCHEMA_VERSION: u32 = 1;

/// Schema identifier
pub const SCHEMA_ID: &str = "doorflow-field/stored_media@1";

/// A payload waiting for upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMedia {
    pub schema_version: u32,
    pub schema_id: String,
    pub job_id: String,
    pub door_id: String,
    pub kind: MediaKind,
    /// Idempotency key used for the upload
    pub upload_id: String,
    pub stored_at: DateTime<Utc>,
    pub payload: MediaPayload,
}

/// Offline media payloads keyed by job, door and kind
#[derive(Debug, Clone)]
pub struct MediaStore {
    dir: PathBuf,
}

impl MediaStore {
    pub fn open(dir: PathBuf) -> Result<Self, StoreError> {
        ensure_dir(&dir)?;
        Ok(Self { dir })
    }

    fn job_dir(&self, job_id: &str) -> PathBuf {
        self.dir.join(file_key(job_id))
    }

    fn path(&self, job_id: &str, door_id: &str, kind: MediaKind) -> PathBuf {
        self.job_dir(job_id)
            .join(format!("{}.{}.json", file_key(door_id), kind.as_str()))
    }

    pub fn put(
        &self,
        job_id: &str,
        door_id: &str,
        kind: MediaKind,
        payload: MediaPayload,
    ) -> Result<StoredMedia, StoreError> {
        ensure_dir(&self.job_dir(job_id))?;
        let doc = StoredMedia {
            schema_version: SCHEMA_VERSION,
            schema_id: SCHEMA_ID.to_string(),
            job_id: job_id.to_string(),
            door_id: door_id.to_string(),
            kind,
            upload_id: Uuid::new_v4().to_string(),
            stored_at: Utc::now(),
            payload,
        };
        write_json(&self.path(job_id, door_id, kind), &doc)?;
        Ok(doc)
    }

    pub fn get(&self, job_id: &str, door_id: &str, kind: MediaKind) -> Result<Option<StoredMedia>, StoreError> {
        let path = self.path(job_id, door_id, kind);
        let Some(doc) = read_json::<StoredMedia>(&path)? else {
            return Ok(None);
        };
        check_schema(&path, SCHEMA_ID, &doc.schema_id)?;
        Ok(Some(doc))
    }

    pub fn remove(&self, job_id: &str, door_id: &str, kind: MediaKind) -> Result<bool, StoreError> {
        remove_file(&self.path(job_id, door_id, kind))
    }

    /// Everything stored for a job, oldest first
    pub fn list(&self, job_id: &str) -> Result<Vec<StoredMedia>, StoreError> {
        let mut docs = Vec::new();
        for path in json_files(&self.job_dir(job_id))? {
            if let Some(doc) = read_json::<StoredMedia>(&path)? {
                check_schema(&path, SCHEMA_ID, &doc.schema_id)?;
                docs.push(doc);
            }
        }
        docs.sort_by(|a, b| a.stored_at.cmp(&b.stored_at));
        Ok(docs)
    }

    /// Ids of jobs holding at least one payload
    pub fn job_ids(&self) -> Result<Vec<String>, StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.dir.clone(),
                    source,
                })
            }
        };

        let mut ids = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|source| StoreError::Io {
                    path: self.dir.clone(),
                    source,
                })?
                .path();
            if !path.is_dir() {
                continue;
            }
            // Any document carries the original id
            for file in json_files(&path)? {
                if let Some(doc) = read_json::<StoredMedia>(&file)? {
                    ids.push(doc.job_id);
                    break;
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Raw bytes held for a job
    pub fn total_bytes(&self, job_id: &str) -> Result<usize, StoreError> {
        Ok(self.list(job_id)?.iter().map(|m| m.payload.len()).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, MediaStore) {
        let dir = TempDir::new().unwrap();
        let media = MediaStore::open(dir.path().join("media")).unwrap();
        (dir, media)
    }

    #[test]
    fn test_put_get() {
        let (_dir, media) = store();
        let payload = MediaPayload::new("image/jpeg", vec![1, 2, 3]);
        media.put("j1", "d1", MediaKind::Photo, payload.clone()).unwrap();

        let stored = media.get("j1", "d1", MediaKind::Photo).unwrap().unwrap();
        assert_eq!(stored.payload, payload);
        assert!(media.get("j1", "d1", MediaKind::Video).unwrap().is_none());
        assert!(media.get("j1", "d2", MediaKind::Photo).unwrap().is_none());
    }

    #[test]
    fn test_replace_same_door() {
        let (_dir, media) = store();
        media.put("j1", "d1", MediaKind::Photo, MediaPayload::new("image/jpeg", vec![1])).unwrap();
        media.put("j1", "d1", MediaKind::Photo, MediaPayload::new("image/jpeg", vec![2, 2])).unwrap();

        let all = media.list("j1").unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].payload.data, vec![2, 2]);
        assert_eq!(media.total_bytes("j1").unwrap(), 2);
    }

    #[test]
    fn test_list_scoped_per_job() {
        let (_dir, media) = store();
        media.put("j1", "d1", MediaKind::Photo, MediaPayload::new("image/jpeg", vec![1])).unwrap();
        media.put("j1", "d2", MediaKind::Photo, MediaPayload::new("image/jpeg", vec![1])).unwrap();
        media.put("j2", "d1", MediaKind::Photo, MediaPayload::new("image/jpeg", vec![1])).unwrap();

        assert_eq!(media.list("j1").unwrap().len(), 2);
        assert_eq!(media.list("j2").unwrap().len(), 1);
        assert!(media.list("j3").unwrap().is_empty());
        assert_eq!(media.job_ids().unwrap(), vec!["j1".to_string(), "j2".to_string()]);
    }

    #[test]
    fn test_remove() {
        let (_dir, media) = store();
        media.put("j1", "d1", MediaKind::Photo, MediaPayload::new("image/jpeg", vec![1])).unwrap();
        assert!(media.remove("j1", "d1", MediaKind::Photo).unwrap());
        assert!(media.list("j1").unwrap().is_empty());
    }
}
