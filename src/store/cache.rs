//! Cached job documents
//!
//! One document per job id holding the last job payload fetched from the
//! backend, plus any offline edits applied on top of it. There is no
//! eviction; see `DeviceStore::prune_completed`.

use chrono::{DateTime, Utc};
use doorflow_api::Job;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::{check_schema, ensure_dir, file_key, json_files, read_json, remove_file, write_json, StoreError};

/// Schema version for cached job documents
pub const SCHEMA_VERSION: u32 = 1;

/// Schema identifier
pub const SCHEMA_ID: &str = "doorflow-field/cached_job@1";

/// On-disk envelope around a cached job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedJob {
    pub schema_version: u32,
    pub schema_id: String,
    pub job_id: String,
    /// When this copy was written
    pub cached_at: DateTime<Utc>,
    pub job: Job,
}

/// Last known copy of each job, keyed by job id
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn open(dir: PathBuf) -> Result<Self, StoreError> {
        ensure_dir(&dir)?;
        Ok(Self { dir })
    }

    fn path(&self, job_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_key(job_id)))
    }

    /// Full cached document, including when it was written
    pub fn entry(&self, job_id: &str) -> Result<Option<CachedJob>, StoreError> {
        let path = self.path(job_id);
        let Some(doc) = read_json::<CachedJob>(&path)? else {
            return Ok(None);
        };
        check_schema(&path, SCHEMA_ID, &doc.schema_id)?;
        Ok(Some(doc))
    }

    pub fn get(&self, job_id: &str) -> Result<Option<Job>, StoreError> {
        Ok(self.entry(job_id)?.map(|doc| doc.job))
    }

    pub fn put(&self, job_id: &str, job: &Job) -> Result<(), StoreError> {
        let doc = CachedJob {
            schema_version: SCHEMA_VERSION,
            schema_id: SCHEMA_ID.to_string(),
            job_id: job_id.to_string(),
            cached_at: Utc::now(),
            job: job.clone(),
        };
        write_json(&self.path(job_id), &doc)
    }

    /// Returns whether a document was removed
    pub fn remove(&self, job_id: &str) -> Result<bool, StoreError> {
        remove_file(&self.path(job_id))
    }

    /// Ids of every cached job
    pub fn job_ids(&self) -> Result<Vec<String>, StoreError> {
        let mut ids = Vec::new();
        for path in json_files(&self.dir)? {
            if let Some(doc) = read_json::<CachedJob>(&path)? {
                ids.push(doc.job_id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::sample_job;
    use tempfile::TempDir;

    fn store() -> (TempDir, CacheStore) {
        let dir = TempDir::new().unwrap();
        let cache = CacheStore::open(dir.path().join("jobs")).unwrap();
        (dir, cache)
    }

    #[test]
    fn test_put_then_get_returns_same_job() {
        let (_dir, cache) = store();
        let job = sample_job("j1");

        cache.put("j1", &job).unwrap();

        assert_eq!(cache.get("j1").unwrap(), Some(job));
    }

    #[test]
    fn test_get_missing() {
        let (_dir, cache) = store();
        assert_eq!(cache.get("nope").unwrap(), None);
    }

    #[test]
    fn test_put_overwrites() {
        let (_dir, cache) = store();
        let mut job = sample_job("j1");
        cache.put("j1", &job).unwrap();

        job.doors[0].has_video = true;
        cache.put("j1", &job).unwrap();

        assert!(cache.get("j1").unwrap().unwrap().doors[0].has_video);
        assert_eq!(cache.job_ids().unwrap(), vec!["j1".to_string()]);
    }

    #[test]
    fn test_ids_with_unsafe_characters() {
        let (_dir, cache) = store();
        let job = sample_job("2026/05 #7");
        cache.put(&job.id, &job).unwrap();

        assert_eq!(cache.get("2026/05 #7").unwrap(), Some(job));
        assert_eq!(cache.job_ids().unwrap(), vec!["2026/05 #7".to_string()]);
    }

    #[test]
    fn test_encoded_and_plain_ids_do_not_collide() {
        let (_dir, cache) = store();
        // "x-612062" is the plain spelling of what "a b" once encoded to
        let plain = sample_job("x-612062");
        let spaced = sample_job("a b");
        cache.put(&plain.id, &plain).unwrap();
        cache.put(&spaced.id, &spaced).unwrap();

        assert_eq!(cache.get("x-612062").unwrap(), Some(plain));
        assert_eq!(cache.get("a b").unwrap(), Some(spaced));
        assert_eq!(cache.job_ids().unwrap(), vec!["a b".to_string(), "x-612062".to_string()]);
    }

    #[test]
    fn test_remove() {
        let (_dir, cache) = store();
        cache.put("j1", &sample_job("j1")).unwrap();

        assert!(cache.remove("j1").unwrap());
        assert!(!cache.remove("j1").unwrap());
        assert!(cache.get("j1").unwrap().is_none());
    }

    #[test]
    fn test_schema_checked() {
        let (_dir, cache) = store();
        cache.put("j1", &sample_job("j1")).unwrap();

        let path = cache.path("j1");
        let mut doc: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        doc["schema_id"] = serde_json::json!("something-else@9");
        std::fs::write(&path, serde_json::to_vec(&doc).unwrap()).unwrap();

        assert!(matches!(cache.get("j1"), Err(StoreError::SchemaMismatch { .. })));
    }
}
