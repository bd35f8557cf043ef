//! Device-local persistent store
//!
//! Everything the worker needs to keep across restarts while offline lives
//! under one root directory:
//!
//! ```text
//! <root>/jobs/<job>.json            last fetched job (CacheStore)
//! <root>/queue/<job>.json           pending changes (SyncQueue)
//! <root>/media/<job>/<door>.<kind>.json   photos captured offline (MediaStore)
//! ```
//!
//! Documents are JSON with a schema envelope and are written atomically
//! (write temp file, then rename).

mod cache;
mod media;
mod queue;

pub use cache::{CacheStore, CachedJob};
pub use media::{MediaStore, StoredMedia};
pub use queue::{ChangeKind, PendingChange, QueuedChange, SignOffRecord, SyncQueue};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unexpected schema in {path}: expected {expected}, found {found}")]
    SchemaMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },
}

/// The three device-local stores sharing one root
#[derive(Debug, Clone)]
pub struct DeviceStore {
    root: PathBuf,
    cache: CacheStore,
    queue: SyncQueue,
    media: MediaStore,
}

impl DeviceStore {
    /// Open (creating directories as needed) a store rooted at `root`
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        let cache = CacheStore::open(root.join("jobs"))?;
        let queue = SyncQueue::open(root.join("queue"))?;
        let media = MediaStore::open(root.join("media"))?;
        Ok(Self {
            root,
            cache,
            queue,
            media,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn queue(&self) -> &SyncQueue {
        &self.queue
    }

    pub fn media(&self) -> &MediaStore {
        &self.media
    }

    /// Drop cached jobs that are completed and have nothing left to sync.
    ///
    /// Returns the ids removed.
    pub fn prune_completed(&self) -> Result<Vec<String>, StoreError> {
        let mut removed = Vec::new();
        for job_id in self.cache.job_ids()? {
            let Some(job) = self.cache.get(&job_id)? else {
                continue;
            };
            if !job.mobile_status.is_terminal() {
                continue;
            }
            if !self.queue.is_empty(&job_id)? || !self.media.list(&job_id)?.is_empty() {
                continue;
            }
            self.cache.remove(&job_id)?;
            removed.push(job_id);
        }
        Ok(removed)
    }
}

/// File name for an id. Ids made of `[A-Za-z0-9_-]` are used as is; anything
/// else is hex-encoded behind a `~`, which safe ids never contain, so it
/// cannot escape the directory or collide with a safe id.
pub(crate) fn file_key(id: &str) -> String {
    let safe = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if safe {
        id.to_string()
    } else {
        format!("~{}", hex::encode(id.as_bytes()))
    }
}

pub(crate) fn ensure_dir(dir: &Path) -> Result<(), StoreError> {
    fs::create_dir_all(dir).map_err(|source| StoreError::Io {
        path: dir.to_path_buf(),
        source,
    })
}

/// Write atomically to file (write-then-rename)
pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let json = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, &json).map_err(|source| StoreError::Io {
        path: temp_path.clone(),
        source,
    })?;
    fs::rename(&temp_path, path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    debug!(path = %path.display(), bytes = json.len(), "wrote store document");
    Ok(())
}

/// Read a document, `None` when the file does not exist
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })
}

/// Remove a document; missing files are fine
pub(crate) fn remove_file(path: &Path) -> Result<bool, StoreError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(StoreError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// `*.json` files directly inside `dir`
pub(crate) fn json_files(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(StoreError::Io {
                path: dir.to_path_buf(),
                source,
            })
        }
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| StoreError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

pub(crate) fn check_schema(path: &Path, expected: &str, found: &str) -> Result<(), StoreError> {
    if expected == found {
        Ok(())
    } else {
        Err(StoreError::SchemaMismatch {
            path: path.to_path_buf(),
            expected: expected.to_string(),
            found: found.to_string(),
        })
    }
}
