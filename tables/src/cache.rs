//! # Table Cache
//!
//! Persists a built [`Tables`] graph as one blob per course and loads it back.
//!
//! Relationships inside the graph are arena indices, so a reloaded graph keeps
//! its structure: two submissions of the same group point at the same index
//! and therefore resolve to the very same reloaded `Group`. A blob is checked
//! with [`Tables::validate`] before it is handed out.
//!
//! The cache has no expiry. An entry disappears only through
//! [`TableCache::invalidate`]/[`TableCache::invalidate_all`], or when it turns
//! out to be unreadable, in which case it is deleted and reported as absent.

use crate::error::CacheError;
use crate::model::Tables;
use crate::types::CourseId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use util::paths;

/// Bumped whenever the serialised layout of [`Tables`] changes.
pub const CACHE_FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct CacheEnvelope<T> {
    version: u32,
    course: CourseId,
    saved_at: DateTime<Utc>,
    tables: T,
}

/// Serialise `tables` into a cache blob.
pub fn persist_tables(tables: &Tables) -> Result<Vec<u8>, CacheError> {
    let envelope = CacheEnvelope {
        version: CACHE_FORMAT_VERSION,
        course: tables.course().clone(),
        saved_at: Utc::now(),
        tables,
    };
    Ok(serde_json::to_vec(&envelope)?)
}

/// Deserialise a cache blob, validate it and rebuild its lookup index.
pub fn load_tables(blob: &[u8]) -> Result<Tables, CacheError> {
    #[derive(Deserialize)]
    struct Header {
        version: u32,
    }

    // Check the version first so an old layout reports as such, not as corrupt.
    let header: Header = serde_json::from_slice(blob)?;
    if header.version != CACHE_FORMAT_VERSION {
        return Err(CacheError::VersionMismatch {
            found: header.version,
            expected: CACHE_FORMAT_VERSION,
        });
    }

    let envelope: CacheEnvelope<Tables> = serde_json::from_slice(blob)?;
    if &envelope.course != envelope.tables.course() {
        return Err(CacheError::CourseMismatch {
            found: envelope.tables.course().clone(),
            expected: envelope.course,
        });
    }

    let mut tables = envelope.tables;
    tables.validate()?;
    tables.reindex();
    Ok(tables)
}

/// Directory of per-course cache blobs.
#[derive(Debug, Clone)]
pub struct TableCache {
    root: PathBuf,
}

impl TableCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Cache rooted at `AppConfig::cache_root`.
    pub fn from_config() -> Self {
        Self::new(paths::cache_root())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, course: &CourseId) -> PathBuf {
        paths::course_cache_path(&self.root, course.as_str())
    }

    /// Write the blob for `tables.course()`, replacing any previous one.
    ///
    /// The blob is written to a temporary file first and renamed into place,
    /// so readers see either the old or the new blob.
    pub fn store(&self, tables: &Tables) -> Result<PathBuf, CacheError> {
        let blob = persist_tables(tables)?;
        let path = self.path_for(tables.course());
        paths::ensure_dir(&self.root)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.root)?;
        tmp.write_all(&blob)?;
        tmp.flush()?;
        tmp.persist(&path).map_err(|e| CacheError::Io(e.error))?;

        debug!(course = %tables.course(), path = %path.display(), bytes = blob.len(), "stored tables");
        Ok(path)
    }

    /// Read and check the blob of `course`.
    ///
    /// `Ok(None)` when there is no blob. Decoding problems are returned so
    /// callers can tell them apart; [`TableCache::fetch`] absorbs them.
    pub fn read(&self, course: &CourseId) -> Result<Option<Tables>, CacheError> {
        let path = self.path_for(course);
        let blob = match fs::read(&path) {
            Ok(blob) => blob,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let tables = load_tables(&blob)?;
        if tables.course() != course {
            return Err(CacheError::CourseMismatch {
                found: tables.course().clone(),
                expected: course.clone(),
            });
        }
        Ok(Some(tables))
    }

    /// Load the cached graph of `course`, treating any unreadable blob as a
    /// miss. Unreadable blobs are deleted so the next store starts clean.
    pub fn fetch(&self, course: &CourseId) -> Option<Tables> {
        match self.read(course) {
            Ok(Some(tables)) => {
                debug!(course = %course, "cache hit");
                Some(tables)
            }
            Ok(None) => {
                debug!(course = %course, "cache miss");
                None
            }
            Err(err) => {
                warn!(course = %course, "discarding unreadable cache blob: {err}");
                if let Err(e) = self.invalidate(course) {
                    warn!(course = %course, "could not delete cache blob: {e}");
                }
                None
            }
        }
    }

    /// Delete the blob of `course`. Returns whether one existed.
    pub fn invalidate(&self, course: &CourseId) -> Result<bool, CacheError> {
        match fs::remove_file(self.path_for(course)) {
            Ok(()) => {
                info!(course = %course, "cache invalidated");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete every blob under the root. Returns how many were removed.
    pub fn invalidate_all(&self) -> Result<usize, CacheError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        for entry in entries {
            let path = entry?.path();
            if paths::is_cache_file(&path) {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        info!(root = %self.root.display(), removed, "cache cleared");
        Ok(removed)
    }
}
