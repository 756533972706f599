//! On-disk session store and archive.
//!
//! The whole active-session map is one JSON document:
//!
//! ```json
//! { "sessions": { "<user_id>": { "session_id": "...", "user_id": "...",
//!   "created_at": 0, "last_active": 0, "messages": [...] } } }
//! ```
//!
//! Every read and write goes through a cross-process advisory lock on
//! `<store>.lock` with a bounded acquire timeout. Writes land in a sibling
//! temp file that is fsynced and renamed over the store.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::types::Session;
use crate::utils;

/// Poll interval while waiting for the store lock.
const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Name of the archive directory next to the store file.
pub const ARCHIVE_DIR_NAME: &str = "archived_sessions";

// ─────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────

/// Persistence failure. Recovered by the session manager (logged, memory kept).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("session store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("session store JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("timed out after {waited:?} waiting for lock {}", .path.display())]
    LockTimeout { path: PathBuf, waited: Duration },
}

// ─────────────────────────────────────────────
// FileLock
// ─────────────────────────────────────────────

/// Exclusive advisory lock on a `.lock` file. Released on drop.
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Acquire an exclusive lock on `path`, polling until `timeout` elapses.
    pub fn acquire(path: &Path, timeout: Duration) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let started = Instant::now();
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    return Ok(Self {
                        file,
                        path: path.to_path_buf(),
                    })
                }
                Err(_) if started.elapsed() < timeout => std::thread::sleep(LOCK_POLL_INTERVAL),
                Err(_) => {
                    return Err(StoreError::LockTimeout {
                        path: path.to_path_buf(),
                        waited: started.elapsed(),
                    })
                }
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        // Closing the handle also releases the lock; unlock explicitly so it
        // happens before any later reopen in this process.
        let _ = FileExt::unlock(&self.file);
    }
}

// ─────────────────────────────────────────────
// SessionStore
// ─────────────────────────────────────────────

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    sessions: HashMap<String, Session>,
}

#[derive(Serialize)]
struct StoreDocumentRef<'a> {
    sessions: &'a HashMap<String, Session>,
}

/// File-backed persistence for the active session map plus archived snapshots.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
    lock_path: PathBuf,
    archive_dir: PathBuf,
    lock_timeout: Duration,
}

impl SessionStore {
    /// Store at `path`, archiving into `<dir of path>/archived_sessions/`.
    pub fn new(path: impl Into<PathBuf>, lock_timeout: Duration) -> Self {
        let path = path.into();
        let mut lock_name = path.as_os_str().to_os_string();
        lock_name.push(".lock");
        let archive_dir = path
            .parent()
            .map(|p| p.join(ARCHIVE_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from(ARCHIVE_DIR_NAME));

        Self {
            path,
            lock_path: PathBuf::from(lock_name),
            archive_dir,
            lock_timeout,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }

    /// Read the full session map. A missing store is an empty map.
    pub fn load(&self) -> Result<HashMap<String, Session>, StoreError> {
        let _lock = FileLock::acquire(&self.lock_path, self.lock_timeout)?;

        if !self.path.exists() {
            debug!("No session store at {}, starting empty", self.path.display());
            return Ok(HashMap::new());
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(HashMap::new());
        }
        let doc: StoreDocument = serde_json::from_str(&content)?;
        debug!(
            sessions = doc.sessions.len(),
            "Loaded session store from {}",
            self.path.display()
        );
        Ok(doc.sessions)
    }

    /// Rewrite the whole store with `sessions`.
    pub fn save(&self, sessions: &HashMap<String, Session>) -> Result<(), StoreError> {
        let _lock = FileLock::acquire(&self.lock_path, self.lock_timeout)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(&StoreDocumentRef { sessions })?;

        let mut tmp_name = self.path.as_os_str().to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);
        {
            let mut tmp = File::create(&tmp_path)?;
            tmp.write_all(json.as_bytes())?;
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;

        debug!(
            sessions = sessions.len(),
            "Saved session store to {}",
            self.path.display()
        );
        Ok(())
    }

    /// Write an immutable snapshot of `session`. Returns the archive file path.
    ///
    /// Filename: `{sanitized_user_id}_{session_id}_{unix_ts}.json`. An existing
    /// file is never overwritten.
    pub fn archive(&self, session: &Session, now: i64) -> Result<PathBuf, StoreError> {
        fs::create_dir_all(&self.archive_dir)?;

        let file_name = archive_file_name(session, now);
        let path = self.archive_dir.join(file_name);

        let json = serde_json::to_string_pretty(session)?;
        let mut file = OpenOptions::new().write(true).create_new(true).open(&path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;

        info!(
            user_id = %session.user_id,
            session_id = %session.session_id,
            messages = session.messages.len(),
            "archived session to {}",
            path.display()
        );
        Ok(path)
    }
}

/// `{sanitized_user_id}_{session_id}_{unix_ts}.json`
pub fn archive_file_name(session: &Session, now: i64) -> String {
    format!(
        "{}_{}_{}.json",
        utils::sanitize_filename(&session.user_id),
        session.session_id,
        now
    )
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
