//! Key-value persistence for records, accounts, login history and the session mirror.
//!
//! Every value is JSON text under a fixed key layout:
//!   `users`              -> [Account]
//!   `currentUser`        -> Account (absent when logged out)
//!   `loginLogs`          -> [LoginLogEntry]
//!   `marks_<username>`   -> { semesters, currentSemester, timestamp }
//!
//! Reads never fail: a missing key, a malformed value or a backend error all
//! degrade to "nothing stored" and are logged. Writes report backend errors.

use anyhow::Context;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
#[cfg(test)]
use std::cell::RefCell;
#[cfg(test)]
use std::collections::HashMap;
use std::path::Path;
#[cfg(test)]
use std::rc::Rc;
use tracing::{debug, warn};

use crate::accounts::{Account, LoginLogEntry};
use crate::db;
use crate::record::{AcademicRecord, Semester};

pub const USERS_KEY: &str = "users";
pub const CURRENT_USER_KEY: &str = "currentUser";
pub const LOGIN_LOGS_KEY: &str = "loginLogs";
const RECORD_KEY_PREFIX: &str = "marks_";

pub fn record_key(username: &str) -> String {
    format!("{RECORD_KEY_PREFIX}{username}")
}

pub trait KeyValueStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()>;
    fn remove(&mut self, key: &str) -> anyhow::Result<()>;
}

#[cfg(test)]
#[derive(Debug, Default)]
struct MemoryInner {
    entries: HashMap<String, String>,
    writes: usize,
}

/// In-process store. Clones share the same entries, so a test can keep a
/// handle after moving the store into a `Storage`.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Rc<RefCell<MemoryInner>>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.inner.borrow().entries.get(key).cloned()
    }

    pub fn put_raw(&self, key: &str, value: &str) {
        self.inner
            .borrow_mut()
            .entries
            .insert(key.to_string(), value.to_string());
    }

    /// Number of `set` calls seen so far.
    pub fn write_count(&self) -> usize {
        self.inner.borrow().writes
    }
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.inner.borrow().entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut inner = self.inner.borrow_mut();
        inner.entries.insert(key.to_string(), value.to_string());
        inner.writes += 1;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        self.inner.borrow_mut().entries.remove(key);
        Ok(())
    }
}

/// A `MemoryStore` whose writes and removals of `broken_key` fail, like a
/// full disk or a locked database would.
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct BrokenKeyStore {
    pub inner: MemoryStore,
    pub broken_key: &'static str,
}

#[cfg(test)]
impl KeyValueStore for BrokenKeyStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        self.inner.get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        if key == self.broken_key {
            anyhow::bail!("disk I/O error writing {key}");
        }
        self.inner.set(key, value)
    }

    fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        if key == self.broken_key {
            anyhow::bail!("disk I/O error removing {key}");
        }
        self.inner.remove(key)
    }
}

/// Workspace-backed store: one `kv` table in the workspace SQLite file.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(workspace: &Path) -> anyhow::Result<Self> {
        Ok(Self {
            conn: db::open_db(workspace)?,
        })
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        db::kv_get(&self.conn, key)
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        db::kv_set(&self.conn, key, value)
    }

    fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        db::kv_remove(&self.conn, key)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRecord {
    #[serde(default)]
    semesters: Vec<Semester>,
    #[serde(default)]
    current_semester: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecordSnapshot<'a> {
    semesters: &'a [Semester],
    current_semester: usize,
    timestamp: DateTime<Utc>,
}

pub struct Storage {
    backend: Box<dyn KeyValueStore>,
}

impl Storage {
    pub fn new<S: KeyValueStore + 'static>(backend: S) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    pub fn open_workspace(workspace: &Path) -> anyhow::Result<Self> {
        Ok(Self::new(SqliteStore::open(workspace)?))
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.backend.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(target: "gradebookd", %key, error = %e, "storage read failed; using default");
                return None;
            }
        };
        match serde_json::from_str::<T>(&raw) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(target: "gradebookd", %key, error = %e, "discarding malformed stored value");
                None
            }
        }
    }

    fn write_json<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> anyhow::Result<()> {
        let text = serde_json::to_string(value)
            .with_context(|| format!("failed to serialize value for {key}"))?;
        self.backend
            .set(key, &text)
            .with_context(|| format!("failed to write {key}"))?;
        debug!(target: "gradebookd", %key, bytes = text.len(), "stored value");
        Ok(())
    }

    /// Stored record for `username`, or `None` when nothing usable is stored.
    pub fn load_record(&self, username: &str) -> Option<AcademicRecord> {
        self.read_json::<StoredRecord>(&record_key(username))
            .map(|r| AcademicRecord::from_parts(r.semesters, r.current_semester))
    }

    /// What a user sees on login: the stored record, else the starter record.
    pub fn load_record_or_starter(&self, username: &str) -> AcademicRecord {
        self.load_record(username)
            .unwrap_or_else(AcademicRecord::starter)
    }

    pub fn save_record(&mut self, username: &str, record: &AcademicRecord) -> anyhow::Result<()> {
        let snapshot = RecordSnapshot {
            semesters: record.semesters(),
            current_semester: record.current_semester(),
            timestamp: Utc::now(),
        };
        self.write_json(&record_key(username), &snapshot)
    }

    pub fn remove_record(&mut self, username: &str) -> anyhow::Result<()> {
        let key = record_key(username);
        self.backend
            .remove(&key)
            .with_context(|| format!("failed to remove {key}"))
    }

    pub fn load_accounts(&self) -> Vec<Account> {
        self.read_json(USERS_KEY).unwrap_or_default()
    }

    pub fn save_accounts(&mut self, accounts: &[Account]) -> anyhow::Result<()> {
        self.write_json(USERS_KEY, accounts)
    }

    pub fn load_login_logs(&self) -> Vec<LoginLogEntry> {
        self.read_json(LOGIN_LOGS_KEY).unwrap_or_default()
    }

    pub fn append_login_log(&mut self, username: &str, at: DateTime<Utc>) -> anyhow::Result<()> {
        let mut logs = self.load_login_logs();
        logs.push(LoginLogEntry {
            username: username.to_string(),
            timestamp: at,
        });
        self.write_json(LOGIN_LOGS_KEY, &logs)
    }

    pub fn load_session(&self) -> Option<Account> {
        self.read_json(CURRENT_USER_KEY)
    }

    pub fn save_session(&mut self, account: &Account) -> anyhow::Result<()> {
        self.write_json(CURRENT_USER_KEY, account)
    }

    pub fn clear_session(&mut self) -> anyhow::Result<()> {
        self.backend
            .remove(CURRENT_USER_KEY)
            .context("failed to clear session")
    }
}
