//! The grade tracker as the presentation layer sees it: storage, the session,
//! the loaded record and the autosave debouncer, threaded explicitly.

use chrono::Utc;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use crate::accounts::{Account, AccountDirectory, AccountError};
use crate::autosave::Debouncer;
use crate::config::Settings;
use crate::record::{AcademicRecord, RecordError, Subject, SubjectField};
use crate::session::SessionContext;
use crate::store::Storage;

#[derive(Debug)]
pub enum TrackerError {
    NotLoggedIn,
    Record(RecordError),
    Storage(anyhow::Error),
}

impl TrackerError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotLoggedIn => "not_logged_in",
            Self::Record(e) => e.code(),
            Self::Storage(_) => "storage_failed",
        }
    }
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotLoggedIn => write!(f, "no user is logged in"),
            Self::Record(e) => write!(f, "{e}"),
            Self::Storage(e) => write!(f, "storage failure: {e:#}"),
        }
    }
}

impl std::error::Error for TrackerError {}

impl From<RecordError> for TrackerError {
    fn from(e: RecordError) -> Self {
        Self::Record(e)
    }
}

impl From<anyhow::Error> for TrackerError {
    fn from(e: anyhow::Error) -> Self {
        Self::Storage(e)
    }
}

pub struct Tracker {
    storage: Storage,
    session: SessionContext,
    record: AcademicRecord,
    autosave: Debouncer,
}

impl Tracker {
    /// Resume the mirrored session (if any) and load its record.
    pub fn open(storage: Storage, settings: &Settings) -> Self {
        let session = SessionContext::resume(&storage);
        let record = match session.username() {
            Some(username) => storage.load_record_or_starter(username),
            None => AcademicRecord::starter(),
        };
        Self {
            storage,
            session,
            record,
            autosave: Debouncer::new(settings.autosave_delay()),
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn record(&self) -> &AcademicRecord {
        &self.record
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn accounts(&mut self) -> AccountDirectory<'_> {
        AccountDirectory::new(&mut self.storage)
    }

    pub fn pending_save(&self) -> bool {
        self.autosave.is_pending()
    }

    /// How long until the pending autosave is due, if one is pending.
    pub fn autosave_remaining(&self, now: Instant) -> Option<Duration> {
        self.autosave.remaining(now)
    }

    pub fn register(&mut self, username: &str, password: &str) -> Result<Account, AccountError> {
        self.accounts().register(username, password)
    }

    /// Authenticate, start the session, log the login, and load the user's record.
    pub fn login(&mut self, username: &str, password: &str) -> Result<Account, AccountError> {
        let account = self.accounts().authenticate(username, password)?;
        // Edits pending for a previous session belong to that user.
        self.flush()?;
        let record = self.storage.load_record_or_starter(&account.username);
        self.storage.append_login_log(&account.username, Utc::now())?;
        // Session and record switch together, only once storage has accepted the login.
        self.session.begin(&mut self.storage, account.clone())?;
        self.record = record;
        info!(
            target: "gradebookd",
            username = %account.username,
            role = account.role.as_str(),
            semesters = self.record.semesters().len(),
            "logged in"
        );
        Ok(account)
    }

    /// Save pending edits, end the session, and drop the in-memory record.
    pub fn logout(&mut self) -> anyhow::Result<()> {
        if let Err(e) = self.flush() {
            let msg = format!("{e:#}");
            error!(target: "gradebookd", error = %msg, "save before logout failed");
        }
        let username = self.session.username().map(str::to_string);
        self.session.logout(&mut self.storage)?;
        self.record = AcademicRecord::starter();
        info!(target: "gradebookd", username = ?username, "logged out");
        Ok(())
    }

    fn touch(&mut self) {
        self.autosave.schedule(Instant::now());
    }

    pub fn add_subject(&mut self) {
        self.record.add_subject();
        self.touch();
    }

    pub fn delete_subject(&mut self, index: usize) -> Result<Subject, RecordError> {
        let removed = self.record.delete_subject(index)?;
        self.touch();
        Ok(removed)
    }

    pub fn update_subject(&mut self, index: usize, field: SubjectField) -> Result<(), RecordError> {
        self.record.update_subject(index, field)?;
        self.touch();
        Ok(())
    }

    /// Moving the pointer alone does not schedule a save; the next edit carries it.
    pub fn switch_semester(&mut self, semester: usize) -> Result<(), RecordError> {
        self.record.switch_semester(semester)
    }

    pub fn add_new_semester(&mut self) -> usize {
        let n = self.record.add_new_semester();
        self.touch();
        n
    }

    pub fn clear_current_semester(&mut self) {
        self.record.clear_current_semester();
        self.touch();
    }

    /// Reset to one empty semester and save right away (not debounced).
    pub fn reset_all(&mut self, confirmed: bool) -> Result<(), RecordError> {
        self.record.reset_all(confirmed)?;
        self.autosave.cancel();
        self.persist("reset");
        Ok(())
    }

    /// Forget the stored record for the current user, then reset.
    pub fn clear_saved_data(&mut self, confirmed: bool) -> Result<(), TrackerError> {
        let Some(username) = self.session.username().map(str::to_string) else {
            return Err(TrackerError::NotLoggedIn);
        };
        if !confirmed {
            return Err(RecordError::ConfirmationRequired.into());
        }
        self.storage.remove_record(&username)?;
        info!(target: "gradebookd", %username, "cleared saved marks");
        self.reset_all(true)?;
        Ok(())
    }

    /// Write the record now. `Ok(false)` when nobody is logged in.
    pub fn save_now(&mut self) -> anyhow::Result<bool> {
        self.autosave.cancel();
        let Some(username) = self.session.username() else {
            return Ok(false);
        };
        self.storage.save_record(username, &self.record)?;
        debug!(target: "gradebookd", %username, "saved record");
        Ok(true)
    }

    /// Fire the autosave if its deadline has passed. Returns whether it fired.
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.autosave.take_due(now) {
            return false;
        }
        self.persist("autosave");
        true
    }

    /// Unconditional save ahead of any pending deadline (shutdown path).
    pub fn flush(&mut self) -> anyhow::Result<bool> {
        self.save_now()
    }

    fn persist(&mut self, reason: &'static str) {
        if let Err(e) = self.save_now() {
            let msg = format!("{e:#}");
            error!(target: "gradebookd", reason, error = %msg, "record save failed");
        }
    }
}
