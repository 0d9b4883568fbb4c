//! Accounts, approval state, and login history records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

use crate::store::Storage;

/// The one username that registers as an administrator.
pub const ADMIN_USERNAME: &str = "admin";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Student,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Student => "student",
        }
    }
}

/// Credentials are stored as entered; see DESIGN.md.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub username: String,
    pub password: String,
    pub role: Role,
    pub approved: bool,
}

impl Account {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginLogEntry {
    pub username: String,
    #[serde(rename = "time", alias = "timestamp")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug)]
pub enum AccountError {
    InvalidInput,
    AlreadyExists { username: String },
    InvalidCredentials,
    NotApproved { username: String },
    AdminImmutable { username: String },
    NotFound { index: usize, count: usize },
    Storage(anyhow::Error),
}

impl AccountError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::AlreadyExists { .. } => "already_exists",
            Self::InvalidCredentials => "invalid_credentials",
            Self::NotApproved { .. } => "not_approved",
            Self::AdminImmutable { .. } => "admin_immutable",
            Self::NotFound { .. } => "not_found",
            Self::Storage(_) => "storage_failed",
        }
    }
}

impl fmt::Display for AccountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput => write!(f, "username and password are required"),
            Self::AlreadyExists { username } => write!(f, "user {username} already exists"),
            Self::InvalidCredentials => write!(f, "invalid username or password"),
            Self::NotApproved { username } => {
                write!(f, "account {username} is not approved by admin yet")
            }
            Self::AdminImmutable { username } => {
                write!(f, "admin account {username} cannot be changed")
            }
            Self::NotFound { index, count } => {
                write!(f, "no account at index {index} ({count} accounts)")
            }
            Self::Storage(e) => write!(f, "storage failure: {e:#}"),
        }
    }
}

impl std::error::Error for AccountError {}

impl From<anyhow::Error> for AccountError {
    fn from(e: anyhow::Error) -> Self {
        Self::Storage(e)
    }
}

/// Registration, credential checks and approval toggling over the shared
/// `users` collection. Writes are last-writer-wins.
pub struct AccountDirectory<'a> {
    storage: &'a mut Storage,
}

impl<'a> AccountDirectory<'a> {
    pub fn new(storage: &'a mut Storage) -> Self {
        Self { storage }
    }

    pub fn list(&self) -> Vec<Account> {
        self.storage.load_accounts()
    }

    /// Both fields are trimmed before checks and storage.
    pub fn register(&mut self, username: &str, password: &str) -> Result<Account, AccountError> {
        let username = username.trim();
        let password = password.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AccountError::InvalidInput);
        }

        let mut accounts = self.storage.load_accounts();
        if accounts.iter().any(|a| a.username == username) {
            return Err(AccountError::AlreadyExists {
                username: username.to_string(),
            });
        }

        let role = if username == ADMIN_USERNAME {
            Role::Admin
        } else {
            Role::Student
        };
        let account = Account {
            username: username.to_string(),
            password: password.to_string(),
            role,
            approved: role == Role::Admin,
        };
        accounts.push(account.clone());
        self.storage.save_accounts(&accounts)?;
        info!(target: "gradebookd", username = %account.username, role = role.as_str(), "registered account");
        Ok(account)
    }

    pub fn authenticate(&self, username: &str, password: &str) -> Result<Account, AccountError> {
        let accounts = self.storage.load_accounts();
        let Some(account) = accounts
            .into_iter()
            .find(|a| a.username == username && a.password == password)
        else {
            warn!(target: "gradebookd", %username, "rejected login: bad credentials");
            return Err(AccountError::InvalidCredentials);
        };
        if !account.approved && !account.is_admin() {
            warn!(target: "gradebookd", %username, "rejected login: not approved");
            return Err(AccountError::NotApproved {
                username: account.username,
            });
        }
        Ok(account)
    }

    /// Flip approval for the non-admin account at `index` (position in `list()`).
    pub fn toggle_approval(&mut self, index: usize) -> Result<Account, AccountError> {
        let mut accounts = self.storage.load_accounts();
        let count = accounts.len();
        let Some(account) = accounts.get_mut(index) else {
            return Err(AccountError::NotFound { index, count });
        };
        if account.is_admin() {
            return Err(AccountError::AdminImmutable {
                username: account.username.clone(),
            });
        }
        account.approved = !account.approved;
        let updated = account.clone();
        self.storage.save_accounts(&accounts)?;
        info!(target: "gradebookd", username = %updated.username, approved = updated.approved, "toggled approval");
        Ok(updated)
    }
}
