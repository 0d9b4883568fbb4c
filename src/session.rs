use tracing::info;

use crate::accounts::Account;
use crate::store::Storage;

/// The authenticated account, if any, mirrored under `currentUser` so a
/// restarted sidecar resumes without a new login.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    account: Option<Account>,
}

impl SessionContext {
    pub fn resume(storage: &Storage) -> Self {
        let account = storage.load_session();
        if let Some(a) = &account {
            info!(target: "gradebookd", username = %a.username, "resumed session");
        }
        Self { account }
    }

    pub fn begin(&mut self, storage: &mut Storage, account: Account) -> anyhow::Result<()> {
        storage.save_session(&account)?;
        self.account = Some(account);
        Ok(())
    }

    /// Clear the stored mirror, then the in-memory account. A failed
    /// clear leaves the session as it was.
    pub fn logout(&mut self, storage: &mut Storage) -> anyhow::Result<()> {
        storage.clear_session()?;
        self.account = None;
        Ok(())
    }

    pub fn account(&self) -> Option<&Account> {
        self.account.as_ref()
    }

    pub fn username(&self) -> Option<&str> {
        self.account.as_ref().map(|a| a.username.as_str())
    }

    pub fn is_admin(&self) -> bool {
        self.account.as_ref().is_some_and(Account::is_admin)
    }

    /// Non-admin sessions see their grades but cannot edit them.
    pub fn read_only(&self) -> bool {
        !self.is_admin()
    }
}
