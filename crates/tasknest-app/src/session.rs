//! Authentication collaborator and the device-local profile provider.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tasknest_core::id::UserId;
use thiserror::Error;
use tokio::sync::watch;
use tracing::info;

const PROFILES_FILE: &str = "profiles.json";

/// Signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Owner id used to scope every persistence call.
    pub user_id: UserId,
    /// Sign-in email.
    pub email: String,
}

/// Errors raised by authentication providers.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The email is blank or lacks an `@`.
    #[error("invalid email address: {0}")]
    InvalidEmail(String),
    /// No account is registered for the email.
    #[error("no account for {0}")]
    UnknownAccount(String),
    /// An account already exists for the email.
    #[error("an account already exists for {0}")]
    AccountExists(String),
    /// Provider storage failed.
    #[error("auth storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

/// Authentication collaborator. Session changes are broadcast to [`watch`]ers.
///
/// [`watch`]: AuthProvider::watch
#[allow(async_fn_in_trait)]
pub trait AuthProvider {
    /// Session currently signed in, if any.
    fn current_session(&self) -> Option<Session>;

    /// Sign in to an existing account.
    ///
    /// # Errors
    /// Returns [`AuthError`] when the account cannot be resolved.
    async fn sign_in(&self, email: &str) -> Result<Session, AuthError>;

    /// Register a new account and sign in.
    ///
    /// # Errors
    /// Returns [`AuthError`] when the account cannot be created.
    async fn sign_up(&self, email: &str) -> Result<Session, AuthError>;

    /// End the current session.
    ///
    /// # Errors
    /// Returns [`AuthError`] when the provider cannot sign out.
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Subscribe to session changes.
    fn watch(&self) -> watch::Receiver<Option<Session>>;
}

fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_ascii_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(AuthError::InvalidEmail(email));
    }
    Ok(email)
}

/// Profiles kept in `<data-dir>/profiles.json`, keyed by email.
///
/// Local profiles carry no credentials: anyone with access to the data
/// directory can act as any profile.
pub struct LocalAuth {
    path: PathBuf,
    profiles: Mutex<BTreeMap<String, UserId>>,
    sender: watch::Sender<Option<Session>>,
}

impl LocalAuth {
    /// Load the profile registry under `data_dir`.
    ///
    /// # Errors
    /// Returns [`AuthError::Storage`] when the registry cannot be read.
    pub fn open(data_dir: &Path) -> Result<Self, AuthError> {
        let path = data_dir.join(PROFILES_FILE);
        let profiles: BTreeMap<String, UserId> = if path.exists() {
            let raw = fs::read_to_string(&path).map_err(anyhow::Error::from)?;
            serde_json::from_str(&raw).map_err(anyhow::Error::from)?
        } else {
            BTreeMap::new()
        };
        let (sender, _) = watch::channel(None);
        Ok(Self {
            path,
            profiles: Mutex::new(profiles),
            sender,
        })
    }

    fn lookup(&self, email: &str) -> Result<Option<UserId>, AuthError> {
        let profiles = self
            .profiles
            .lock()
            .map_err(|_| anyhow::anyhow!("profile lock poisoned"))?;
        Ok(profiles.get(email).copied())
    }

    fn register(&self, email: &str) -> Result<UserId, AuthError> {
        let mut profiles = self
            .profiles
            .lock()
            .map_err(|_| anyhow::anyhow!("profile lock poisoned"))?;
        if profiles.contains_key(email) {
            return Err(AuthError::AccountExists(email.to_owned()));
        }
        let user_id = UserId::new();
        profiles.insert(email.to_owned(), user_id);
        let body = serde_json::to_string_pretty(&*profiles).map_err(anyhow::Error::from)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(anyhow::Error::from)?;
        }
        fs::write(&self.path, body).map_err(anyhow::Error::from)?;
        Ok(user_id)
    }

    fn publish(&self, session: Option<Session>) {
        self.sender.send_replace(session);
    }
}

impl AuthProvider for LocalAuth {
    fn current_session(&self) -> Option<Session> {
        self.sender.borrow().clone()
    }

    async fn sign_in(&self, email: &str) -> Result<Session, AuthError> {
        let email = normalize_email(email)?;
        let user_id = self
            .lookup(&email)?
            .ok_or_else(|| AuthError::UnknownAccount(email.clone()))?;
        let session = Session { user_id, email };
        info!(user = %session.user_id, "Signed in");
        self.publish(Some(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, email: &str) -> Result<Session, AuthError> {
        let email = normalize_email(email)?;
        let user_id = self.register(&email)?;
        let session = Session { user_id, email };
        info!(user = %session.user_id, "Registered profile");
        self.publish(Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.publish(None);
        Ok(())
    }

    fn watch(&self) -> watch::Receiver<Option<Session>> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn sign_up_then_sign_in_resolves_same_user() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let auth = LocalAuth::open(dir.path())?;
        let created = auth.sign_up("Sam@Example.com").await?;
        auth.sign_out().await?;
        assert!(auth.current_session().is_none());

        let reopened = LocalAuth::open(dir.path())?;
        let session = reopened.sign_in("sam@example.com").await?;
        assert_eq!(session.user_id, created.user_id);
        assert_eq!(reopened.current_session(), Some(session));
        Ok(())
    }

    #[tokio::test]
    async fn sign_in_errors() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let auth = LocalAuth::open(dir.path())?;
        assert!(matches!(auth.sign_in("nobody@example.com").await, Err(AuthError::UnknownAccount(_))));
        assert!(matches!(auth.sign_in("   ").await, Err(AuthError::InvalidEmail(_))));
        auth.sign_up("kim@example.com").await?;
        assert!(matches!(auth.sign_up("kim@example.com").await, Err(AuthError::AccountExists(_))));
        Ok(())
    }

    #[tokio::test]
    async fn watchers_observe_session_changes() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let auth = LocalAuth::open(dir.path())?;
        let mut rx = auth.watch();
        assert!(rx.borrow().is_none());

        auth.sign_up("lee@example.com").await?;
        rx.changed().await?;
        assert_eq!(rx.borrow_and_update().as_ref().map(|s| s.email.as_str()), Some("lee@example.com"));

        auth.sign_out().await?;
        rx.changed().await?;
        assert!(rx.borrow().is_none());
        Ok(())
    }
}
