//! Session state: the credential pair and the store that owns it.
//!
//! A session is either fully absent (logged out) or holds both the access
//! and the refresh credential; no partial state is representable. The
//! store is the only owner of the session: the API client reads it and
//! triggers updates through the store's methods, never by mutating fields.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

use super::storage::{MemoryBackend, SessionBackend};

/// A logged-in credential pair.
///
/// Tokens are opaque strings; their expiry is enforced by the issuer
/// (nominally 60 minutes for access, 1 day for refresh) and never
/// inspected here. The timestamps are bookkeeping for logs and display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub created_at: DateTime<Utc>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            created_at: Utc::now(),
            refreshed_at: None,
        }
    }

    /// Minutes since login (for display)
    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.created_at).num_minutes().max(0)
    }
}

/// Process-wide holder of the current session.
///
/// Every mutation is written through the persistence backend before the
/// in-memory state changes, then published to `subscribe()`rs on a watch
/// channel so dependent code reacts without polling. Other processes
/// sharing the same backend see changes on their next `load` (last writer
/// wins).
pub struct SessionStore {
    backend: Box<dyn SessionBackend>,
    state: watch::Sender<Option<Session>>,
}

impl SessionStore {
    pub fn new(backend: Box<dyn SessionBackend>) -> Self {
        let (state, _) = watch::channel(None);
        Self { backend, state }
    }

    /// Volatile store with no persistence, for tests and ephemeral use
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryBackend::new()))
    }

    /// Load a previously persisted session. Returns true if one was found.
    pub fn load(&self) -> Result<bool> {
        match self
            .backend
            .load()
            .context("Failed to load persisted session")?
        {
            Some(session) => {
                self.state.send_replace(Some(session));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Replace the session with a fresh credential pair.
    /// Overwrites any prior session unconditionally; tokens are opaque and
    /// not validated here.
    pub fn save(&self, access_token: &str, refresh_token: &str) -> Result<()> {
        let session = Session::new(access_token, refresh_token);
        self.backend
            .store(&session)
            .context("Failed to persist session")?;
        self.state.send_replace(Some(session));
        debug!("Session saved");
        Ok(())
    }

    /// Swap in a new access credential after a refresh, keeping the
    /// refresh credential.
    pub fn update_access(&self, access_token: &str) -> Result<()> {
        let mut session = self.current().context("No active session to update")?;
        session.access_token = access_token.to_string();
        session.refreshed_at = Some(Utc::now());
        self.backend
            .store(&session)
            .context("Failed to persist refreshed session")?;
        self.state.send_replace(Some(session));
        debug!("Access credential updated");
        Ok(())
    }

    /// Drop the session. Safe to call when already logged out.
    pub fn clear(&self) -> Result<()> {
        self.backend
            .clear()
            .context("Failed to clear persisted session")?;
        self.state.send_replace(None);
        debug!("Session cleared");
        Ok(())
    }

    /// Presence check only: an expired-but-present token still counts
    /// until a server call rejects it.
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_some()
    }

    pub fn access_token(&self) -> Option<String> {
        self.state.borrow().as_ref().map(|s| s.access_token.clone())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.state
            .borrow()
            .as_ref()
            .map(|s| s.refresh_token.clone())
    }

    pub fn current(&self) -> Option<Session> {
        self.state.borrow().clone()
    }

    /// Watch feed of session changes; receivers see every save, refresh
    /// and clear.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.state.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::storage::FileBackend;

    #[test]
    fn save_then_clear() {
        let store = SessionStore::in_memory();
        assert!(!store.is_authenticated());

        store.save("A1", "R1").unwrap();
        assert!(store.is_authenticated());
        assert_eq!(store.access_token().as_deref(), Some("A1"));
        assert_eq!(store.refresh_token().as_deref(), Some("R1"));

        store.clear().unwrap();
        assert!(!store.is_authenticated());
        assert!(store.current().is_none());
    }

    #[test]
    fn clear_is_idempotent() {
        let store = SessionStore::in_memory();
        store.clear().unwrap();
        store.clear().unwrap();
        assert!(!store.is_authenticated());
    }

    #[test]
    fn update_access_preserves_refresh_token() {
        let store = SessionStore::in_memory();
        store.save("A1", "R1").unwrap();

        store.update_access("A2").unwrap();
        let session = store.current().unwrap();
        assert_eq!(session.access_token, "A2");
        assert_eq!(session.refresh_token, "R1");
        assert!(session.refreshed_at.is_some());
    }

    #[test]
    fn update_access_without_session_fails() {
        let store = SessionStore::in_memory();
        assert!(store.update_access("A2").is_err());
        assert!(!store.is_authenticated());
    }

    #[test]
    fn save_overwrites_prior_session() {
        let store = SessionStore::in_memory();
        store.save("A1", "R1").unwrap();
        store.save("A2", "R2").unwrap();

        let session = store.current().unwrap();
        assert_eq!(session.access_token, "A2");
        assert_eq!(session.refresh_token, "R2");
    }

    #[test]
    fn load_restores_persisted_session() {
        let dir = tempfile::tempdir().unwrap();

        let store = SessionStore::new(Box::new(FileBackend::new(dir.path().to_path_buf())));
        store.save("A1", "R1").unwrap();

        // A second store over the same directory sees the session
        let other = SessionStore::new(Box::new(FileBackend::new(dir.path().to_path_buf())));
        assert!(!other.is_authenticated());
        assert!(other.load().unwrap());
        assert!(other.is_authenticated());
        assert_eq!(other.access_token().as_deref(), Some("A1"));
    }

    #[test]
    fn load_returns_false_when_nothing_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(Box::new(FileBackend::new(dir.path().to_path_buf())));
        assert!(!store.load().unwrap());
    }

    #[tokio::test]
    async fn subscribers_observe_changes() {
        let store = SessionStore::in_memory();
        let mut rx = store.subscribe();

        store.save("A1", "R1").unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_some());

        store.update_access("A2").unwrap();
        rx.changed().await.unwrap();
        assert_eq!(
            rx.borrow_and_update().as_ref().unwrap().access_token,
            "A2"
        );

        store.clear().unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_none());
    }
}
