//! Persistence backends for the session store.
//!
//! A backend only moves a serialized `Session` in and out of durable
//! storage; all lifecycle rules live in `SessionStore`. Three backends are
//! provided: a JSON file in a cache directory, the OS keychain, and a
//! volatile in-memory slot for tests and ephemeral sessions.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use keyring::Entry;

use super::session::Session;

/// Session file name inside the backend directory
const SESSION_FILE: &str = "session.json";

pub trait SessionBackend: Send + Sync {
    /// Read the persisted session, if any.
    fn load(&self) -> Result<Option<Session>>;

    /// Persist the session, replacing any prior value.
    fn store(&self, session: &Session) -> Result<()>;

    /// Remove the persisted session; must succeed when nothing is stored.
    fn clear(&self) -> Result<()>;
}

/// Stores the session as pretty-printed JSON under a directory.
///
/// Other processes pointed at the same directory see writes on their next
/// `load` (last writer wins; no ordering guarantee between processes).
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn session_path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }
}

impl SessionBackend for FileBackend {
    fn load(&self) -> Result<Option<Session>> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)
            .context("Failed to read session file")?;
        let session: Session = serde_json::from_str(&contents)
            .context("Failed to parse session file")?;
        Ok(Some(session))
    }

    fn store(&self, session: &Session) -> Result<()> {
        let path = self.session_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(session)?;
        std::fs::write(path, contents).context("Failed to write session file")?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(path).context("Failed to remove session file")?;
        }
        Ok(())
    }
}

/// Stores the serialized session in the OS keychain.
///
/// Preferred when the refresh credential should not sit in a plaintext
/// file; the keychain entry holds the whole session as one secret.
pub struct KeyringBackend {
    service: String,
    account: String,
}

impl KeyringBackend {
    pub fn new(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            account: account.into(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(&self.service, &self.account).context("Failed to create keyring entry")
    }
}

impl SessionBackend for KeyringBackend {
    fn load(&self) -> Result<Option<Session>> {
        match self.entry()?.get_password() {
            Ok(raw) => {
                let session = serde_json::from_str(&raw)
                    .context("Failed to parse session from keychain")?;
                Ok(Some(session))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to read session from keychain"),
        }
    }

    fn store(&self, session: &Session) -> Result<()> {
        let raw = serde_json::to_string(session)?;
        self.entry()?
            .set_password(&raw)
            .context("Failed to store session in keychain")?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete session from keychain"),
        }
    }
}

/// Volatile backend; the session lives only as long as the process.
#[derive(Default)]
pub struct MemoryBackend {
    slot: Mutex<Option<Session>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionBackend for MemoryBackend {
    fn load(&self) -> Result<Option<Session>> {
        Ok(self.slot.lock().unwrap().clone())
    }

    fn store(&self, session: &Session) -> Result<()> {
        *self.slot.lock().unwrap() = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.slot.lock().unwrap() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_backend_round_trip() {
        let backend = MemoryBackend::new();
        assert!(backend.load().unwrap().is_none());

        backend.store(&Session::new("A1", "R1")).unwrap();
        let loaded = backend.load().unwrap().unwrap();
        assert_eq!(loaded.access_token, "A1");
        assert_eq!(loaded.refresh_token, "R1");

        backend.clear().unwrap();
        assert!(backend.load().unwrap().is_none());
    }

    #[test]
    fn file_backend_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path().to_path_buf());

        assert!(backend.load().unwrap().is_none());

        backend.store(&Session::new("A1", "R1")).unwrap();
        assert!(dir.path().join(SESSION_FILE).exists());

        let loaded = backend.load().unwrap().unwrap();
        assert_eq!(loaded.access_token, "A1");
        assert_eq!(loaded.refresh_token, "R1");
    }

    #[test]
    fn file_backend_clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path().to_path_buf());

        // Nothing stored yet
        backend.clear().unwrap();

        backend.store(&Session::new("A1", "R1")).unwrap();
        backend.clear().unwrap();
        assert!(backend.load().unwrap().is_none());

        // And again with nothing left behind
        backend.clear().unwrap();
    }

    #[test]
    fn file_backend_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SESSION_FILE), "not json").unwrap();

        let backend = FileBackend::new(dir.path().to_path_buf());
        assert!(backend.load().is_err());
    }
}
