//! Session lifecycle: the store that owns the credential pair, the
//! persistence backends behind it, and the route guard in front of it.
//!
//! This module provides:
//! - `SessionStore`: owns the current `Session`, persists every change,
//!   and publishes changes on a watch channel
//! - `SessionBackend` implementations: file, OS keychain, in-memory
//! - `require_session`: the capability check for protected views

pub mod guard;
pub mod session;
pub mod storage;

pub use guard::{require_session, Guarded};
pub use session::{Session, SessionStore};
pub use storage::{FileBackend, KeyringBackend, MemoryBackend, SessionBackend};
