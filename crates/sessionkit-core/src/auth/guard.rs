//! Capability check for protected views.
//!
//! The guard is a synchronous predicate over the session store: present
//! session renders the view, absent session redirects to login. It never
//! talks to the server, so an expired-but-present token passes; actual
//! enforcement happens when a request comes back 401.

use super::session::SessionStore;

/// Outcome of guarding a view.
#[derive(Debug)]
pub enum Guarded<T> {
    /// The session was present; the view was rendered.
    Allowed(T),
    /// No session; the caller should present the login surface.
    RedirectToLogin,
}

impl<T> Guarded<T> {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Guarded::Allowed(_))
    }

    pub fn into_inner(self) -> Option<T> {
        match self {
            Guarded::Allowed(value) => Some(value),
            Guarded::RedirectToLogin => None,
        }
    }
}

/// Render `view` only when a session is present.
///
/// `view` runs at most once, and not at all when logged out.
pub fn require_session<T, F>(store: &SessionStore, view: F) -> Guarded<T>
where
    F: FnOnce() -> T,
{
    if store.is_authenticated() {
        Guarded::Allowed(view())
    } else {
        Guarded::RedirectToLogin
    }
}
