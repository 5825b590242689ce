//! sessionkit - client-side session lifecycle for JWT-authenticated APIs.
//!
//! The library covers token acquisition, durable storage, attachment to
//! outgoing requests, 401-triggered refresh with a single retry, and the
//! failure fallback that ends the session. The issuer itself is an
//! external collaborator reached over HTTP; tokens are opaque here and
//! their expiry is only ever learned from a 401.

pub mod api;
pub mod auth;
pub mod config;

pub use api::{ApiClient, ApiError};
pub use auth::{require_session, Guarded, Session, SessionStore};
pub use config::Config;
