//! HTTP client module for the token-issuing API.
//!
//! This module provides the `ApiClient` for logging in against the
//! external issuer and calling protected resources with transparent
//! bearer-token attachment and single-shot refresh recovery.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
