//! Authenticated HTTP client for a token-issuing API.
//!
//! Every request carries the current access credential as a bearer header
//! when one is present. A 401 triggers at most one transparent
//! refresh-and-retry cycle; when that fails the session is cleared and the
//! caller sees `ApiError::SessionExpired` so it can fall back to a login
//! surface. All other failures pass through untouched.

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::auth::SessionStore;

use super::ApiError;

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Credential exchange endpoint, relative to the base URL
const TOKEN_PATH: &str = "token/";

/// Access-credential refresh endpoint, relative to the base URL
const REFRESH_PATH: &str = "token/refresh/";

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenPairResponse {
    access: String,
    refresh: String,
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
}

/// API client bound to one issuer and one session store.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    store: Arc<SessionStore>,
}

impl ApiClient {
    /// Create a client for `base_url` backed by an injected session store.
    pub fn new(base_url: impl Into<String>, store: Arc<SessionStore>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            store,
        })
    }

    /// The session store this client reads and updates
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Exchange credentials for a session.
    ///
    /// On success both tokens are saved to the store. A 400/401-class
    /// rejection maps to `ApiError::InvalidCredentials` and leaves the
    /// store untouched.
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let url = self.url(TOKEN_PATH);
        let response = self
            .client
            .post(&url)
            .json(&LoginRequest { username, password })
            .send()
            .await
            .map_err(ApiError::Network)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::BAD_REQUEST {
            debug!(%status, "Login rejected by issuer");
            return Err(ApiError::InvalidCredentials.into());
        }

        let response = Self::check_response(response).await?;
        let tokens: TokenPairResponse = response
            .json()
            .await
            .context("Failed to parse token response")?;

        self.store.save(&tokens.access, &tokens.refresh)?;
        info!("Login succeeded");
        Ok(())
    }

    /// Discard the session. Pure client-side token disposal; the issuer is
    /// not contacted.
    pub fn logout(&self) -> Result<()> {
        self.store.clear()?;
        info!("Logged out");
        Ok(())
    }

    /// GET a protected resource and deserialize the JSON body
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        let response = self.send_authorized(|| self.client.get(&url)).await?;
        let response = Self::check_response(response).await?;
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {}", url))
    }

    /// GET a protected resource and return the raw body
    pub async fn get_text(&self, path: &str) -> Result<String> {
        let url = self.url(path);
        let response = self.send_authorized(|| self.client.get(&url)).await?;
        let response = Self::check_response(response).await?;
        response
            .text()
            .await
            .with_context(|| format!("Failed to read response body from {}", url))
    }

    /// POST to a protected resource and deserialize the JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.url(path);
        let response = self
            .send_authorized(|| self.client.post(&url).json(body))
            .await?;
        let response = Self::check_response(response).await?;
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {}", url))
    }

    /// Send with the bearer header attached, recovering from a 401 with at
    /// most one refresh-and-retry cycle.
    ///
    /// The builder closure is invoked once per attempt so the retry picks
    /// up the refreshed access credential.
    async fn send_authorized<F>(&self, build: F) -> Result<reqwest::Response>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let response = self
            .attach_bearer(build())
            .send()
            .await
            .map_err(ApiError::Network)?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let Some(refresh_token) = self.store.refresh_token() else {
            warn!("Unauthorized with no refresh credential, ending session");
            self.store.clear()?;
            return Err(ApiError::SessionExpired.into());
        };

        let access = match self.refresh_access(&refresh_token).await {
            Ok(access) => access,
            Err(err) => {
                warn!(error = %err, "Token refresh failed, ending session");
                self.store.clear()?;
                return Err(ApiError::SessionExpired.into());
            }
        };

        self.store.update_access(&access)?;
        debug!("Access credential refreshed, retrying request");

        let retry = self
            .attach_bearer(build())
            .send()
            .await
            .map_err(ApiError::Network)?;

        if retry.status() == StatusCode::UNAUTHORIZED {
            warn!("Retried request still unauthorized, ending session");
            self.store.clear()?;
            return Err(ApiError::SessionExpired.into());
        }

        Ok(retry)
    }

    fn attach_bearer(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.store.access_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Trade the refresh credential for a new access credential
    async fn refresh_access(&self, refresh_token: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.url(REFRESH_PATH))
            .json(&RefreshRequest {
                refresh: refresh_token,
            })
            .send()
            .await
            .map_err(ApiError::Network)?;

        let response = Self::check_response(response).await?;
        let body: RefreshResponse = response
            .json()
            .await
            .context("Failed to parse token refresh response")?;
        Ok(body.access)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(base_url: &str) -> ApiClient {
        ApiClient::new(base_url, Arc::new(SessionStore::in_memory())).unwrap()
    }

    #[test]
    fn url_joins_paths_cleanly() {
        let client = client_for("https://issuer.example.com/");
        assert_eq!(
            client.url("token/"),
            "https://issuer.example.com/token/"
        );
        assert_eq!(
            client.url("/protected/"),
            "https://issuer.example.com/protected/"
        );

        let no_slash = client_for("https://issuer.example.com");
        assert_eq!(
            no_slash.url("token/refresh/"),
            "https://issuer.example.com/token/refresh/"
        );
    }
}
