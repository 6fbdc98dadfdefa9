//! Authentication module for Google APIs using OAuth authorized-user credentials.
//!
//! The calendar server is deployed with a `GOOGLE_OAUTH_CREDENTIALS` document
//! produced by the installed-app consent flow. This module exchanges its
//! refresh token for short-lived access tokens and caches them.
//!
//! Accepted shapes:
//! - `{"installed": {"client_id": .., "client_secret": .., "refresh_token": ..}}`
//! - the same fields at the top level

use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use crate::error::AuthError;

/// Google's OAuth token endpoint.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens are refreshed this long before they actually expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Authorized-user credentials.
#[derive(Clone, Deserialize)]
pub struct AuthorizedUser {
    /// OAuth client id
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
    /// Long-lived refresh token
    pub refresh_token: String,
    /// Token endpoint, defaults to Google's
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl std::fmt::Debug for AuthorizedUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizedUser")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

#[derive(Deserialize)]
struct CredentialsDocument {
    installed: Option<AuthorizedUser>,
}

impl AuthorizedUser {
    /// Parse a credentials JSON document.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` when required fields are missing.
    pub fn from_json(raw: &str) -> Result<Self, AuthError> {
        let value: serde_json::Value = serde_json::from_str(raw)
            .map_err(|e| AuthError::invalid_credentials(e.to_string()))?;

        if value.get("installed").is_some() {
            let doc: CredentialsDocument = serde_json::from_value(value)
                .map_err(|e| AuthError::invalid_credentials(e.to_string()))?;
            return doc
                .installed
                .ok_or_else(|| AuthError::invalid_credentials("'installed' section is null"));
        }

        serde_json::from_value(value).map_err(|e| AuthError::invalid_credentials(e.to_string()))
    }

    fn token_uri(&self) -> &str {
        self.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + EXPIRY_MARGIN < self.expires_at
    }
}

enum TokenSource {
    /// Refresh-token exchange with an in-memory cache
    RefreshToken {
        http: reqwest::Client,
        credentials: AuthorizedUser,
        cache: RwLock<Option<CachedToken>>,
    },
    /// Fixed access token, e.g. for tests or short local sessions
    Static(String),
}

/// Access-token provider for Google APIs.
pub struct AuthProvider {
    source: TokenSource,
}

impl AuthProvider {
    /// Create a provider from the raw `GOOGLE_OAUTH_CREDENTIALS` value.
    ///
    /// No network call is made until the first `get_token`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotConfigured` for `None` and
    /// `AuthError::InvalidCredentials` for a malformed document.
    #[instrument(level = "debug", name = "auth_provider_new", skip_all)]
    pub fn from_credentials(raw: Option<&str>) -> Result<Self, AuthError> {
        let raw = raw.ok_or(AuthError::NotConfigured)?;
        let credentials = AuthorizedUser::from_json(raw)?;
        debug!(client_id = %credentials.client_id, "AuthProvider initialized");
        Ok(Self::with_client(reqwest::Client::new(), credentials))
    }

    /// Create a provider with an explicit HTTP client.
    pub fn with_client(http: reqwest::Client, credentials: AuthorizedUser) -> Self {
        Self {
            source: TokenSource::RefreshToken {
                http,
                credentials,
                cache: RwLock::new(None),
            },
        }
    }

    /// Create a provider that always returns the given token.
    pub fn static_token(token: impl Into<String>) -> Self {
        Self {
            source: TokenSource::Static(token.into()),
        }
    }

    /// Get a valid access token, refreshing it when it is about to expire.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::RefreshFailed` if the token endpoint rejects the refresh.
    #[instrument(level = "debug", name = "get_token", skip(self))]
    pub async fn get_token(&self) -> Result<String, AuthError> {
        match &self.source {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::RefreshToken {
                http,
                credentials,
                cache,
            } => {
                if let Some(cached) = cache.read().await.as_ref() {
                    if cached.is_fresh() {
                        return Ok(cached.value.clone());
                    }
                }

                let mut guard = cache.write().await;
                // Another caller may have refreshed while we waited for the lock.
                if let Some(cached) = guard.as_ref() {
                    if cached.is_fresh() {
                        return Ok(cached.value.clone());
                    }
                }

                let fresh = refresh(http, credentials).await?;
                let value = fresh.value.clone();
                *guard = Some(fresh);
                Ok(value)
            }
        }
    }
}

async fn refresh(http: &reqwest::Client, credentials: &AuthorizedUser) -> Result<CachedToken, AuthError> {
    let token_uri = credentials.token_uri();
    debug!(token_uri = %token_uri, "Refreshing access token");

    let response = http
        .post(token_uri)
        .form(&[
            ("grant_type", "refresh_token"),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("refresh_token", credentials.refresh_token.as_str()),
        ])
        .send()
        .await
        .map_err(|e| AuthError::refresh_failed(format!("Request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), "Token refresh rejected");
        return Err(AuthError::refresh_failed(format!("HTTP {}: {}", status.as_u16(), body)));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| AuthError::refresh_failed(format!("Failed to parse token response: {}", e)))?;

    debug!(expires_in = token.expires_in, "Access token obtained");
    let now = Instant::now();
    let expires_at = now
        .checked_add(Duration::from_secs(token.expires_in))
        .unwrap_or(now + Duration::from_secs(default_expires_in()));
    Ok(CachedToken {
        value: token.access_token,
        expires_at,
    })
}
