//! OAuth2 token acquisition for the mail provider.
//!
//! One exchange per orchestrator run: the run trades its long-lived
//! refresh credential for a short-lived access token and reuses that token
//! for every recipient in the batch. Tokens are never persisted or shared
//! across runs.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::config::MailerConfig;
use crate::errors::AuthError;

/// Default Google OAuth2 token endpoint.
pub const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Short-lived access token owned by a single delivery run.
#[derive(Clone)]
pub struct AccessToken {
    /// The bearer token string.
    pub token: SecretString,
    /// Token type reported by the provider, normally `Bearer`.
    pub token_type: String,
}

impl AccessToken {
    /// Creates a token from its parts.
    pub fn new(token: impl Into<String>, token_type: impl Into<String>) -> Self {
        AccessToken {
            token: SecretString::new(token.into()),
            token_type: token_type.into(),
        }
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Token acquisition seam.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Exchanges the configured refresh credential for an access token.
    async fn exchange(&self, config: &MailerConfig) -> Result<AccessToken, AuthError>;
}

/// Refresh-token exchange against the Google OAuth2 token endpoint.
pub struct OAuth2TokenProvider {
    token_url: String,
    http: reqwest::Client,
}

impl OAuth2TokenProvider {
    /// Creates a provider against the default token endpoint.
    pub fn new() -> Self {
        OAuth2TokenProvider {
            token_url: TOKEN_URL.to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Overrides the token endpoint, for tests or a proxy.
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }
}

impl Default for OAuth2TokenProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    token_type: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[async_trait]
impl TokenProvider for OAuth2TokenProvider {
    async fn exchange(&self, config: &MailerConfig) -> Result<AccessToken, AuthError> {
        let params = [
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.expose_secret().as_str()),
            ("refresh_token", config.refresh_token.expose_secret().as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let payload: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;

        // A non-success status and a success body without a token are the
        // same failure: surface the provider's stated reason when present.
        match payload.access_token {
            Some(token) if status.is_success() => Ok(AccessToken::new(
                token,
                payload.token_type.unwrap_or_else(|| "Bearer".to_string()),
            )),
            _ => {
                let reason = payload
                    .error_description
                    .or(payload.error)
                    .unwrap_or_else(|| "Failed to fetch access token.".to_string());
                Err(AuthError::ExchangeRejected(reason))
            }
        }
    }
}
