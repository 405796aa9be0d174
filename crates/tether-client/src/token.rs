use std::time::{Duration, Instant};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tether_config::IdentityConfig;
use tether_core::ApiError;
use tokio::sync::Mutex;

use crate::client::error_body;
use crate::error::BuildError;

/// Token handed out in development and when the mock API is enabled
pub const MOCK_ACCESS_TOKEN: &str = "mock-access-token";

/// Lifetime assumed when the identity provider omits `expires_in`, and the
/// cap on any lifetime the clock cannot represent
const DEFAULT_TOKEN_LIFETIME: u64 = 3600;

const TOKEN_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of the bearer token attached to outgoing requests
///
/// `None` means "send the request unauthenticated".
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Option<SecretString>;
}

/// Always returns the same token
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: SecretString,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
        }
    }

    /// Provider for [`MOCK_ACCESS_TOKEN`]
    pub fn mock() -> Self {
        Self::new(MOCK_ACCESS_TOKEN)
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Option<SecretString> {
        Some(self.token.clone())
    }
}

/// OAuth2 client-credentials tokens from the identity provider
///
/// The token is cached until shortly before it expires. Callers racing
/// on an expired token wait on the same lock, so only one refresh is sent.
pub struct IdentityProviderTokens {
    http: reqwest::Client,
    config: IdentityConfig,
    cached: Mutex<Option<CachedToken>>,
}

struct CachedToken {
    token: SecretString,
    refresh_at: Instant,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

impl IdentityProviderTokens {
    pub fn new(config: IdentityConfig) -> Result<Self, BuildError> {
        let http = reqwest::Client::builder().timeout(TOKEN_REQUEST_TIMEOUT).build()?;

        Ok(Self {
            http,
            config,
            cached: Mutex::new(None),
        })
    }

    async fn request_token(&self) -> Result<CachedToken, ApiError> {
        let scope = self.config.scopes.join(" ");

        let mut form = vec![
            ("grant_type", "client_credentials"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.expose_secret()),
        ];
        if !scope.is_empty() {
            form.push(("scope", scope.as_str()));
        }

        let response = self
            .http
            .post(self.config.token_url.clone())
            .form(&form)
            .send()
            .await
            .map_err(ApiError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = error_body(response).await;
            return Err(ApiError::from_response(status.as_u16(), &body, None));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ApiError::decode(status.as_u16(), e))?;

        let lifetime = token
            .expires_in
            .unwrap_or(DEFAULT_TOKEN_LIFETIME)
            .saturating_sub(self.config.expiry_skew_seconds);

        Ok(CachedToken {
            token: SecretString::from(token.access_token),
            refresh_at: refresh_deadline(Instant::now(), lifetime),
        })
    }
}

/// When a token living `lifetime` seconds from `now` must be refreshed
fn refresh_deadline(now: Instant, lifetime: u64) -> Instant {
    now.checked_add(Duration::from_secs(lifetime)).unwrap_or_else(|| {
        tracing::debug!(lifetime, "token lifetime out of range, capping");
        now + Duration::from_secs(DEFAULT_TOKEN_LIFETIME)
    })
}

#[async_trait]
impl TokenProvider for IdentityProviderTokens {
    async fn access_token(&self) -> Option<SecretString> {
        let mut cached = self.cached.lock().await;

        if let Some(entry) = cached.as_ref()
            && entry.refresh_at > Instant::now()
        {
            return Some(entry.token.clone());
        }

        match self.request_token().await {
            Ok(entry) => {
                let token = entry.token.clone();
                *cached = Some(entry);
                Some(token)
            }
            Err(e) => {
                tracing::warn!(
                    token_url = %self.config.token_url,
                    status = e.status(),
                    detail = e.detail(),
                    "failed to acquire access token"
                );
                *cached = None;
                None
            }
        }
    }
}

impl std::fmt::Debug for IdentityProviderTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityProviderTokens")
            .field("token_url", &self.config.token_url)
            .field("client_id", &self.config.client_id)
            .finish_non_exhaustive()
    }
}
