use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Identity provider used to obtain access tokens in production
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityConfig {
    /// OAuth 2.0 token endpoint
    pub token_url: Url,

    /// Registered client identifier
    pub client_id: String,

    /// Client secret for the client-credentials grant
    pub client_secret: SecretString,

    /// Scopes requested with every token
    #[serde(default)]
    pub scopes: Vec<String>,

    /// Refresh this many seconds before the token actually expires
    #[serde(default = "default_expiry_skew")]
    pub expiry_skew_seconds: u64,
}

const fn default_expiry_skew() -> u64 {
    30
}
