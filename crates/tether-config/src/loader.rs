use std::path::Path;

use secrecy::ExposeSecret;

use crate::{Config, EnvConfig};

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, environment variable
    /// expansion fails, or TOML parsing fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::parse(&raw)
    }

    /// Parse configuration from TOML text, expanding placeholders first
    ///
    /// # Errors
    ///
    /// Returns an error if expansion or TOML parsing fails
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))
    }

    /// Load the file named by `env`, if any, and validate it against `env`
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails or the result is inconsistent
    pub fn for_env(env: &EnvConfig) -> anyhow::Result<Self> {
        let config = match env.config_path.as_deref() {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };

        config.validate(env)?;

        tracing::debug!(
            config_path = ?env.config_path,
            production = env.is_production(),
            "configuration loaded"
        );

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error describing the first inconsistency found
    pub fn validate(&self, env: &EnvConfig) -> anyhow::Result<()> {
        self.validate_csrf_config()?;
        self.validate_identity_config(env)?;
        self.validate_session_config()?;
        self.validate_query_config()?;
        Ok(())
    }

    fn validate_csrf_config(&self) -> anyhow::Result<()> {
        if !self.csrf.enabled {
            return Ok(());
        }

        if !is_token(&self.csrf.header_name) {
            anyhow::bail!("csrf.header_name '{}' is not a valid header name", self.csrf.header_name);
        }

        if !is_token(&self.csrf.cookie_name) {
            anyhow::bail!("csrf.cookie_name '{}' is not a valid cookie name", self.csrf.cookie_name);
        }

        Ok(())
    }

    /// Production without mocking fetches real tokens and needs an identity provider
    fn validate_identity_config(&self, env: &EnvConfig) -> anyhow::Result<()> {
        let Some(ref identity) = self.identity else {
            if env.uses_mock_tokens() {
                return Ok(());
            }
            anyhow::bail!("identity must be configured in production unless API mocking is enabled");
        };

        if identity.client_id.is_empty() {
            anyhow::bail!("identity.client_id must not be empty");
        }

        if identity.client_secret.expose_secret().is_empty() {
            anyhow::bail!("identity.client_secret must not be empty");
        }

        Ok(())
    }

    fn validate_session_config(&self) -> anyhow::Result<()> {
        if !self.session.login_route.starts_with('/') {
            anyhow::bail!("session.login_route must start with '/'");
        }

        Ok(())
    }

    fn validate_query_config(&self) -> anyhow::Result<()> {
        if self.query.retry_base_delay > self.query.retry_max_delay {
            anyhow::bail!("query.retry_base_delay must not exceed query.retry_max_delay");
        }

        Ok(())
    }
}

/// RFC 7230 token characters, shared by header and cookie names
fn is_token(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b))
}
