//! Programmatic configuration for integration tests

use std::collections::HashMap;
use std::io::Write;

use tempfile::NamedTempFile;
use tether_config::environment::{API_URL, CONFIG_PATH, ENABLE_API_MOCKING, ENVIRONMENT};
use tether_config::{Config, EnvConfig};

/// Builder for an `EnvConfig` and `Config` pair without touching the
/// process environment
pub struct ConfigBuilder {
    vars: HashMap<&'static str, String>,
    toml: String,
}

impl ConfigBuilder {
    /// Development defaults pointing at `api_url`
    pub fn new(api_url: &str) -> Self {
        Self {
            vars: HashMap::from([(API_URL, api_url.to_owned())]),
            toml: String::new(),
        }
    }

    pub fn var(mut self, name: &'static str, value: &str) -> Self {
        self.vars.insert(name, value.to_owned());
        self
    }

    /// Production with the mock API enabled, so no identity provider is needed
    pub fn production_mocked(self) -> Self {
        self.var(ENVIRONMENT, "production").var(ENABLE_API_MOCKING, "true")
    }

    /// Raw TOML for the optional configuration file
    pub fn toml(mut self, raw: &str) -> Self {
        raw.clone_into(&mut self.toml);
        self
    }

    /// Parse the TOML in memory and validate it
    pub fn build(self) -> anyhow::Result<(EnvConfig, Config)> {
        let env = EnvConfig::from_lookup(|key| self.vars.get(key).cloned())?;
        let config = Config::parse(&self.toml)?;
        config.validate(&env)?;

        Ok((env, config))
    }

    /// Write the TOML to a file named by `TETHER_CONFIG` and load it from there
    ///
    /// The returned file must outlive the test.
    pub fn build_from_file(self) -> anyhow::Result<(EnvConfig, Config, NamedTempFile)> {
        let mut file = NamedTempFile::new()?;
        file.write_all(self.toml.as_bytes())?;

        let path = file.path().to_string_lossy().into_owned();
        let vars = self.var(CONFIG_PATH, &path).vars;

        let env = EnvConfig::from_lookup(|key| vars.get(key).cloned())?;
        let config = Config::for_env(&env)?;

        Ok((env, config, file))
    }
}
