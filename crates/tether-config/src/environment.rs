use std::fmt;
use std::path::PathBuf;

use url::Url;

pub const API_URL: &str = "TETHER_API_URL";
pub const ENABLE_API_MOCKING: &str = "TETHER_ENABLE_API_MOCKING";
pub const APP_URL: &str = "TETHER_APP_URL";
pub const MOCK_API_PORT: &str = "TETHER_MOCK_API_PORT";
pub const ENVIRONMENT: &str = "TETHER_ENV";
pub const CONFIG_PATH: &str = "TETHER_CONFIG";

const DEFAULT_APP_URL: &str = "http://localhost:3000";
const DEFAULT_MOCK_API_PORT: u16 = 8080;

/// Deployment environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

/// Process configuration read from the environment once at startup
///
/// Constructed explicitly and handed to whatever needs it; nothing in the
/// workspace re-reads the environment afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    /// Base URL for every API request
    pub api_url: Url,
    /// Whether the mock API is in use
    pub enable_api_mocking: bool,
    /// Public URL of the application itself
    pub app_url: Url,
    /// Port the mock API listens on
    pub mock_api_port: u16,
    pub environment: Environment,
    /// Optional TOML file with the remaining settings
    pub config_path: Option<PathBuf>,
}

/// One environment variable that failed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidField {
    pub name: &'static str,
    pub reason: String,
}

impl fmt::Display for InvalidField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.reason)
    }
}

/// Startup configuration failure
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Every invalid variable, not just the first one found
    #[error("invalid environment variables: {}", join_fields(.0))]
    Invalid(Vec<InvalidField>),
}

impl ConfigError {
    /// Names of all offending variables
    pub fn field_names(&self) -> Vec<&'static str> {
        match self {
            Self::Invalid(fields) => fields.iter().map(|f| f.name).collect(),
        }
    }
}

fn join_fields(fields: &[InvalidField]) -> String {
    fields.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

impl EnvConfig {
    /// Read and validate the process environment
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` listing every missing or malformed variable
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Validate configuration from an arbitrary key lookup
    ///
    /// Empty values are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` listing every missing or malformed variable
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut invalid = Vec::new();

        let api_url = match get(API_URL) {
            Some(raw) => record(&mut invalid, API_URL, parse_http_url(&raw)),
            None => {
                invalid.push(InvalidField {
                    name: API_URL,
                    reason: "is required".to_owned(),
                });
                None
            }
        };

        let enable_api_mocking = get(ENABLE_API_MOCKING)
            .map_or(Some(false), |raw| record(&mut invalid, ENABLE_API_MOCKING, parse_bool(&raw)));

        let app_url = get(APP_URL).map_or_else(
            || Url::parse(DEFAULT_APP_URL).ok(),
            |raw| record(&mut invalid, APP_URL, parse_http_url(&raw)),
        );

        let mock_api_port = get(MOCK_API_PORT).map_or(Some(DEFAULT_MOCK_API_PORT), |raw| {
            record(&mut invalid, MOCK_API_PORT, parse_port(&raw))
        });

        let environment = get(ENVIRONMENT).map_or(Some(Environment::default()), |raw| {
            record(&mut invalid, ENVIRONMENT, parse_environment(&raw))
        });

        let config_path = get(CONFIG_PATH).map(PathBuf::from);

        match (api_url, enable_api_mocking, app_url, mock_api_port, environment) {
            (Some(api_url), Some(enable_api_mocking), Some(app_url), Some(mock_api_port), Some(environment))
                if invalid.is_empty() =>
            {
                Ok(Self {
                    api_url,
                    enable_api_mocking,
                    app_url,
                    mock_api_port,
                    environment,
                    config_path,
                })
            }
            _ => Err(ConfigError::Invalid(invalid)),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Whether requests should carry the static development token
    pub fn uses_mock_tokens(&self) -> bool {
        self.enable_api_mocking || !self.is_production()
    }
}

fn record<T>(invalid: &mut Vec<InvalidField>, name: &'static str, parsed: Result<T, String>) -> Option<T> {
    match parsed {
        Ok(value) => Some(value),
        Err(reason) => {
            invalid.push(InvalidField { name, reason });
            None
        }
    }
}

fn parse_http_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw.trim()).map_err(|e| format!("must be a valid URL ({e})"))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("must use http or https, got '{other}'")),
    }
}

fn parse_bool(raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(format!("must be 'true' or 'false', got '{raw}'")),
    }
}

fn parse_port(raw: &str) -> Result<u16, String> {
    match raw.trim().parse::<u16>() {
        Ok(0) | Err(_) => Err(format!("must be a port between 1 and 65535, got '{raw}'")),
        Ok(port) => Ok(port),
    }
}

fn parse_environment(raw: &str) -> Result<Environment, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "development" => Ok(Environment::Development),
        "production" => Ok(Environment::Production),
        _ => Err(format!("must be 'development' or 'production', got '{raw}'")),
    }
}
