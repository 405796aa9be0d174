#![allow(clippy::must_use_candidate)]

pub mod csrf;
mod env;
pub mod environment;
pub mod identity;
mod loader;
pub mod query;
pub mod session;
pub mod telemetry;

use serde::Deserialize;

pub use csrf::*;
pub use environment::{ConfigError, EnvConfig, Environment, InvalidField};
pub use identity::*;
pub use query::*;
pub use session::*;
pub use telemetry::{LogFormat, TelemetryConfig};

/// Settings that do not come from individual environment variables
///
/// Loaded from the optional TOML file named by `TETHER_CONFIG`; every
/// section falls back to its defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// CSRF token forwarding
    #[serde(default)]
    pub csrf: CsrfConfig,
    /// Identity provider for production access tokens
    #[serde(default)]
    pub identity: Option<IdentityConfig>,
    /// Behaviour on authentication failure
    #[serde(default)]
    pub session: SessionConfig,
    /// Query and mutation defaults
    #[serde(default)]
    pub query: QueryConfig,
    /// Logging
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}
