use serde::Deserialize;

/// CSRF token forwarding configuration
///
/// The token is read from `cookie_name` in the client's cookie store and
/// sent back under `header_name`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CsrfConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_header_name")]
    pub header_name: String,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            header_name: default_header_name(),
            cookie_name: default_cookie_name(),
        }
    }
}

#[allow(clippy::missing_const_for_fn)]
fn default_enabled() -> bool {
    true
}

fn default_header_name() -> String {
    "X-XSRF-TOKEN".to_string()
}

fn default_cookie_name() -> String {
    "XSRF-TOKEN".to_string()
}
