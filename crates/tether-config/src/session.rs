use serde::Deserialize;

/// Interactive session behaviour on authentication failure
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Route the user is sent to after a 401
    #[serde(default = "default_login_route")]
    pub login_route: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            login_route: default_login_route(),
        }
    }
}

fn default_login_route() -> String {
    "/login".to_string()
}
