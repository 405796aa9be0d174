/// Errors raised while assembling an `ApiClient`
///
/// Request failures never use this type; they are always
/// [`tether_core::ApiError`].
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The underlying HTTP client could not be created
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),
}
