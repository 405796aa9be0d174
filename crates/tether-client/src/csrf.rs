use std::sync::Arc;

use reqwest::cookie::{CookieStore, Jar};
use url::Url;

/// Where the CSRF token for the next request comes from
pub trait CsrfSource: Send + Sync {
    fn csrf_token(&self) -> Option<String>;
}

/// Reads the CSRF token from a cookie the server set on the shared jar
#[derive(Debug, Clone)]
pub struct CookieCsrfSource {
    jar: Arc<Jar>,
    url: Url,
    cookie_name: String,
}

impl CookieCsrfSource {
    /// `url` selects which cookies are visible, normally the API base URL.
    ///
    /// Only cookies whose `Domain` and `Path` match `url` are found. A CSRF
    /// cookie scoped to a deeper path than `url` (say `Path=/api/admin`
    /// against a base of `/api`) is never read.
    pub fn new(jar: Arc<Jar>, url: Url, cookie_name: impl Into<String>) -> Self {
        Self {
            jar,
            url,
            cookie_name: cookie_name.into(),
        }
    }
}

impl CsrfSource for CookieCsrfSource {
    fn csrf_token(&self) -> Option<String> {
        let header = self.jar.cookies(&self.url)?;
        let header = header.to_str().ok()?;

        find_cookie(header, &self.cookie_name)
    }
}

/// Look up one cookie in a `Cookie` header value
fn find_cookie(header: &str, name: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"').to_owned())
        .filter(|value| !value.is_empty())
}
