use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tether_config::{Config, EnvConfig};
use tether_core::{ApiError, TransportSource};
use url::Url;

use crate::csrf::{CookieCsrfSource, CsrfSource};
use crate::decorator::{AcceptDecorator, BearerDecorator, CsrfDecorator, RequestDecorator};
use crate::error::BuildError;
use crate::session::{AuthSession, Navigator, SessionHooks};
use crate::token::{IdentityProviderTokens, StaticTokenProvider, TokenProvider};

const DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
const DEFAULT_LOGIN_ROUTE: &str = "/login";

/// HTTP client for a JSON API reporting failures as Problem Details
///
/// Cheap to clone; clones share the connection pool, the cookie jar and
/// the session latch.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

struct Inner {
    http: reqwest::Client,
    base_url: Url,
    jar: Arc<Jar>,
    decorators: Vec<Arc<dyn RequestDecorator>>,
    session: Option<SessionHooks>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url)
            .field("decorators", &self.inner.decorators.len())
            .field("session", &self.inner.session)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn builder(base_url: Url) -> ApiClientBuilder {
        ApiClientBuilder::new(base_url)
    }

    /// Build a client from startup configuration
    ///
    /// See [`ApiClientBuilder::from_config`] for how the token provider is
    /// chosen.
    pub fn from_config(env: &EnvConfig, config: &Config) -> Result<Self, BuildError> {
        ApiClientBuilder::from_config(env, config)?.build()
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Cookie jar shared by every request and the CSRF cookie reader
    pub fn cookie_jar(&self) -> &Arc<Jar> {
        &self.inner.jar
    }

    pub fn session(&self) -> Option<&SessionHooks> {
        self.inner.session.as_ref()
    }

    /// Re-enable 401 teardown after a fresh login
    pub fn rearm_session(&self) {
        if let Some(session) = &self.inner.session {
            session.rearm();
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request::<(), T>(Method::GET, path, None).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::PUT, path, Some(body)).await
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::PATCH, path, Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request::<(), T>(Method::DELETE, path, None).await
    }

    /// Send a request and decode the JSON response body
    ///
    /// `path` is appended to the base URL's path and may carry a query
    /// string. An empty success body decodes as `null`.
    pub async fn request<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let result = self.send(method.clone(), path, body).await;

        if let Err(error) = &result {
            self.report_failure(&method, path, error);
        }

        result
    }

    async fn send<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let mut builder = self.inner.http.request(method, endpoint(&self.inner.base_url, path));
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let mut request = builder.build().map_err(ApiError::from_transport)?;
        for decorator in &self.inner.decorators {
            decorator.decorate(&mut request).await?;
        }

        let response = self
            .inner
            .http
            .execute(request)
            .await
            .map_err(ApiError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let source = response
                .error_for_status_ref()
                .err()
                .map(|e| Arc::new(e) as TransportSource);
            let body = error_body(response).await;

            return Err(ApiError::from_response(status.as_u16(), &body, source));
        }

        if let Some(session) = &self.inner.session {
            session.on_authorized();
        }

        let body = response.bytes().await.map_err(ApiError::from_transport)?;
        decode_body(status, &body)
    }

    fn report_failure(&self, method: &Method, path: &str, error: &ApiError) {
        if self.inner.session.is_some() {
            tracing::warn!(
                %method,
                path,
                problem_type = error.problem_type(),
                title = error.title(),
                detail = error.detail(),
                status = error.status(),
                instance = error.instance(),
                "api request failed"
            );
        } else {
            tracing::debug!(
                %method,
                path,
                problem_type = error.problem_type(),
                title = error.title(),
                detail = error.detail(),
                status = error.status(),
                instance = error.instance(),
                "api request failed"
            );
        }

        if error.is_status(401)
            && let Some(session) = &self.inner.session
        {
            session.on_unauthorized();
        }
    }
}

/// Body of a failed response, empty when it cannot be read
pub(crate) async fn error_body(response: reqwest::Response) -> Vec<u8> {
    let status = response.status();

    match response.bytes().await {
        Ok(body) => body.to_vec(),
        Err(e) => {
            tracing::debug!(%status, error = %e, "failed to read error response body");
            Vec::new()
        }
    }
}

/// Append `path` to the base URL's path, keeping any query string
fn endpoint(base_url: &Url, path: &str) -> Url {
    let (path, query) = path.split_once('?').map_or((path, None), |(p, q)| (p, Some(q)));

    let mut url = base_url.clone();
    let joined = format!(
        "{}/{}",
        base_url.path().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    url.set_path(&joined);
    url.set_query(query);
    url
}

fn decode_body<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<T, ApiError> {
    let body = if body.iter().all(u8::is_ascii_whitespace) {
        b"null".as_slice()
    } else {
        body
    };

    serde_json::from_slice(body).map_err(|e| ApiError::decode(status.as_u16(), e))
}

/// Configures and creates an [`ApiClient`]
///
/// Decorators run in this order: accept, bearer token, CSRF token, then
/// anything added with [`ApiClientBuilder::decorator`].
pub struct ApiClientBuilder {
    base_url: Url,
    jar: Arc<Jar>,
    tokens: Option<Arc<dyn TokenProvider>>,
    csrf: Option<(String, Arc<dyn CsrfSource>)>,
    session: Option<(Arc<dyn AuthSession>, Arc<dyn Navigator>)>,
    login_route: String,
    decorators: Vec<Arc<dyn RequestDecorator>>,
    timeout: Option<Duration>,
    user_agent: String,
}

impl ApiClientBuilder {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            jar: Arc::new(Jar::default()),
            tokens: None,
            csrf: None,
            session: None,
            login_route: DEFAULT_LOGIN_ROUTE.to_owned(),
            decorators: Vec::new(),
            timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }

    /// Builder preloaded from startup configuration
    ///
    /// The token provider is chosen once here: the static mock token when
    /// the mock API is enabled or the environment is not production,
    /// otherwise client-credentials tokens from `[identity]`.
    pub fn from_config(env: &EnvConfig, config: &Config) -> Result<Self, BuildError> {
        let tokens: Arc<dyn TokenProvider> = if env.uses_mock_tokens() {
            tracing::debug!("using static mock access token");
            Arc::new(StaticTokenProvider::mock())
        } else {
            let identity = config.identity.clone().ok_or_else(|| {
                BuildError::Config("an [identity] section is required in production".to_owned())
            })?;
            tracing::debug!(token_url = %identity.token_url, "using identity provider tokens");
            Arc::new(IdentityProviderTokens::new(identity)?)
        };

        let mut builder = Self::new(env.api_url.clone())
            .token_provider(tokens)
            .login_route(config.session.login_route.clone());

        if config.csrf.enabled {
            builder = builder.csrf_cookie(config.csrf.header_name.clone(), &config.csrf.cookie_name);
        }

        Ok(builder)
    }

    #[must_use]
    pub fn token_provider(mut self, tokens: Arc<dyn TokenProvider>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Send the token from `source` under `header_name`
    #[must_use]
    pub fn csrf(mut self, header_name: impl Into<String>, source: Arc<dyn CsrfSource>) -> Self {
        self.csrf = Some((header_name.into(), source));
        self
    }

    /// Send the value of the `cookie_name` cookie under `header_name`
    #[must_use]
    pub fn csrf_cookie(self, header_name: impl Into<String>, cookie_name: &str) -> Self {
        let source = CookieCsrfSource::new(self.jar.clone(), self.base_url.clone(), cookie_name);
        self.csrf(header_name, Arc::new(source))
    }

    /// Attach an interactive session torn down on `401 Unauthorized`
    #[must_use]
    pub fn session(mut self, auth: Arc<dyn AuthSession>, navigator: Arc<dyn Navigator>) -> Self {
        self.session = Some((auth, navigator));
        self
    }

    #[must_use]
    pub fn login_route(mut self, route: impl Into<String>) -> Self {
        self.login_route = route.into();
        self
    }

    /// Append a decorator after the built-in ones
    #[must_use]
    pub fn decorator(mut self, decorator: Arc<dyn RequestDecorator>) -> Self {
        self.decorators.push(decorator);
        self
    }

    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn build(self) -> Result<ApiClient, BuildError> {
        let mut http = reqwest::Client::builder()
            .cookie_provider(self.jar.clone())
            .user_agent(self.user_agent);
        if let Some(timeout) = self.timeout {
            http = http.timeout(timeout);
        }
        let http = http.build()?;

        let mut decorators: Vec<Arc<dyn RequestDecorator>> = vec![Arc::new(AcceptDecorator)];
        if let Some(tokens) = self.tokens {
            decorators.push(Arc::new(BearerDecorator::new(tokens)));
        }
        if let Some((header_name, source)) = self.csrf {
            decorators.push(Arc::new(CsrfDecorator::new(&header_name, source)?));
        }
        decorators.extend(self.decorators);

        let session = self
            .session
            .map(|(auth, navigator)| SessionHooks::new(auth, navigator, self.login_route));

        Ok(ApiClient {
            inner: Arc::new(Inner {
                http,
                base_url: self.base_url,
                jar: self.jar,
                decorators,
                session,
            }),
        })
    }
}
