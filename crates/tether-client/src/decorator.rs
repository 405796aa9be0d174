use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Request;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderName, HeaderValue};
use secrecy::ExposeSecret;
use tether_core::{ACCEPT_PROBLEM_OR_JSON, ApiError};

use crate::csrf::CsrfSource;
use crate::error::BuildError;
use crate::token::TokenProvider;

/// One step of the outgoing request pipeline
///
/// Decorators run in registration order just before the request is sent.
/// Returning an error aborts the request and surfaces the error to the
/// caller like any other failure.
#[async_trait]
pub trait RequestDecorator: Send + Sync {
    async fn decorate(&self, request: &mut Request) -> Result<(), ApiError>;
}

/// Asks for a problem document or plain JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptDecorator;

#[async_trait]
impl RequestDecorator for AcceptDecorator {
    async fn decorate(&self, request: &mut Request) -> Result<(), ApiError> {
        request
            .headers_mut()
            .insert(ACCEPT, HeaderValue::from_static(ACCEPT_PROBLEM_OR_JSON));
        Ok(())
    }
}

/// Attaches `Authorization: Bearer <token>` when a token is available
pub struct BearerDecorator {
    tokens: Arc<dyn TokenProvider>,
}

impl BearerDecorator {
    pub fn new(tokens: Arc<dyn TokenProvider>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl RequestDecorator for BearerDecorator {
    async fn decorate(&self, request: &mut Request) -> Result<(), ApiError> {
        let Some(token) = self.tokens.access_token().await else {
            return Ok(());
        };

        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
            .map_err(ApiError::from_transport)?;
        value.set_sensitive(true);

        request.headers_mut().insert(AUTHORIZATION, value);
        Ok(())
    }
}

/// Copies the CSRF token into a request header when one is available
pub struct CsrfDecorator {
    header: HeaderName,
    source: Arc<dyn CsrfSource>,
}

impl CsrfDecorator {
    pub fn new(header_name: &str, source: Arc<dyn CsrfSource>) -> Result<Self, BuildError> {
        let header = HeaderName::from_bytes(header_name.as_bytes())
            .map_err(|e| BuildError::Config(format!("invalid CSRF header name '{header_name}': {e}")))?;

        Ok(Self { header, source })
    }
}

#[async_trait]
impl RequestDecorator for CsrfDecorator {
    async fn decorate(&self, request: &mut Request) -> Result<(), ApiError> {
        let Some(token) = self.source.csrf_token() else {
            return Ok(());
        };

        let value = HeaderValue::from_str(&token).map_err(ApiError::from_transport)?;
        request.headers_mut().insert(self.header.clone(), value);
        Ok(())
    }
}

impl std::fmt::Debug for BearerDecorator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerDecorator").finish_non_exhaustive()
    }
}

impl std::fmt::Debug for CsrfDecorator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsrfDecorator")
            .field("header", &self.header)
            .finish_non_exhaustive()
    }
}
