#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

//! HTTP client wrapper for JSON APIs that speak RFC 9457
//!
//! Every request passes through an ordered decorator pipeline (accept,
//! bearer token, CSRF token) and every failure comes back as an
//! [`ApiError`], never as a raw transport error.

mod client;
pub mod csrf;
pub mod decorator;
pub mod error;
pub mod session;
pub mod token;

pub use client::{ApiClient, ApiClientBuilder};
pub use csrf::{CookieCsrfSource, CsrfSource};
pub use decorator::{AcceptDecorator, BearerDecorator, CsrfDecorator, RequestDecorator};
pub use error::BuildError;
pub use session::{AuthSession, Navigator, SessionHooks};
pub use tether_core::ApiError;
pub use token::{IdentityProviderTokens, MOCK_ACCESS_TOKEN, StaticTokenProvider, TokenProvider};
