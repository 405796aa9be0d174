#![allow(clippy::must_use_candidate)]

//! Shared error model for Tether
//!
//! Every failed request surfaces as an [`ApiError`] wrapping an RFC 9457
//! [`ProblemDetails`] document, whether the server sent one or not

mod error;
pub mod problem;

pub use error::{ApiError, GENERIC_TITLE, TransportSource};
pub use problem::{ABOUT_BLANK, ACCEPT_PROBLEM_OR_JSON, PROBLEM_JSON, ProblemDetails};
