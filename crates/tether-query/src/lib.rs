#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

//! Data-fetching defaults for Tether
//!
//! A small keyed cache with stale-time tracking, plus the retry policy
//! that keeps client errors from being retried.

mod cache;
mod client;
pub mod key;
pub mod policy;

pub use client::QueryClient;
pub use key::QueryKey;
pub use policy::QueryPolicy;
