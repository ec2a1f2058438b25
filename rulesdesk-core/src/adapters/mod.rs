//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - Shared reqwest transport (token, envelope, error mapping)
//! - Rules management HTTP client for RulesApi
//! - Auth HTTP client for AuthApi

mod auth_http;
pub mod http;
mod rules_http;

pub use auth_http::HttpAuthApi;
pub use http::{HttpTransport, TokenHandle};
pub use rules_http::HttpRulesApi;

#[cfg(test)]
pub mod rules_mock;
