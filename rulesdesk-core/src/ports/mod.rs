//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. Stores depend
//! only on these traits, not on the HTTP adapters.

mod auth_api;
mod notification_sink;
mod rules_api;

pub use auth_api::AuthApi;
pub use notification_sink::NotificationSink;
pub use rules_api::RulesApi;
