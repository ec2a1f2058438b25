//! Service layer - stateful stores over the ports
//!
//! Stores own the client-side state a front end renders from. They are
//! driven through named actions and expose snapshots, never their fields.

mod notifications;
mod rules;
mod session;

pub use notifications::NotificationQueue;
pub use rules::{RuleStore, DEFAULT_PAGE_SIZE};
pub use session::{SessionStore, NO_USER_MESSAGE};
