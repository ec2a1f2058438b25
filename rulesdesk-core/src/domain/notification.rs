//! User-facing notification entity

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How long success and error notifications stay in the queue
pub const AUTO_DISMISS_SECS: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationType {
    /// Success and error toasts disappear on their own
    pub fn auto_dismisses(&self) -> bool {
        matches!(self, NotificationType::Success | NotificationType::Error)
    }
}

/// A transient message for the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,
}

impl Notification {
    /// Create an unread notification; the message defaults to the title
    pub fn new(kind: NotificationType, title: impl Into<String>, message: Option<String>) -> Self {
        let title = title.into();
        let message = message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| title.clone());
        Self {
            id: Uuid::new_v4(),
            title,
            message,
            kind,
            read: false,
            created_at: Utc::now(),
            action_url: None,
        }
    }

    /// Set the link the front end should offer with this notification
    pub fn with_action_url(mut self, url: impl Into<String>) -> Self {
        self.action_url = Some(url.into());
        self
    }

    /// Whether an auto-dismissing notification has outlived its display time
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.kind.auto_dismisses() && now - self.created_at >= Duration::seconds(AUTO_DISMISS_SECS)
    }
}
