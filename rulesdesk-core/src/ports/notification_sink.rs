//! Notification sink port

use crate::domain::{ApiError, Notification, NotificationType};

/// Receives user-facing messages from stores and the transport
///
/// Implementations must not fail: a notification that cannot be shown
/// is dropped.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);

    fn show_success(&self, title: &str) {
        self.notify(Notification::new(NotificationType::Success, title, None));
    }

    fn show_error(&self, title: &str, message: &str) {
        self.notify(Notification::new(
            NotificationType::Error,
            title,
            Some(message.to_string()),
        ));
    }

    fn show_warning(&self, title: &str, message: &str) {
        self.notify(Notification::new(
            NotificationType::Warning,
            title,
            Some(message.to_string()),
        ));
    }

    fn show_info(&self, title: &str, message: &str) {
        self.notify(Notification::new(
            NotificationType::Info,
            title,
            Some(message.to_string()),
        ));
    }

    /// Emit the category notification for a transport-level failure
    ///
    /// Mirrors the status table: fixed messages for 401/403/404/429/500 and
    /// network failures, the server message for 422 and everything else.
    fn show_api_error(&self, error: &ApiError) {
        let category = error.category();
        let message = category
            .default_message()
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        self.notify(Notification::new(
            category.notification_type(),
            category.title(),
            Some(message),
        ));
    }
}
