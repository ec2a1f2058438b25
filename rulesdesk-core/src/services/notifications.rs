//! Notification queue - ephemeral user-facing messages
//!
//! Newest first. SUCCESS and ERROR notifications expire after
//! [`AUTO_DISMISS_SECS`](crate::domain::AUTO_DISMISS_SECS). There are no timers: expired
//! entries go on the next insert or through [`NotificationQueue::prune_expired`].

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::domain::{Notification, NotificationType};
use crate::ports::NotificationSink;

/// In-memory notification queue
#[derive(Debug, Default)]
pub struct NotificationQueue {
    items: Mutex<Vec<Notification>>,
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all notifications, newest first
    pub fn all(&self) -> Vec<Notification> {
        self.items.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn unread(&self) -> Vec<Notification> {
        self.items.lock().iter().filter(|n| !n.read).cloned().collect()
    }

    pub fn unread_count(&self) -> usize {
        self.items.lock().iter().filter(|n| !n.read).count()
    }

    pub fn by_type(&self, kind: NotificationType) -> Vec<Notification> {
        self.items
            .lock()
            .iter()
            .filter(|n| n.kind == kind)
            .cloned()
            .collect()
    }

    /// Returns false when no notification has this id
    pub fn mark_as_read(&self, id: Uuid) -> bool {
        let mut items = self.items.lock();
        match items.iter_mut().find(|n| n.id == id) {
            Some(n) => {
                n.read = true;
                true
            }
            None => false,
        }
    }

    pub fn mark_all_as_read(&self) {
        for n in self.items.lock().iter_mut() {
            n.read = true;
        }
    }

    /// Remove one notification; unknown ids are ignored
    pub fn dismiss(&self, id: Uuid) {
        self.items.lock().retain(|n| n.id != id);
    }

    pub fn clear(&self) {
        self.items.lock().clear();
    }

    /// Drop auto-dismissing notifications older than the dismiss window
    ///
    /// Returns how many were removed.
    pub fn prune_expired(&self, now: DateTime<Utc>) -> usize {
        let mut items = self.items.lock();
        let before = items.len();
        items.retain(|n| !n.is_expired(now));
        before - items.len()
    }

    /// Take every notification, oldest first, leaving the queue empty
    pub fn drain(&self) -> Vec<Notification> {
        let mut drained: Vec<Notification> = self.items.lock().drain(..).collect();
        drained.reverse();
        drained
    }
}

impl NotificationSink for NotificationQueue {
    /// Expired entries are dropped on every insert, so the queue stays
    /// bounded even when nobody prunes or drains it.
    fn notify(&self, notification: Notification) {
        let mut items = self.items.lock();
        let now = notification.created_at;
        items.retain(|n| !n.is_expired(now));
        items.insert(0, notification);
    }
}
