// User notifications (toasts). Rendering lives elsewhere; this is the trigger side.

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub description: String,
}

// Fire-and-forget
pub trait Notifier: Send + Sync + 'static {
    fn notify(&self, kind: NotificationKind, title: &str, description: &str);
}

// Writes notifications to the log
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, kind: NotificationKind, title: &str, description: &str) {
        match kind {
            NotificationKind::Success => info!(title, description, "notification"),
            NotificationKind::Error => warn!(title, description, "notification"),
        }
    }
}

// Keeps every notification so a UI layer can drain them
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }

    pub fn last(&self) -> Option<Notification> {
        self.sent.lock().last().cloned()
    }

    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.sent.lock())
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, kind: NotificationKind, title: &str, description: &str) {
        self.sent.lock().push(Notification {
            kind,
            title: title.to_string(),
            description: description.to_string(),
        });
    }
}
