//! User notifications via the system notification center.

use crate::error::ActionError;

pub trait Notifier: Send + Sync {
    /// Deliver a notification, with an optional named alert sound.
    fn send(&self, title: &str, body: &str, sound: Option<&str>) -> Result<(), ActionError>;
}

/// Notifier backed by the OS notification center (notify-rust).
pub struct SystemNotifier;

impl Notifier for SystemNotifier {
    fn send(&self, title: &str, body: &str, sound: Option<&str>) -> Result<(), ActionError> {
        let mut notification = notify_rust::Notification::new();
        notification.summary(title).body(body);
        if let Some(sound) = sound {
            notification.sound_name(sound);
        }
        // An unauthorized sender surfaces here as a delivery error.
        notification.show().map(|_| ()).map_err(|e| {
            log::warn!("notification delivery failed: {e}");
            ActionError::NotificationDenied
        })
    }
}
