//! Best-effort desktop alerts for incoming messages.
//!
//! Delivery is fire-and-forget: a missing notification daemon or denied
//! permission degrades silently and never errors the dispatcher.

use tracing::debug;
use uuid::Uuid;

/// Side-effect consumer for message alerts.
pub trait Notifier: Send + Sync {
    /// Shows an alert. `dedup_key` is the conversation id; rapid repeated
    /// pushes for one conversation coalesce into a single visible alert.
    fn notify(&self, title: &str, body: &str, dedup_key: Uuid);
}

/// Desktop notifier backed by the platform notification service.
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopNotifier;

impl DesktopNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Stable 32-bit notification id derived from the dedup key, so a newer
    /// alert for the same conversation replaces the visible one.
    fn replace_id(dedup_key: Uuid) -> u32 {
        let bytes = dedup_key.as_bytes();
        u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, body: &str, dedup_key: Uuid) {
        let mut notification = notify_rust::Notification::new();
        notification
            .summary(title)
            .body(body)
            .id(Self::replace_id(dedup_key));

        // The platform call can block on the session bus; keep it off the
        // async runtime.
        tokio::task::spawn_blocking(move || {
            if let Err(error) = notification.show() {
                debug!(%error, "desktop notification not delivered");
            }
        });
    }
}

/// No-op notifier for headless runs and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl NullNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Notifier for NullNotifier {
    fn notify(&self, title: &str, _body: &str, dedup_key: Uuid) {
        debug!(%dedup_key, %title, "notification suppressed (headless)");
    }
}
