//! Routes decoded push frames to their single handler.
//!
//! The dispatcher itself is stateless; it only holds handles to the stores
//! it writes. A frame that fails to decode is logged and skipped and never
//! tears down the connection.

use std::sync::Arc;

use shared::models::PushNotification;
use tracing::{debug, warn};

use crate::{connection::ConnectionLink, notify::Notifier, unread::UnreadStore};

/// Parses raw frame payloads and invokes exactly one handler per frame.
pub struct EventDispatcher {
    unread: Arc<UnreadStore>,
    notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher").finish_non_exhaustive()
    }
}

impl EventDispatcher {
    #[must_use]
    pub fn new(unread: Arc<UnreadStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { unread, notifier }
    }

    /// Decodes one frame payload and routes it. Malformed frames and
    /// unknown discriminants are dropped with a log line; they affect
    /// neither the stores nor the connection state.
    pub fn dispatch_raw(&self, data: &str, link: &ConnectionLink) {
        match serde_json::from_str::<PushNotification>(data) {
            Ok(frame) => self.dispatch(frame, link),
            Err(error) => warn!(%error, "dropping undecodable push frame"),
        }
    }

    /// Routes a decoded frame to its handler. Exhaustive: adding a frame
    /// kind is a compile-time-checked change.
    pub fn dispatch(&self, frame: PushNotification, link: &ConnectionLink) {
        match frame {
            PushNotification::Connected => {
                debug!("push channel acknowledged");
                link.mark_connected();
            }
            PushNotification::Heartbeat => {
                // Keep-alive only.
            }
            PushNotification::NewMessage {
                conversation_id,
                counterparty_name,
                preview,
                unread_count,
            } => {
                self.unread.set(conversation_id, unread_count);
                self.notifier
                    .notify(&counterparty_name, &preview, conversation_id);
            }
            PushNotification::MarkedRead { conversation_id } => {
                self.unread.set(conversation_id, 0);
            }
            PushNotification::UnreadSync { conversation_ids } => {
                self.unread.merge_unread_markers(&conversation_ids);
            }
        }
    }
}
