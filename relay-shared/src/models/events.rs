use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single frame delivered over the push channel.
///
/// The server tags every frame with a `type` discriminant. Frames with an
/// unknown discriminant fail to deserialize; the dispatcher logs and drops
/// them instead of tearing down the connection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushNotification {
    /// Handshake acknowledgement; the channel is live.
    Connected,

    /// Keep-alive only; prevents the transport from idling out.
    Heartbeat,

    /// A message arrived for a conversation, with the server's new unread
    /// count for it.
    NewMessage {
        conversation_id: Uuid,
        counterparty_name: String,
        preview: String,
        unread_count: i64,
    },

    /// The conversation was marked read elsewhere (another device or a late
    /// server confirmation of a local mark-read).
    MarkedRead { conversation_id: Uuid },

    /// Coarse resync: each listed conversation has at least one unread
    /// message. Exact counts follow via `new_message` frames.
    UnreadSync { conversation_ids: Vec<Uuid> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connected_frame_parses() {
        let frame: PushNotification = serde_json::from_str(r#"{"type":"connected"}"#).unwrap();
        assert_eq!(frame, PushNotification::Connected);
    }

    #[test]
    fn test_heartbeat_frame_parses() {
        let frame: PushNotification = serde_json::from_str(r#"{"type":"heartbeat"}"#).unwrap();
        assert_eq!(frame, PushNotification::Heartbeat);
    }

    #[test]
    fn test_new_message_frame_parses() {
        let id = Uuid::parse_str("f47ac10b-58cc-4372-a567-0e02b2c3d479").unwrap();
        let json = format!(
            r#"{{"type":"new_message","conversation_id":"{id}","counterparty_name":"Ada","preview":"See you at 3","unread_count":4}}"#
        );

        let frame: PushNotification = serde_json::from_str(&json).unwrap();
        assert_eq!(
            frame,
            PushNotification::NewMessage {
                conversation_id: id,
                counterparty_name: "Ada".to_string(),
                preview: "See you at 3".to_string(),
                unread_count: 4,
            }
        );
    }

    #[test]
    fn test_marked_read_frame_parses() {
        let id = Uuid::new_v4();
        let json = format!(r#"{{"type":"marked_read","conversation_id":"{id}"}}"#);

        let frame: PushNotification = serde_json::from_str(&json).unwrap();
        assert_eq!(
            frame,
            PushNotification::MarkedRead {
                conversation_id: id
            }
        );
    }

    #[test]
    fn test_unread_sync_frame_parses() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let json = format!(r#"{{"type":"unread_sync","conversation_ids":["{a}","{b}"]}}"#);

        let frame: PushNotification = serde_json::from_str(&json).unwrap();
        assert_eq!(
            frame,
            PushNotification::UnreadSync {
                conversation_ids: vec![a, b]
            }
        );
    }

    #[test]
    fn test_unknown_discriminant_is_an_error() {
        let result = serde_json::from_str::<PushNotification>(r#"{"type":"presence_update"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_discriminant_is_an_error() {
        let result = serde_json::from_str::<PushNotification>(r#"{"conversation_id":"nope"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_round_trip_preserves_discriminant() {
        let frame = PushNotification::MarkedRead {
            conversation_id: Uuid::new_v4(),
        };
        let serialized = serde_json::to_string(&frame).unwrap();
        assert!(serialized.contains("\"type\":\"marked_read\""));

        let deserialized: PushNotification = serde_json::from_str(&serialized).unwrap();
        assert_eq!(frame, deserialized);
    }
}
