use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One conversation's unread count in the bulk snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnreadSnapshotEntry {
    /// Conversation the count belongs to.
    pub conversation_id: Uuid,
    /// Server-side unread count at snapshot time. Never negative.
    pub unread_count: i64,
}

/// Response of the bulk unread snapshot fetched once at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnreadSnapshotResponse {
    /// All conversations with a known unread count.
    pub conversations: Vec<UnreadSnapshotEntry>,
}

/// Body of the fire-and-forget mark-read command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MarkReadRequest {
    /// Conversation to mark fully read.
    pub conversation_id: Uuid,
}
