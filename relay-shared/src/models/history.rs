use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::message::Message;

/// Query parameters for a history page fetch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryPageRequest {
    /// Conversation whose history is being paged.
    pub conversation_id: Uuid,
    /// Page size; fixed for the lifetime of an open conversation view.
    pub limit: i64,
    /// Number of messages already loaded, counted from the newest.
    pub offset: i64,
    /// Whether the server should mark the conversation read as a side effect
    /// of this fetch (used on the first page when opening a view).
    pub mark_read: bool,
}

/// One page of conversation history, newest-first within the page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryPageResponse {
    /// Messages in this page.
    pub messages: Vec<Message>,
    /// Total messages the server knows for the conversation.
    pub total_messages: i64,
    /// Server-side unread count after this fetch was processed.
    pub unread_count: i64,
}
