//! Wire-level data models shared by the sync engine and its clients.

pub mod errors;
pub mod events;
pub mod history;
pub mod message;
pub mod timestamp;
pub mod unread;

pub use errors::ErrorResponse;
pub use events::PushNotification;
pub use history::{HistoryPageRequest, HistoryPageResponse};
pub use message::{DeliveryState, Message, MessageDirection};
pub use timestamp::Timestamp;
pub use unread::{MarkReadRequest, UnreadSnapshotEntry, UnreadSnapshotResponse};
