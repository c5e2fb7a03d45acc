use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::timestamp::Timestamp;

/// Direction of a message relative to the CRM user.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageDirection {
    Incoming,
    Outgoing,
}

/// Delivery lifecycle of an outgoing message.
///
/// States only advance forward through `pending → sent → delivered → read`;
/// `failed` is reachable from any non-terminal state. `read` and `failed`
/// are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryState {
    Pending,
    Sent,
    Delivered,
    Read,
    Failed,
}

impl DeliveryState {
    /// Position of the state in the forward-only delivery lattice.
    const fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Sent => 1,
            Self::Delivered => 2,
            Self::Read => 3,
            Self::Failed => 4,
        }
    }

    /// Whether no further transitions are allowed out of this state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Read | Self::Failed)
    }

    /// Whether a transition from `self` to `next` is legal.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        if matches!(next, Self::Failed) {
            return true;
        }
        next.rank() > self.rank()
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Read => "read",
            Self::Failed => "failed",
        }
    }
}

/// A single message inside a conversation thread.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Unique identifier for the message.
    pub id: Uuid,

    /// Conversation the message belongs to.
    pub conversation_id: Uuid,

    /// Whether the message was received from or sent to the counterparty.
    pub direction: MessageDirection,

    /// Text content of the message.
    pub body: String,

    /// Server-side creation time; the sort key for history views.
    pub created_at: Timestamp,

    /// Current delivery state; the only mutable field.
    pub delivery_state: DeliveryState,
}

impl Message {
    /// Applies a delivery-state transition if it is legal.
    ///
    /// Returns `true` when the transition was applied, `false` when it was
    /// rejected as a backward or out-of-lattice move.
    pub fn advance_delivery(&mut self, next: DeliveryState) -> bool {
        if self.delivery_state.can_advance_to(next) {
            self.delivery_state = next;
            true
        } else {
            false
        }
    }
}
