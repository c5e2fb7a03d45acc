use uuid::Uuid;

/// Failure taxonomy for the sync engine.
///
/// Transport faults on the push channel never surface here; they are
/// absorbed by the reconnect policy in [`crate::connection`]. These errors
/// cover the request/response paths (snapshot, page fetch, mark-read),
/// where the caller is expected to retry.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The HTTP request itself failed (connect, timeout, body read).
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with an error status.
    #[error("server rejected request ({status}): {message}")]
    Api { status: u16, message: String },

    /// An endpoint URL could not be constructed from the configured base.
    #[error("invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),

    /// The response body did not match the expected schema.
    #[error("failed to decode server payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// No bearer credential is configured for an authenticated call.
    #[error("no API credential configured")]
    MissingCredential,

    /// A paging operation referenced a conversation with no open view.
    #[error("no open history view for conversation {0}")]
    UnknownConversation(Uuid),
}

/// Convenience alias used across the engine.
pub type Result<T> = std::result::Result<T, SyncError>;
