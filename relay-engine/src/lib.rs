#![cfg_attr(not(test), forbid(unsafe_code))]

//! Real-time conversation sync engine for RelayCRM clients.
//!
//! The engine keeps a long-lived push channel to the server, reconciles
//! per-conversation unread counters from three producers (bulk snapshot,
//! push frames, local mark-read), and pages conversation history with a
//! stable newest-first ordering. See [`SyncEngine`] for the assembled
//! facade.

pub mod api;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod history;
pub mod notify;
pub mod sse;
pub mod sync;
pub mod unread;

pub use api::{HttpSyncApi, SyncApi};
pub use connection::{ConnectionState, EventStreamConnection};
pub use dispatch::EventDispatcher;
pub use error::SyncError;
pub use history::HistoryPager;
pub use notify::{DesktopNotifier, Notifier, NullNotifier};
pub use sync::SyncEngine;
pub use unread::UnreadStore;
