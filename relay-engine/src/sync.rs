//! Assembled sync engine: the one object a client embeds.
//!
//! Owns the process-wide unread store and push connection plus the
//! per-conversation history pager, and exposes the narrow read surface the
//! UI needs (badge counts, connection state, ordered message lists).

use std::sync::Arc;

use shared::{config::Config, models::Message};
use tokio::sync::watch;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    api::{HttpSyncApi, SyncApi},
    connection::{ConnectionState, EventStreamConnection},
    dispatch::EventDispatcher,
    error::Result,
    history::HistoryPager,
    notify::{DesktopNotifier, Notifier},
    unread::UnreadStore,
};

/// Single-instance-per-process sync service. Construct once, share by
/// reference; all state is rebuilt from the bulk snapshot and pushes each
/// session, nothing persists on disk.
pub struct SyncEngine {
    api: Arc<dyn SyncApi>,
    unread: Arc<UnreadStore>,
    pager: HistoryPager,
    connection: EventStreamConnection,
    page_size: i64,
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("connection", &self.connection)
            .finish_non_exhaustive()
    }
}

impl SyncEngine {
    /// Builds the engine with the real HTTP API and desktop notifications.
    pub fn new(config: &Config) -> Result<Self> {
        let api = Arc::new(HttpSyncApi::new(config)?);
        Self::with_parts(config, api, Arc::new(DesktopNotifier::new()))
    }

    /// Builds the engine from explicit collaborators. The seam used by
    /// tests and by headless clients that want a different notifier.
    pub fn with_parts(
        config: &Config,
        api: Arc<dyn SyncApi>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let unread = Arc::new(UnreadStore::new());
        let dispatcher = Arc::new(EventDispatcher::new(Arc::clone(&unread), notifier));
        let connection = EventStreamConnection::new(config, dispatcher)?;
        let pager = HistoryPager::new(Arc::clone(&api));
        Ok(Self {
            api,
            unread,
            pager,
            connection,
            page_size: config.page_size.max(1),
        })
    }

    /// Loads the bulk unread snapshot and opens the push channel.
    ///
    /// A failed snapshot is logged and leaves counters at their previous
    /// (possibly default-zero) values; it never blocks the connection.
    pub async fn start(&self) {
        if let Err(error) = self.refresh_unread().await {
            warn!(%error, "bulk unread snapshot failed; keeping previous counters");
        }
        self.connection.connect();
    }

    /// Re-fetches the bulk snapshot and replaces the counter map.
    pub async fn refresh_unread(&self) -> Result<()> {
        let snapshot = self.api.fetch_unread_snapshot().await?;
        self.unread.replace_all(&snapshot);
        Ok(())
    }

    /// Opens a conversation view: fetches the first page (asking the server
    /// to mark the conversation read as a side effect), establishes the
    /// paging cursor, and zeroes the local counter.
    pub async fn open_conversation(&self, conversation_id: Uuid) -> Result<()> {
        let page = self
            .api
            .fetch_history_page(conversation_id, self.page_size, 0, true)
            .await?;
        self.pager.initialize(
            conversation_id,
            page.messages,
            page.total_messages,
            self.page_size,
        );
        self.unread.mark_read(conversation_id);
        Ok(())
    }

    /// Fetches the next older page for an open view. See
    /// [`HistoryPager::load_more`] for the no-op and failure semantics.
    pub async fn load_older(&self, conversation_id: Uuid) -> Result<bool> {
        self.pager.load_more(conversation_id).await
    }

    /// Discards the view state for a closed conversation.
    pub fn close_conversation(&self, conversation_id: Uuid) {
        self.pager.reset(conversation_id);
    }

    /// Local optimistic mark-read: zeroes the counter now and fires the
    /// server command without awaiting it. Reconciliation happens through
    /// idempotent overwrites on whatever server event arrives later; no
    /// rollback is needed.
    pub fn mark_read(&self, conversation_id: Uuid) {
        self.unread.mark_read(conversation_id);
        let api = Arc::clone(&self.api);
        tokio::spawn(async move {
            if let Err(error) = api.mark_read(conversation_id).await {
                debug!(%error, %conversation_id, "mark-read command not delivered");
            }
        });
    }

    /// Merges a push-delivered message into an open conversation view.
    pub fn merge_pushed_message(&self, conversation_id: Uuid, message: Message) -> bool {
        self.pager.merge_pushed(conversation_id, message)
    }

    // Badge surface.

    #[must_use]
    pub fn unread_count(&self, conversation_id: Uuid) -> i64 {
        self.unread.count(conversation_id)
    }

    #[must_use]
    pub fn has_unread(&self, conversation_id: Uuid) -> bool {
        self.unread.has_unread(conversation_id)
    }

    /// Handle to the shared counter store, for UI layers that subscribe on
    /// their own cadence.
    #[must_use]
    pub fn unread_store(&self) -> &Arc<UnreadStore> {
        &self.unread
    }

    // History surface.

    #[must_use]
    pub fn messages(&self, conversation_id: Uuid) -> Vec<Message> {
        self.pager.messages(conversation_id)
    }

    #[must_use]
    pub fn has_more(&self, conversation_id: Uuid) -> bool {
        self.pager.has_more(conversation_id)
    }

    #[must_use]
    pub fn is_loading(&self, conversation_id: Uuid) -> bool {
        self.pager.is_loading(conversation_id)
    }

    // Connection surface.

    pub fn connect(&self) {
        self.connection.connect();
    }

    pub fn disconnect(&self) {
        self.connection.disconnect();
    }

    pub async fn reconnect(&self) {
        self.connection.reconnect().await;
    }

    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.connection.current_state()
    }

    #[must_use]
    pub fn watch_connection(&self) -> watch::Receiver<ConnectionState> {
        self.connection.subscribe()
    }
}
