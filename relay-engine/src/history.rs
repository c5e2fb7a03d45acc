//! Paginated conversation history with stable newest-first ordering.
//!
//! Each open conversation view owns a cursor `{ total_known, page_size,
//! loaded_count, has_more }`. The first page holds the most recent
//! messages; `load_more` fetches older ones and appends them at the
//! chronologically older end. Messages pushed in real time and messages
//! paged from history arrive on independent paths, so every merge point
//! re-sorts by timestamp descending; the sort is the correctness boundary,
//! not the arrival order.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

use shared::models::Message;
use tracing::debug;
use uuid::Uuid;

use crate::{
    api::SyncApi,
    error::{Result, SyncError},
};

#[derive(Debug)]
struct ConversationView {
    messages: Vec<Message>,
    total_known: i64,
    page_size: i64,
    loaded_count: i64,
    has_more: bool,
    load_in_flight: bool,
    /// Bumped on every `initialize`; lets an in-flight fetch detect that its
    /// view was reset while it was suspended.
    generation: u64,
}

impl ConversationView {
    fn recompute_has_more(&mut self) {
        self.loaded_count = self.loaded_count.min(self.total_known);
        self.has_more = self.loaded_count < self.total_known;
    }
}

/// Cursor and message state for every open conversation view.
///
/// Views are created by `initialize` when a conversation opens and
/// discarded by `reset` when it closes; nothing persists for closed
/// conversations.
pub struct HistoryPager {
    api: Arc<dyn SyncApi>,
    views: Mutex<HashMap<Uuid, ConversationView>>,
    next_generation: AtomicU64,
}

impl std::fmt::Debug for HistoryPager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryPager").finish_non_exhaustive()
    }
}

impl HistoryPager {
    #[must_use]
    pub fn new(api: Arc<dyn SyncApi>) -> Self {
        Self {
            api,
            views: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Establishes the cursor for a freshly opened conversation view from
    /// the first page fetch. Re-initializing an id replaces its view.
    pub fn initialize(
        &self,
        conversation_id: Uuid,
        first_page: Vec<Message>,
        total_known: i64,
        page_size: i64,
    ) {
        let mut messages = first_page;
        sort_newest_first(&mut messages);
        let loaded_count = i64::try_from(messages.len()).unwrap_or(i64::MAX);

        let mut view = ConversationView {
            messages,
            // The server count can lag behind what it just returned.
            total_known: total_known.max(loaded_count),
            page_size: page_size.max(1),
            loaded_count,
            has_more: false,
            load_in_flight: false,
            generation: self.next_generation.fetch_add(1, Ordering::Relaxed),
        };
        view.recompute_has_more();

        self.views
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(conversation_id, view);
    }

    /// Fetches the next (older) page and splices it into the ordered view.
    ///
    /// Returns `Ok(true)` when a page was fetched, `Ok(false)` when the call
    /// was a no-op: everything already loaded, another load in flight, or
    /// the view was reset while the fetch was suspended. A failed fetch
    /// leaves the cursor untouched so the call can simply be retried.
    pub async fn load_more(&self, conversation_id: Uuid) -> Result<bool> {
        let (offset, limit, generation) = {
            let mut views = self.views.lock().unwrap_or_else(PoisonError::into_inner);
            let view = views
                .get_mut(&conversation_id)
                .ok_or(SyncError::UnknownConversation(conversation_id))?;

            if !view.has_more || view.load_in_flight {
                return Ok(false);
            }
            view.load_in_flight = true;
            (view.loaded_count, view.page_size, view.generation)
        };

        let fetched = self
            .api
            .fetch_history_page(conversation_id, limit, offset, false)
            .await;

        let mut views = self.views.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(view) = views
            .get_mut(&conversation_id)
            .filter(|view| view.generation == generation)
        else {
            // The view was reset (or replaced) while the fetch was in
            // flight; its result must not resurrect stale state.
            debug!(%conversation_id, "discarding history page for closed view");
            return Ok(false);
        };
        view.load_in_flight = false;

        let page = fetched?;
        // A push merged while this fetch was suspended shifts the server's
        // offset window, so the page can contain an already-loaded message.
        // merge_pushed advanced the cursor for it; counting it again here
        // would over-advance the offset and skip an older message.
        let mut appended = 0_i64;
        for message in page.messages {
            if view.messages.iter().any(|known| known.id == message.id) {
                continue;
            }
            view.messages.push(message);
            appended += 1;
        }
        view.total_known = page.total_messages.max(view.loaded_count + appended);
        view.loaded_count += appended;
        view.recompute_has_more();
        sort_newest_first(&mut view.messages);

        Ok(true)
    }

    /// Merges a message delivered over the push channel into an open view.
    ///
    /// Duplicates (a page fetch racing the push) are dropped by id. Returns
    /// `false` when the conversation has no open view; counters for closed
    /// conversations are tracked by the unread store alone.
    pub fn merge_pushed(&self, conversation_id: Uuid, message: Message) -> bool {
        let mut views = self.views.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(view) = views.get_mut(&conversation_id) else {
            return false;
        };
        if view.messages.iter().any(|known| known.id == message.id) {
            return false;
        }

        view.messages.push(message);
        // The pushed message extends both the loaded range and the server
        // total, keeping the offset math stable for the next page fetch.
        view.total_known += 1;
        view.loaded_count += 1;
        view.recompute_has_more();
        sort_newest_first(&mut view.messages);
        true
    }

    /// Discards the cursor and loaded messages for a closed view. Reopening
    /// the conversation re-fetches the first page.
    pub fn reset(&self, conversation_id: Uuid) {
        self.views
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&conversation_id);
    }

    /// The merged, ordered message list (newest first). Empty when the
    /// conversation has no open view.
    #[must_use]
    pub fn messages(&self, conversation_id: Uuid) -> Vec<Message> {
        self.views
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&conversation_id)
            .map(|view| view.messages.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn has_more(&self, conversation_id: Uuid) -> bool {
        self.with_view(conversation_id, |view| view.has_more)
            .unwrap_or(false)
    }

    #[must_use]
    pub fn is_loading(&self, conversation_id: Uuid) -> bool {
        self.with_view(conversation_id, |view| view.load_in_flight)
            .unwrap_or(false)
    }

    #[must_use]
    pub fn loaded_count(&self, conversation_id: Uuid) -> i64 {
        self.with_view(conversation_id, |view| view.loaded_count)
            .unwrap_or(0)
    }

    #[must_use]
    pub fn total_known(&self, conversation_id: Uuid) -> i64 {
        self.with_view(conversation_id, |view| view.total_known)
            .unwrap_or(0)
    }

    #[must_use]
    pub fn is_open(&self, conversation_id: Uuid) -> bool {
        self.with_view(conversation_id, |_| true).unwrap_or(false)
    }

    fn with_view<T>(&self, conversation_id: Uuid, f: impl FnOnce(&ConversationView) -> T) -> Option<T> {
        self.views
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&conversation_id)
            .map(f)
    }
}

fn sort_newest_first(messages: &mut [Message]) {
    messages.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}
