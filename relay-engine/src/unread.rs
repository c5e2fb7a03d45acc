//! Per-conversation unread counters.
//!
//! Three producers write here: the bulk snapshot at startup, push frames
//! from the event stream, and local optimistic mark-read actions. Every
//! write stores an absolute value, so the store is idempotent and
//! commutative under duplicate or out-of-order delivery; the push channel
//! guarantees neither ordering nor dedup.

use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

use shared::models::UnreadSnapshotResponse;
use uuid::Uuid;

/// Process-wide unread-counter map, constructed once and shared by handle.
#[derive(Debug, Default)]
pub struct UnreadStore {
    counts: RwLock<HashMap<Uuid, i64>>,
}

impl UnreadStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Absolute overwrite from a push frame. Negative server values clamp
    /// to zero; the count invariant is non-negative.
    pub fn set(&self, conversation_id: Uuid, count: i64) {
        let mut counts = self
            .counts
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        counts.insert(conversation_id, count.max(0));
    }

    /// Replaces the entire map with the bulk snapshot. The snapshot is the
    /// ground truth for conversations that went stale while disconnected.
    pub fn replace_all(&self, snapshot: &UnreadSnapshotResponse) {
        let mut counts = self
            .counts
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        counts.clear();
        for entry in &snapshot.conversations {
            counts.insert(entry.conversation_id, entry.unread_count.max(0));
        }
    }

    /// Coarse resync from an `unread_sync` frame: each listed conversation
    /// has at least one unread message. Known larger counts are kept; exact
    /// values arrive later via `new_message` frames.
    pub fn merge_unread_markers(&self, conversation_ids: &[Uuid]) {
        let mut counts = self
            .counts
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for id in conversation_ids {
            let count = counts.entry(*id).or_insert(0);
            if *count < 1 {
                *count = 1;
            }
        }
    }

    /// Local optimistic mark-read: sets the count to exactly zero. The
    /// server-side command is fired and forgotten by the caller; a late
    /// `marked_read` confirmation is idempotent with this write.
    pub fn mark_read(&self, conversation_id: Uuid) {
        self.set(conversation_id, 0);
    }

    /// Current count for a conversation, zero when unknown.
    #[must_use]
    pub fn count(&self, conversation_id: Uuid) -> i64 {
        self.counts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&conversation_id)
            .copied()
            .unwrap_or(0)
    }

    #[must_use]
    pub fn has_unread(&self, conversation_id: Uuid) -> bool {
        self.count(conversation_id) > 0
    }

    /// Total unread across all conversations, for aggregate badges.
    #[must_use]
    pub fn total_unread(&self) -> i64 {
        self.counts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .sum()
    }

    /// Snapshot of all current counters, for rendering a badge list.
    #[must_use]
    pub fn all_counts(&self) -> Vec<(Uuid, i64)> {
        let mut entries: Vec<(Uuid, i64)> = self
            .counts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, count)| (*id, *count))
            .collect();
        entries.sort_by_key(|(id, _)| *id);
        entries
    }
}
