use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::{MessageId, SnipedMessage};

/// How a tracked message changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeType {
    Edit,
    Delete,
}

impl ChangeType {
    pub fn verb(self) -> &'static str {
        match self {
            ChangeType::Edit => "edited",
            ChangeType::Delete => "deleted",
        }
    }
}

/// One observed version of a message. Immutable once created.
#[derive(Clone, Debug)]
pub struct MessageState {
    pub message: SnipedMessage,
    pub changed_through: ChangeType,
    pub changed_at: DateTime<Utc>,
}

/// All recorded states for one message id, oldest first.
///
/// Never empty while present in the cache; the last element is the current
/// (latest known) state.
#[derive(Clone, Debug)]
pub struct MessageHistory {
    id: MessageId,
    states: Vec<MessageState>,
}

impl MessageHistory {
    fn new(id: MessageId, first: MessageState) -> Self {
        Self {
            id,
            states: vec![first],
        }
    }

    fn push(&mut self, state: MessageState) {
        self.states.push(state);
    }

    /// The message id this history belongs to.
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// The current (latest known) state.
    pub fn latest(&self) -> &MessageState {
        self.states.last().expect("history is never empty")
    }

    /// All recorded states, oldest first.
    pub fn states(&self) -> &[MessageState] {
        &self.states
    }
}

/// In-memory cache of message versions, keyed by message id.
///
/// A single coarse mutex protects the outer map. Histories are append-only
/// and every read hands out a snapshot copy, so the lock is only ever held
/// for map operations.
#[derive(Default)]
pub struct MessageCache {
    entries: Mutex<HashMap<MessageId, MessageHistory>>,
}

impl MessageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `state` to the history for `id`, creating the history if
    /// absent. The entry is visible to pruning and queries from here on.
    pub async fn record(&self, id: MessageId, state: MessageState) {
        let mut entries = self.entries.lock().await;
        match entries.get_mut(&id) {
            Some(history) => history.push(state),
            None => {
                entries.insert(id, MessageHistory::new(id, state));
            }
        }
    }

    /// Read snapshot of one history.
    pub async fn get(&self, id: MessageId) -> Option<MessageHistory> {
        self.entries.lock().await.get(&id).cloned()
    }

    /// Remove the entry for `id` if present, reporting whether it was there.
    ///
    /// Idempotent: an id already removed (e.g. by a concurrent pruner scan)
    /// is a normal no-op.
    pub async fn remove(&self, id: MessageId) -> bool {
        self.entries.lock().await.remove(&id).is_some()
    }

    /// Consistent point-in-time copy of the full mapping.
    pub async fn snapshot(&self) -> HashMap<MessageId, MessageHistory> {
        self.entries.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::test_support::{state_at, state_in};

    #[tokio::test]
    async fn record_appends_in_call_order() {
        let cache = MessageCache::new();
        let id = MessageId(7);

        cache.record(id, state_at(1, ChangeType::Edit, 0)).await;
        cache.record(id, state_at(1, ChangeType::Edit, 5)).await;
        cache.record(id, state_at(1, ChangeType::Delete, 10)).await;

        let history = cache.get(id).await.unwrap();
        assert_eq!(history.id(), id);
        assert_eq!(history.states().len(), 3);
        let kinds: Vec<_> = history
            .states()
            .iter()
            .map(|s| s.changed_through)
            .collect();
        assert_eq!(
            kinds,
            vec![ChangeType::Edit, ChangeType::Edit, ChangeType::Delete]
        );
        assert_eq!(history.latest().changed_through, ChangeType::Delete);
    }

    #[tokio::test]
    async fn get_missing_id_is_none() {
        let cache = MessageCache::new();
        assert!(cache.get(MessageId(1)).await.is_none());
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let cache = MessageCache::new();
        let id = MessageId(42);
        cache.record(id, state_in(1)).await;

        assert!(cache.remove(id).await);
        assert!(!cache.remove(id).await);
        assert!(cache.get(id).await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn snapshot_is_point_in_time() {
        let cache = MessageCache::new();
        cache.record(MessageId(1), state_in(1)).await;

        let snapshot = cache.snapshot().await;
        cache.record(MessageId(2), state_in(1)).await;

        assert_eq!(snapshot.len(), 1);
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn concurrent_records_on_one_id_all_land() {
        let cache = Arc::new(MessageCache::new());
        let id = MessageId(9);

        let mut handles = Vec::new();
        for _ in 0..32 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                cache.record(id, state_in(1)).await;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(cache.get(id).await.unwrap().states().len(), 32);
    }
}
