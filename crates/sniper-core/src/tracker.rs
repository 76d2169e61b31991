use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use crate::{
    cache::{ChangeType, MessageCache, MessageHistory, MessageState},
    config::SnipeSettings,
    domain::{ChannelId, MessageId, SnipedMessage},
    expiry::is_expired_at,
    query::{channel_candidates, select_by_index},
    render::{respond, DeliveredResponse, SnipeRequest, SnipeResponder},
    Result,
};

/// High-level facade over the message cache and the runtime settings.
///
/// Event ingestion calls `notify_*`, the command layer calls `snipe`, and the
/// pruner task calls `prune_once`. All paths are safe to run interleaved.
pub struct SnipeTracker {
    cache: MessageCache,
    settings: Mutex<SnipeSettings>,
}

impl SnipeTracker {
    pub fn new(settings: SnipeSettings) -> Self {
        Self {
            cache: MessageCache::new(),
            settings: Mutex::new(settings),
        }
    }

    pub async fn settings(&self) -> SnipeSettings {
        *self.settings.lock().await
    }

    /// Change the response mode. An unrecognized value is rejected with
    /// [`crate::Error::InvalidResponseMode`] and the old mode stays in place.
    pub async fn set_response_mode(&self, raw: &str) -> Result<()> {
        let mode = raw.parse()?;
        self.settings.lock().await.response_mode = mode;
        Ok(())
    }

    pub async fn set_max_age(&self, max_age: Duration) {
        self.settings.lock().await.max_age = max_age;
    }

    pub async fn set_allow_edit_sniping(&self, on: bool) {
        self.settings.lock().await.allow_edit_sniping = on;
    }

    pub async fn set_allow_deletion_sniping(&self, on: bool) {
        self.settings.lock().await.allow_deletion_sniping = on;
    }

    pub async fn set_allow_self_snipe(&self, on: bool) {
        self.settings.lock().await.allow_self_snipe = on;
    }

    /// Record a deletion observed for `id`.
    pub async fn notify_deleted(&self, id: MessageId, message: SnipedMessage) {
        self.track(id, message, ChangeType::Delete).await;
    }

    /// Record an edit observed for `id` (the pre-edit revision).
    pub async fn notify_edited(&self, id: MessageId, message: SnipedMessage) {
        self.track(id, message, ChangeType::Edit).await;
    }

    async fn track(&self, id: MessageId, message: SnipedMessage, changed_through: ChangeType) {
        let state = MessageState {
            message,
            changed_through,
            changed_at: Utc::now(),
        };
        self.cache.record(id, state).await;
        debug!(id = id.0, change = changed_through.verb(), "message tracked");
    }

    /// Read snapshot of one tracked history.
    pub async fn get(&self, id: MessageId) -> Option<MessageHistory> {
        self.cache.get(id).await
    }

    /// Eligible histories for `channel`, oldest first (recency index counts
    /// back from the end).
    pub async fn ordered_candidates(&self, channel: ChannelId) -> Vec<MessageHistory> {
        let max_age = self.settings().await.max_age;
        let snapshot = self.cache.snapshot().await;
        channel_candidates(&snapshot, channel, max_age, Utc::now())
    }

    /// Select by recency index, render, then consume the entry.
    ///
    /// Returns `Ok(None)` when there is nothing to snipe. The entry is
    /// removed only after the responder reported a delivered response, so a
    /// failed render leaves it available; the removal itself tolerates a
    /// concurrent prune of the same id.
    pub async fn snipe(
        &self,
        req: SnipeRequest,
        index: usize,
        responder: &dyn SnipeResponder,
    ) -> Result<Option<DeliveredResponse>> {
        let mode = self.settings().await.response_mode;
        let candidates = self.ordered_candidates(req.channel).await;
        let Some(history) = select_by_index(&candidates, index) else {
            return Ok(None);
        };

        let id = history.id();
        let delivered = respond(mode, responder, req, history).await?;
        self.consume(id).await;
        Ok(Some(delivered))
    }

    /// Remove a consumed entry so it cannot be sniped twice.
    ///
    /// An absent id (already pruned, or consumed by a racing snipe) is a
    /// normal no-op, never an error.
    pub async fn consume(&self, id: MessageId) {
        if self.cache.remove(id).await {
            debug!(id = id.0, "message consumed");
        }
    }

    /// One pruner scan: evict every entry whose latest state has expired at
    /// `now` (zero lenience). Returns the number of evicted entries.
    ///
    /// Eviction is independent per id; an entry that vanished since the
    /// snapshot was taken is skipped, never an error.
    pub async fn prune_once(&self, now: DateTime<Utc>) -> usize {
        let max_age = self.settings().await.max_age;
        let snapshot = self.cache.snapshot().await;
        let mut removed = 0;
        for (id, history) in snapshot {
            if is_expired_at(history.latest(), max_age, Duration::ZERO, now)
                && self.cache.remove(id).await
            {
                debug!(id = id.0, "message removed from cache");
                removed += 1;
            }
        }
        removed
    }

    pub async fn tracked_len(&self) -> usize {
        self.cache.len().await
    }
}
