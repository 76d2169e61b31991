use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::{
    cache::MessageHistory,
    domain::{ChannelId, MessageId},
    expiry::is_expired_at,
};

/// Histories whose latest state belongs to `channel` and has not expired,
/// sorted ascending by the latest state's `changed_at`.
///
/// This defines recency order: the most recently changed eligible message is
/// last, and recency index 1 counts back from the end.
pub fn channel_candidates(
    snapshot: &HashMap<MessageId, MessageHistory>,
    channel: ChannelId,
    max_age: Duration,
    now: DateTime<Utc>,
) -> Vec<MessageHistory> {
    let mut matches: Vec<MessageHistory> = snapshot
        .values()
        .filter(|history| {
            let latest = history.latest();
            latest.message.channel == channel
                && !is_expired_at(latest, max_age, Duration::ZERO, now)
        })
        .cloned()
        .collect();
    matches.sort_by_key(|history| history.latest().changed_at);
    matches
}

/// Select by 1-based recency index: 1 = most recent, counting back.
///
/// Out-of-range indices are clamped into `[1, len]` rather than rejected, so
/// this never panics; `None` only for an empty list ("nothing to snipe").
pub fn select_by_index(ordered: &[MessageHistory], index: usize) -> Option<&MessageHistory> {
    if ordered.is_empty() {
        return None;
    }
    let clamped = index.clamp(1, ordered.len());
    ordered.get(ordered.len() - clamped)
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;
    use crate::cache::{ChangeType, MessageCache, MessageState};
    use crate::test_support::{state_at, t0};

    const MAX_AGE: Duration = Duration::from_secs(60);

    async fn snapshot_of(states: &[(u64, MessageState)]) -> HashMap<MessageId, MessageHistory> {
        let cache = MessageCache::new();
        for (id, state) in states {
            cache.record(MessageId(*id), state.clone()).await;
        }
        cache.snapshot().await
    }

    #[tokio::test]
    async fn filters_by_channel_and_expiry_then_sorts() {
        let snapshot = snapshot_of(&[
            (1, state_at(5, ChangeType::Delete, 20)),
            (2, state_at(5, ChangeType::Edit, 10)),
            (3, state_at(6, ChangeType::Delete, 30)), // other channel
            (4, state_at(5, ChangeType::Delete, -120)), // long expired
        ])
        .await;

        let now = t0() + TimeDelta::seconds(40);
        let ordered = channel_candidates(&snapshot, ChannelId(5), MAX_AGE, now);

        let ids: Vec<_> = ordered.iter().map(|h| h.id().0).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[tokio::test]
    async fn eligibility_uses_only_the_latest_state() {
        // Edited twice then deleted: the Delete state decides filter + order.
        let cache = MessageCache::new();
        cache.record(MessageId(7), state_at(5, ChangeType::Edit, 0)).await;
        cache.record(MessageId(7), state_at(5, ChangeType::Edit, 5)).await;
        cache
            .record(MessageId(7), state_at(5, ChangeType::Delete, 10))
            .await;
        let snapshot = cache.snapshot().await;

        let now = t0() + TimeDelta::seconds(30);
        let ordered = channel_candidates(&snapshot, ChannelId(5), MAX_AGE, now);
        assert_eq!(ordered.len(), 1);
        assert_eq!(ordered[0].states().len(), 3);
        assert_eq!(ordered[0].latest().changed_through, ChangeType::Delete);
    }

    #[tokio::test]
    async fn select_counts_back_from_most_recent_and_clamps() {
        let snapshot = snapshot_of(&[
            (1, state_at(5, ChangeType::Delete, 10)),
            (2, state_at(5, ChangeType::Delete, 20)),
            (3, state_at(5, ChangeType::Delete, 30)),
        ])
        .await;
        let now = t0() + TimeDelta::seconds(35);
        let ordered = channel_candidates(&snapshot, ChannelId(5), MAX_AGE, now);

        let at = |index: usize| {
            select_by_index(&ordered, index)
                .map(|h| h.latest().changed_at - t0())
                .map(|d| d.num_seconds())
        };

        assert_eq!(at(1), Some(30));
        assert_eq!(at(2), Some(20));
        assert_eq!(at(3), Some(10));
        // Clamped, never a panic.
        assert_eq!(at(0), Some(30));
        assert_eq!(at(99), Some(10));
        assert_eq!(at(usize::MAX), Some(10));
    }

    #[test]
    fn select_on_empty_list_is_none() {
        assert!(select_by_index(&[], 1).is_none());
        assert!(select_by_index(&[], 0).is_none());
    }
}
