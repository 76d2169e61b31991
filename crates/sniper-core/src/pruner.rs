use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::tracker::SnipeTracker;

/// Periodic cache eviction task.
///
/// Scans on a fixed period and evicts every entry whose latest state has
/// expired. The task has no terminal state other than [`Pruner::stop`]:
/// per-entry conditions are handled inside `prune_once` (a concurrently
/// removed id is a no-op), so one entry can never bring the scan down.
pub struct Pruner {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Pruner {
    /// Spawn the pruner on the current runtime.
    pub fn spawn(tracker: Arc<SnipeTracker>, period: Duration) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut tick = tokio::time::interval(period);
            // interval fires immediately once; pruning an empty cache is a no-op.
            loop {
                tokio::select! {
                  _ = token.cancelled() => break,
                  _ = tick.tick() => {
                    let removed = tracker.prune_once(Utc::now()).await;
                    if removed > 0 {
                        debug!(removed, "prune scan evicted entries");
                    }
                  }
                }
            }
        });
        Self { cancel, handle }
    }

    /// Stop the task at process shutdown. Idempotent.
    pub fn stop(&self) {
        self.cancel.cancel();
        self.handle.abort(); // best-effort
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SnipeSettings;
    use crate::domain::{ChannelId, MessageId};
    use crate::test_support::message_in;

    fn tracker_with_max_age(max_age: Duration) -> Arc<SnipeTracker> {
        Arc::new(SnipeTracker::new(SnipeSettings {
            max_age,
            ..SnipeSettings::default()
        }))
    }

    #[tokio::test]
    async fn evicts_expired_entries_while_running() {
        let tracker = tracker_with_max_age(Duration::from_millis(50));
        tracker.notify_deleted(MessageId(42), message_in(5)).await;
        assert_eq!(tracker.tracked_len().await, 1);

        let pruner = Pruner::spawn(tracker.clone(), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(250)).await;

        assert_eq!(tracker.tracked_len().await, 0);
        assert!(tracker.ordered_candidates(ChannelId(5)).await.is_empty());
        pruner.stop();
    }

    #[tokio::test]
    async fn leaves_fresh_entries_alone() {
        let tracker = tracker_with_max_age(Duration::from_secs(60));
        tracker.notify_deleted(MessageId(1), message_in(5)).await;

        let pruner = Pruner::spawn(tracker.clone(), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(tracker.tracked_len().await, 1);
        pruner.stop();
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let tracker = tracker_with_max_age(Duration::from_secs(60));
        let pruner = Pruner::spawn(tracker, Duration::from_millis(10));
        pruner.stop();
        pruner.stop();
    }
}
