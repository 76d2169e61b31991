//! Rolling capture of live messages for later snipe lookup.
//!
//! Discord's delete and edit events only carry ids, so the adapter keeps its
//! own bounded backlog of recently seen messages to resolve them against.

use std::collections::{HashMap, VecDeque};

use serenity::model::channel::Message;
use serenity::model::user::User;
use tokio::sync::Mutex;

use sniper_core::domain::{AttachmentRef, AuthorRef, ChannelId, ReplyRef, SnipedMessage, UserId};

/// A captured live message plus the adapter-side metadata the ingestion
/// filters need.
#[derive(Clone, Debug)]
pub struct Captured {
    pub message: SnipedMessage,
    pub webhook_id: Option<u64>,
}

/// Bounded id → capture map, oldest observed evicted first.
pub struct RecentMessages {
    cap: usize,
    inner: Mutex<RecentInner>,
}

#[derive(Default)]
struct RecentInner {
    order: VecDeque<u64>,
    by_id: HashMap<u64, Captured>,
}

impl RecentMessages {
    pub fn new(cap: usize) -> Self {
        Self {
            cap: cap.max(1),
            inner: Mutex::new(RecentInner::default()),
        }
    }

    /// Capture or refresh a live message.
    pub async fn observe(&self, id: u64, captured: Captured) {
        let mut inner = self.inner.lock().await;
        if inner.by_id.insert(id, captured).is_none() {
            inner.order.push_back(id);
        }
        while inner.by_id.len() > self.cap {
            // `order` may hold ids already taken; those pops are no-ops.
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.by_id.remove(&oldest);
        }
    }

    pub async fn get(&self, id: u64) -> Option<Captured> {
        self.inner.lock().await.by_id.get(&id).cloned()
    }

    /// Remove and return; used on deletion, after which the id is dead.
    pub async fn take(&self, id: u64) -> Option<Captured> {
        self.inner.lock().await.by_id.remove(&id)
    }
}

/// Reduce a serenity message to the platform-neutral capture the core stores.
pub(crate) fn capture(msg: &Message) -> Captured {
    let reply_to = msg.referenced_message.as_deref().map(|replied| ReplyRef {
        author: author_ref(&replied.author),
        content: replied.content.to_string(),
        pinged: msg.mentions.iter().any(|u| u.id == replied.author.id),
    });

    Captured {
        webhook_id: msg.webhook_id.map(|w| w.get()),
        message: SnipedMessage {
            content: msg.content.to_string(),
            author: author_ref(&msg.author),
            channel: ChannelId(msg.channel_id.get()),
            attachments: msg
                .attachments
                .iter()
                .map(|a| AttachmentRef {
                    filename: a.filename.to_string(),
                    url: a.url.to_string(),
                })
                .collect(),
            // Only rich embeds are worth re-showing; link previews regenerate
            // on their own.
            embeds: msg
                .embeds
                .iter()
                .filter(|e| e.kind.as_deref() == Some("rich"))
                .filter_map(|e| serde_json::to_value(e).ok())
                .collect(),
            reply_to,
        },
    }
}

fn author_ref(user: &User) -> AuthorRef {
    AuthorRef {
        id: UserId(user.id.get()),
        name: user.name.to_string(),
        display_name: user.display_name().to_string(),
        avatar_url: user.avatar_url(),
        accent_colour: user.accent_colour.map(|c| c.0),
        is_bot: user.bot,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn captured_in(channel: u64) -> Captured {
        Captured {
            webhook_id: None,
            message: SnipedMessage {
                content: "hi".to_string(),
                author: AuthorRef {
                    id: UserId(1),
                    name: "tester".to_string(),
                    display_name: "Tester".to_string(),
                    avatar_url: None,
                    accent_colour: None,
                    is_bot: false,
                },
                channel: ChannelId(channel),
                attachments: Vec::new(),
                embeds: Vec::new(),
                reply_to: None,
            },
        }
    }

    #[tokio::test]
    async fn observe_then_get_and_take() {
        let recent = RecentMessages::new(8);
        recent.observe(1, captured_in(5)).await;

        assert!(recent.get(1).await.is_some());
        assert!(recent.take(1).await.is_some());
        assert!(recent.take(1).await.is_none());
    }

    #[tokio::test]
    async fn refresh_does_not_duplicate_order_entries() {
        let recent = RecentMessages::new(2);
        recent.observe(1, captured_in(5)).await;
        recent.observe(1, captured_in(6)).await; // edit refresh
        recent.observe(2, captured_in(5)).await;

        // Both ids still fit; the refreshed capture won.
        assert_eq!(recent.get(1).await.unwrap().message.channel, ChannelId(6));
        assert!(recent.get(2).await.is_some());
    }

    #[tokio::test]
    async fn oldest_is_evicted_at_capacity() {
        let recent = RecentMessages::new(2);
        recent.observe(1, captured_in(5)).await;
        recent.observe(2, captured_in(5)).await;
        recent.observe(3, captured_in(5)).await;

        assert!(recent.get(1).await.is_none());
        assert!(recent.get(2).await.is_some());
        assert!(recent.get(3).await.is_some());
    }

    #[tokio::test]
    async fn eviction_skips_already_taken_ids() {
        let recent = RecentMessages::new(2);
        recent.observe(1, captured_in(5)).await;
        recent.observe(2, captured_in(5)).await;
        recent.take(1).await;
        recent.observe(3, captured_in(5)).await;
        recent.observe(4, captured_in(5)).await;

        assert!(recent.get(2).await.is_none());
        assert!(recent.get(3).await.is_some());
        assert!(recent.get(4).await.is_some());
    }
}
