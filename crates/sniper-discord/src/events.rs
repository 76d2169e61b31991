//! Gateway event handlers.
//!
//! Each handler captures or resolves the affected message, applies the
//! ingestion filters (allow flags, self-snipe, our own webhook responses)
//! and hands the result to the tracker.

use std::sync::Arc;

use serenity::async_trait;
use serenity::model::channel::Message;
use serenity::model::event::MessageUpdateEvent;
use serenity::model::gateway::Ready;
use serenity::model::id::{ChannelId, GuildId, MessageId};
use serenity::prelude::*;
use tracing::{debug, info};

use sniper_core::domain::MessageId as CoreMessageId;

use crate::commands;
use crate::recent::{capture, Captured};
use crate::AppState;

pub struct Handler {
    state: Arc<AppState>,
}

impl Handler {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    fn bot_user_id(&self, ctx: &Context) -> u64 {
        ctx.cache.current_user().id.get()
    }

    /// Own messages are tracked only when self-sniping is enabled; responses
    /// from our own snipe webhook are never tracked.
    async fn skip_capture(
        &self,
        ctx: &Context,
        captured: &Captured,
        allow_self_snipe: bool,
    ) -> bool {
        if !allow_self_snipe && captured.message.author.id.0 == self.bot_user_id(ctx) {
            return true;
        }
        self.state
            .webhooks
            .is_snipe_webhook(captured.webhook_id)
            .await
    }

    async fn track_deletion(&self, ctx: &Context, id: u64, captured: Captured) {
        let settings = self.state.tracker.settings().await;
        if !settings.allow_deletion_sniping {
            return;
        }
        if self
            .skip_capture(ctx, &captured, settings.allow_self_snipe)
            .await
        {
            return;
        }
        self.state
            .tracker
            .notify_deleted(CoreMessageId(id), captured.message)
            .await;
    }

    async fn track_edit(&self, ctx: &Context, id: u64, captured: Captured) {
        let settings = self.state.tracker.settings().await;
        if !settings.allow_edit_sniping {
            return;
        }
        if self
            .skip_capture(ctx, &captured, settings.allow_self_snipe)
            .await
        {
            return;
        }
        self.state
            .tracker
            .notify_edited(CoreMessageId(id), captured.message)
            .await;
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(user = %ready.user.name, "sniper connected");
    }

    async fn message(&self, ctx: Context, msg: Message) {
        self.state.recent.observe(msg.id.get(), capture(&msg)).await;

        if msg.author.bot {
            return;
        }
        if let Some(command) = commands::parse(&self.state.cfg.command_prefix, &msg.content) {
            commands::handle(ctx, msg, command, self.state.clone()).await;
        }
    }

    async fn message_delete(
        &self,
        ctx: Context,
        _channel_id: ChannelId,
        deleted_message_id: MessageId,
        _guild_id: Option<GuildId>,
    ) {
        let id = deleted_message_id.get();
        let Some(captured) = self.state.recent.take(id).await else {
            debug!(id, "deletion of an unseen message, nothing to track");
            return;
        };
        self.track_deletion(&ctx, id, captured).await;
    }

    async fn message_delete_bulk(
        &self,
        ctx: Context,
        _channel_id: ChannelId,
        deleted_message_ids: Vec<MessageId>,
        _guild_id: Option<GuildId>,
    ) {
        for message_id in deleted_message_ids {
            let id = message_id.get();
            if let Some(captured) = self.state.recent.take(id).await {
                self.track_deletion(&ctx, id, captured).await;
            }
        }
    }

    async fn message_update(
        &self,
        ctx: Context,
        old_if_available: Option<Message>,
        new: Option<Message>,
        event: MessageUpdateEvent,
    ) {
        let id = event.id.get();

        // Resolve the pre-edit revision first, then refresh the backlog with
        // the new one so a later edit snipes the right version.
        let old = match self.state.recent.get(id).await {
            Some(captured) => Some(captured),
            None => old_if_available.as_ref().map(capture),
        };
        if let Some(new_msg) = &new {
            self.state.recent.observe(id, capture(new_msg)).await;
        }

        let Some(old) = old else {
            debug!(id, "edit of an unseen message, nothing to track");
            return;
        };
        self.track_edit(&ctx, id, old).await;
    }
}
