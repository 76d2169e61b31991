//! Snipe response rendering: embed replies and author-spoofing webhooks.

use std::{collections::HashMap, sync::Arc, time::Duration};

use serenity::async_trait;
use serenity::builder::{
    CreateActionRow, CreateAllowedMentions, CreateButton, CreateEmbed, CreateEmbedAuthor,
    CreateEmbedFooter, CreateInteractionResponse, CreateInteractionResponseMessage, CreateMessage,
    CreateWebhook, ExecuteWebhook,
};
use serenity::futures::StreamExt;
use serenity::model::application::ButtonStyle;
use serenity::model::channel::{Channel, Embed, Message};
use serenity::model::id::ChannelId;
use serenity::model::webhook::Webhook;
use serenity::prelude::*;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use sniper_core::{
    cache::{MessageHistory, MessageState},
    domain::ReplyRef,
    render::{DeliveredResponse, SnipeRequest, SnipeResponder},
    Error, Result,
};

use crate::format::{relative_timestamp, truncate_with_dots};
use crate::map_err;

/// Name of the webhook the bot owns in each channel it snipes into.
pub const WEBHOOK_NAME: &str = "sniper_snipe_hook";

const DELETE_BUTTON_ID: &str = "sniper:delete";
const DELETE_BUTTON_TIMEOUT: Duration = Duration::from_secs(180);

// Discord limits the renderer clips to.
const CONTENT_EMBED_LIMIT: usize = 2000;
const REPLY_EMBED_LIMIT: usize = 4096;
const ATTACHMENT_FIELD_LIMIT: usize = 1024;
const MAX_EMBEDS: usize = 10;

/// Channel → snipe-webhook id map.
///
/// Lets ingestion skip messages produced by our own webhooks without an API
/// round-trip per incoming message.
#[derive(Default)]
pub struct WebhookCache {
    by_channel: Mutex<HashMap<u64, u64>>,
}

impl WebhookCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `webhook_id` is one of our snipe webhooks.
    pub async fn is_snipe_webhook(&self, webhook_id: Option<u64>) -> bool {
        let Some(webhook_id) = webhook_id else {
            return false;
        };
        self.by_channel
            .lock()
            .await
            .values()
            .any(|id| *id == webhook_id)
    }

    async fn remember(&self, channel: u64, webhook: u64) {
        self.by_channel.lock().await.insert(channel, webhook);
    }
}

/// Renders snipes into Discord. One instance per command invocation.
pub struct DiscordResponder {
    ctx: Context,
    webhooks: Arc<WebhookCache>,
}

impl DiscordResponder {
    pub fn new(ctx: Context, webhooks: Arc<WebhookCache>) -> Self {
        Self { ctx, webhooks }
    }

    async fn try_webhook(
        &self,
        req: SnipeRequest,
        history: &MessageHistory,
    ) -> Result<DeliveredResponse> {
        let state = history.latest();
        let author = &state.message.author;

        let invoked_in = ChannelId::new(req.channel.0);
        let (webhook_channel, thread) = webhook_target(&self.ctx, invoked_in).await?;
        let webhook = self.find_or_create_webhook(webhook_channel).await?;

        let mut embeds = Vec::new();
        if let Some(reply) = &state.message.reply_to {
            embeds.push(reply_embed(reply));
        }
        embeds.extend(rich_embeds(state));
        embeds.truncate(MAX_EMBEDS);

        let mut content = state.message.content.clone();
        if !state.message.attachments.is_empty() {
            // Webhooks can't re-upload for us; link the originals instead.
            content.push('\n');
            content.push_str(&attachment_links(state));
        }

        let mut exec = ExecuteWebhook::new()
            .username(author.display_name.clone())
            .content(content)
            .embeds(embeds)
            .components(vec![delete_button_row()])
            .allowed_mentions(CreateAllowedMentions::new());
        if let Some(url) = &author.avatar_url {
            exec = exec.avatar_url(url);
        }
        if let Some(thread) = thread {
            exec = exec.in_thread(thread);
        }

        let msg = webhook
            .execute(&self.ctx.http, true, exec)
            .await
            .map_err(map_err)?
            .ok_or_else(|| Error::Discord("webhook returned no message".to_string()))?;

        let delivered = DeliveredResponse {
            channel: req.channel,
            message: sniper_core::domain::MessageId(msg.id.get()),
        };
        spawn_delete_listener(self.ctx.clone(), msg, author.id.0, req.invoker.0);
        Ok(delivered)
    }

    async fn find_or_create_webhook(&self, channel: ChannelId) -> Result<Webhook> {
        let hooks = channel.webhooks(&self.ctx.http).await.map_err(map_err)?;
        let existing = hooks
            .into_iter()
            .find(|w| w.name.as_deref() == Some(WEBHOOK_NAME));

        let webhook = match existing {
            Some(hook) if hook.token.is_some() => hook,
            other => {
                // The token stops being retrievable after a while; replace
                // the hook with a fresh one.
                if let Some(stale) = other {
                    let _ = stale.delete(&self.ctx.http).await;
                }
                channel
                    .create_webhook(&self.ctx.http, CreateWebhook::new(WEBHOOK_NAME))
                    .await
                    .map_err(map_err)?
            }
        };

        self.webhooks
            .remember(channel.get(), webhook.id.get())
            .await;
        Ok(webhook)
    }
}

#[async_trait]
impl SnipeResponder for DiscordResponder {
    async fn send_embed(
        &self,
        req: SnipeRequest,
        history: &MessageHistory,
    ) -> Result<DeliveredResponse> {
        let state = history.latest();
        let author = &state.message.author;

        let mut content = format!(
            "Sniped message {} by <@{}> {}",
            state.changed_through.verb(),
            author.id.0,
            relative_timestamp(state.changed_at),
        );

        let mut embeds = vec![content_embed(state)];
        if let Some(reply) = &state.message.reply_to {
            content.push_str(&format!(" in reply to <@{}>", reply.author.id.0));
            embeds.push(reply_embed(reply));
        }
        embeds.extend(rich_embeds(state));
        embeds.truncate(MAX_EMBEDS);

        let channel = ChannelId::new(req.channel.0);
        let invoking = serenity::model::id::MessageId::new(req.invoking_message.0);
        let builder = CreateMessage::new()
            .content(content)
            .embeds(embeds)
            .components(vec![delete_button_row()])
            .reference_message((channel, invoking));

        let msg = channel
            .send_message(&self.ctx.http, builder)
            .await
            .map_err(map_err)?;

        let delivered = DeliveredResponse {
            channel: req.channel,
            message: sniper_core::domain::MessageId(msg.id.get()),
        };
        spawn_delete_listener(self.ctx.clone(), msg, author.id.0, req.invoker.0);
        Ok(delivered)
    }

    async fn send_webhook(
        &self,
        req: SnipeRequest,
        history: &MessageHistory,
    ) -> Result<DeliveredResponse> {
        match self.try_webhook(req, history).await {
            Ok(delivered) => Ok(delivered),
            Err(e) => {
                // Most commonly a missing Manage Webhooks permission;
                // deliver the embed variant instead.
                warn!(error = %e, "webhook snipe failed, falling back to embed");
                self.send_embed(req, history).await
            }
        }
    }
}

/// Threads can't own webhooks; post through the parent and target the thread.
async fn webhook_target(ctx: &Context, channel: ChannelId) -> Result<(ChannelId, Option<ChannelId>)> {
    let resolved = channel.to_channel(&ctx.http).await.map_err(map_err)?;
    if let Channel::Guild(guild_channel) = resolved {
        if guild_channel.thread_metadata.is_some() {
            if let Some(parent) = guild_channel.parent_id {
                return Ok((parent, Some(channel)));
            }
        }
    }
    Ok((channel, None))
}

fn content_embed(state: &MessageState) -> CreateEmbed {
    let mut embed = CreateEmbed::new()
        .title("Message content")
        .description(truncate_with_dots(
            &state.message.content,
            CONTENT_EMBED_LIMIT,
        ));
    if let Some(colour) = state.message.author.accent_colour {
        embed = embed.colour(colour);
    }
    if !state.message.attachments.is_empty() {
        embed = embed.field(
            "Attachments",
            truncate_with_dots(&attachment_links(state), ATTACHMENT_FIELD_LIMIT),
            false,
        );
    }
    embed
}

fn reply_embed(reply: &ReplyRef) -> CreateEmbed {
    let mut embed = CreateEmbed::new()
        .title(format!("Replying to message by {}", reply.author.display_name))
        .description(truncate_with_dots(&reply.content, REPLY_EMBED_LIMIT))
        .footer(CreateEmbedFooter::new(if reply.pinged {
            "Replied with ping"
        } else {
            "Replied without ping"
        }));
    let mut author = CreateEmbedAuthor::new(reply.author.display_name.clone());
    if let Some(url) = &reply.author.avatar_url {
        author = author.icon_url(url);
    }
    embed = embed.author(author);
    if let Some(colour) = reply.author.accent_colour {
        embed = embed.colour(colour);
    }
    embed
}

/// Re-materialize the rich embeds captured with the sniped message.
fn rich_embeds(state: &MessageState) -> Vec<CreateEmbed> {
    state
        .message
        .embeds
        .iter()
        .filter_map(|raw| serde_json::from_value::<Embed>(raw.clone()).ok())
        .map(CreateEmbed::from)
        .collect()
}

fn attachment_links(state: &MessageState) -> String {
    state
        .message
        .attachments
        .iter()
        .map(|a| format!("[{}]({})", a.filename, a.url))
        .collect::<Vec<_>>()
        .join("\n")
}

fn delete_button_row() -> CreateActionRow {
    CreateActionRow::Buttons(vec![CreateButton::new(DELETE_BUTTON_ID)
        .label("Delete")
        .style(ButtonStyle::Danger)])
}

/// Post-hoc deletion: the sniped author or the sniper can remove the
/// response within the timeout window; everyone else gets an ephemeral no.
fn spawn_delete_listener(ctx: Context, response: Message, sniped_author: u64, sniper: u64) {
    tokio::spawn(async move {
        let mut interactions = response
            .await_component_interaction(&ctx.shard)
            .timeout(DELETE_BUTTON_TIMEOUT)
            .stream();

        while let Some(interaction) = interactions.next().await {
            if interaction.data.custom_id != DELETE_BUTTON_ID {
                continue;
            }
            let presser = interaction.user.id.get();
            if presser != sniped_author && presser != sniper {
                let rejection = CreateInteractionResponse::Message(
                    CreateInteractionResponseMessage::new()
                        .content("Only the sniper or the sniped user can delete this.")
                        .ephemeral(true),
                );
                let _ = interaction.create_response(&ctx.http, rejection).await;
                continue;
            }

            let _ = interaction
                .create_response(&ctx.http, CreateInteractionResponse::Acknowledge)
                .await;
            if let Err(e) = response.delete(&ctx.http).await {
                debug!(error = %e, "could not delete snipe response");
            }
            break;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn webhook_cache_matches_only_remembered_ids() {
        let cache = WebhookCache::new();
        assert!(!cache.is_snipe_webhook(Some(9)).await);
        assert!(!cache.is_snipe_webhook(None).await);

        cache.remember(5, 9).await;
        assert!(cache.is_snipe_webhook(Some(9)).await);
        assert!(!cache.is_snipe_webhook(Some(10)).await);
    }

    #[tokio::test]
    async fn webhook_cache_tracks_replacements() {
        let cache = WebhookCache::new();
        cache.remember(5, 9).await;
        cache.remember(5, 12).await; // hook recreated

        assert!(cache.is_snipe_webhook(Some(12)).await);
        assert!(!cache.is_snipe_webhook(Some(9)).await);
    }
}
