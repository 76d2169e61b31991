//! Discord adapter (serenity).
//!
//! This crate implements the `sniper-core` ingestion and rendering seams over
//! the Discord gateway: event handlers capture message versions into the
//! tracker, and the responder renders snipes as embeds or webhook messages.

use std::sync::Arc;

use serenity::prelude::*;
use tracing::info;

pub mod commands;
pub mod events;
pub mod format;
pub mod recent;
pub mod respond;

use sniper_core::{config::Config, tracker::SnipeTracker, Error};

/// How many live messages the adapter keeps around for snipe capture.
///
/// Discord's delete/edit events only carry ids; a message we never saw (sent
/// before startup, or pushed out of this backlog) cannot be sniped.
const MESSAGE_BACKLOG: usize = 1024;

pub struct AppState {
    pub cfg: Arc<Config>,
    pub tracker: Arc<SnipeTracker>,
    pub recent: recent::RecentMessages,
    pub webhooks: Arc<respond::WebhookCache>,
}

pub(crate) fn map_err(e: serenity::Error) -> Error {
    Error::Discord(e.to_string())
}

/// Connect to the gateway and dispatch events until the process is stopped.
pub async fn run_gateway(cfg: Arc<Config>, tracker: Arc<SnipeTracker>) -> anyhow::Result<()> {
    let state = Arc::new(AppState {
        cfg: cfg.clone(),
        tracker,
        recent: recent::RecentMessages::new(MESSAGE_BACKLOG),
        webhooks: Arc::new(respond::WebhookCache::new()),
    });

    let intents =
        GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&cfg.discord_bot_token, intents)
        .event_handler(events::Handler::new(state))
        .await?;

    info!("connecting to the Discord gateway");
    client.start().await?;
    Ok(())
}
