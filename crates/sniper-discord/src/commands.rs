//! Prefix text commands: `snipe` (alias `s`) and `snipeconf`.

use std::sync::Arc;
use std::time::Duration;

use serenity::model::channel::Message;
use serenity::prelude::*;
use tracing::warn;

use sniper_core::domain::{ChannelId, MessageId, UserId};
use sniper_core::render::SnipeRequest;
use sniper_core::{Error, Result};

use crate::respond::DiscordResponder;
use crate::AppState;

/// A recognized bot command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BotCommand {
    /// `snipe [index]`; `index: None` means the argument wasn't a positive
    /// number.
    Snipe { index: Option<usize> },
    /// `snipeconf <key> <value>`.
    Config { key: String, value: String },
    ConfigHelp,
}

/// Parse a prefix command out of a raw message. Unknown commands yield
/// `None` so other bots sharing the prefix stay untouched.
pub fn parse(prefix: &str, text: &str) -> Option<BotCommand> {
    let rest = text.trim().strip_prefix(prefix)?;
    let mut parts = rest.split_whitespace();
    let cmd = parts.next()?.to_ascii_lowercase();
    match cmd.as_str() {
        "snipe" | "s" => {
            let index = match parts.next() {
                None => Some(1),
                Some(arg) => arg.parse::<usize>().ok().filter(|i| *i >= 1),
            };
            Some(BotCommand::Snipe { index })
        }
        "snipeconf" => match (parts.next(), parts.next()) {
            (Some(key), Some(value)) => Some(BotCommand::Config {
                key: key.to_ascii_lowercase(),
                value: value.to_string(),
            }),
            _ => Some(BotCommand::ConfigHelp),
        },
        _ => None,
    }
}

pub async fn handle(ctx: Context, msg: Message, command: BotCommand, state: Arc<AppState>) {
    match command {
        BotCommand::Snipe { index: Some(index) } => run_snipe(ctx, msg, index, state).await,
        BotCommand::Snipe { index: None } => {
            reply(
                &ctx,
                &msg,
                "Usage: snipe [index] — the index counts back from the most recent.",
            )
            .await;
        }
        BotCommand::Config { key, value } => run_config(ctx, msg, key, value, state).await,
        BotCommand::ConfigHelp => {
            reply(&ctx, &msg, "Usage: snipeconf <key> <value>").await;
        }
    }
}

async fn run_snipe(ctx: Context, msg: Message, index: usize, state: Arc<AppState>) {
    let settings = state.tracker.settings().await;
    if settings.sniping_disabled() {
        reply(&ctx, &msg, "Sniping is disabled.").await;
        return;
    }

    let req = SnipeRequest {
        channel: ChannelId(msg.channel_id.get()),
        invoker: UserId(msg.author.id.get()),
        invoking_message: MessageId(msg.id.get()),
    };
    let responder = DiscordResponder::new(ctx.clone(), state.webhooks.clone());

    match state.tracker.snipe(req, index, &responder).await {
        Ok(Some(_)) => {}
        Ok(None) => reply(&ctx, &msg, "No messages to snipe.").await,
        Err(e) => {
            warn!(error = %e, "snipe failed");
            reply(&ctx, &msg, "Couldn't deliver that snipe.").await;
        }
    }
}

async fn run_config(ctx: Context, msg: Message, key: String, value: String, state: Arc<AppState>) {
    if !state.cfg.admin_users.contains(&msg.author.id.get()) {
        reply(&ctx, &msg, "You are not allowed to change sniper settings.").await;
        return;
    }

    match apply_setting(&state, &key, &value).await {
        Ok(summary) => reply(&ctx, &msg, &summary).await,
        Err(e) => reply(&ctx, &msg, &format!("Rejected: {e}")).await,
    }
}

async fn apply_setting(state: &AppState, key: &str, value: &str) -> Result<String> {
    let tracker = &state.tracker;
    match key {
        "response_mode" | "mode" => {
            tracker.set_response_mode(value).await?;
            let mode = tracker.settings().await.response_mode;
            Ok(format!("Response mode set to {mode}."))
        }
        "max_age" | "max_age_seconds" => {
            let secs = value.parse::<u64>().map_err(|_| {
                Error::Config(format!("max_age wants a number of seconds, got {value:?}"))
            })?;
            tracker.set_max_age(Duration::from_secs(secs)).await;
            Ok(format!("Max age set to {secs}s."))
        }
        "allow_edit_sniping" => {
            let on = parse_toggle(value)?;
            tracker.set_allow_edit_sniping(on).await;
            Ok(toggled("Edit sniping", on))
        }
        "allow_deletion_sniping" => {
            let on = parse_toggle(value)?;
            tracker.set_allow_deletion_sniping(on).await;
            Ok(toggled("Deletion sniping", on))
        }
        "allow_self_snipe" => {
            let on = parse_toggle(value)?;
            tracker.set_allow_self_snipe(on).await;
            Ok(toggled("Self-sniping", on))
        }
        _ => Err(Error::Config(format!("unknown setting {key:?}"))),
    }
}

fn parse_toggle(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!("expected on/off, got {value:?}"))),
    }
}

fn toggled(what: &str, on: bool) -> String {
    format!("{what} {}.", if on { "enabled" } else { "disabled" })
}

async fn reply(ctx: &Context, msg: &Message, text: &str) {
    if let Err(e) = msg.reply(&ctx.http, text).await {
        warn!(error = %e, "failed to send reply");
    }
}
