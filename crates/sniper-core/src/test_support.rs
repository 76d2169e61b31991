//! Shared fixtures for unit tests.

use chrono::{DateTime, TimeZone, Utc};

use crate::{
    cache::{ChangeType, MessageState},
    domain::{AuthorRef, ChannelId, SnipedMessage, UserId},
};

/// Fixed origin for relative test timestamps.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub fn message_in(channel: u64) -> SnipedMessage {
    SnipedMessage {
        content: "hello world".to_string(),
        author: AuthorRef {
            id: UserId(100),
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
    }
}

/// A state in `channel` changed `secs_after_t0` seconds after [`t0`].
pub fn state_at(channel: u64, changed_through: ChangeType, secs_after_t0: i64) -> MessageState {
    MessageState {
        message: message_in(channel),
        changed_through,
        changed_at: t0() + chrono::TimeDelta::seconds(secs_after_t0),
    }
}

/// A deletion state in `channel` stamped at [`t0`].
pub fn state_in(channel: u64) -> MessageState {
    state_at(channel, ChangeType::Delete, 0)
}
