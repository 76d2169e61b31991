/// Discord message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub u64);

/// Discord channel id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChannelId(pub u64);

/// Discord user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub u64);

/// The author of a tracked message, reduced to what a renderer needs.
#[derive(Clone, Debug, PartialEq)]
pub struct AuthorRef {
    pub id: UserId,
    pub name: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub accent_colour: Option<u32>,
    pub is_bot: bool,
}

/// One attachment of a tracked message, by reference (never downloaded).
#[derive(Clone, Debug, PartialEq)]
pub struct AttachmentRef {
    pub filename: String,
    pub url: String,
}

/// Reply context of a tracked message.
#[derive(Clone, Debug, PartialEq)]
pub struct ReplyRef {
    pub author: AuthorRef,
    pub content: String,
    pub pinged: bool,
}

/// Platform-neutral capture of a message at the moment it changed.
///
/// Rich embeds ride through as raw JSON payloads for the rendering layer; the
/// core stores and returns them but never looks inside.
#[derive(Clone, Debug, PartialEq)]
pub struct SnipedMessage {
    pub content: String,
    pub author: AuthorRef,
    pub channel: ChannelId,
    pub attachments: Vec<AttachmentRef>,
    pub embeds: Vec<serde_json::Value>,
    pub reply_to: Option<ReplyRef>,
}
