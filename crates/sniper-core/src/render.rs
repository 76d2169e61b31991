use async_trait::async_trait;

use crate::{
    cache::MessageHistory,
    domain::{ChannelId, MessageId, UserId},
    errors::Error,
    Result,
};

/// How a successful snipe is presented.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseMode {
    /// Reply with an embed quoting the sniped content.
    Embed,
    /// Re-post the content through a webhook spoofing the original author.
    Webhook,
}

impl ResponseMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseMode::Embed => "embed",
            ResponseMode::Webhook => "webhook",
        }
    }
}

impl std::str::FromStr for ResponseMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "embed" => Ok(ResponseMode::Embed),
            "webhook" => Ok(ResponseMode::Webhook),
            _ => Err(Error::InvalidResponseMode(s.to_string())),
        }
    }
}

impl std::fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where and for whom a snipe response is rendered.
#[derive(Clone, Copy, Debug)]
pub struct SnipeRequest {
    pub channel: ChannelId,
    pub invoker: UserId,
    pub invoking_message: MessageId,
}

/// Handle to a delivered snipe response.
#[derive(Clone, Copy, Debug)]
pub struct DeliveredResponse {
    pub channel: ChannelId,
    pub message: MessageId,
}

/// Platform side of response rendering.
///
/// Implementations deliver the latest state of `history` into the invoking
/// channel. A webhook failure may fall back to the embed path internally;
/// the returned handle is whatever was actually delivered.
#[async_trait]
pub trait SnipeResponder: Send + Sync {
    async fn send_embed(
        &self,
        req: SnipeRequest,
        history: &MessageHistory,
    ) -> Result<DeliveredResponse>;

    async fn send_webhook(
        &self,
        req: SnipeRequest,
        history: &MessageHistory,
    ) -> Result<DeliveredResponse>;
}

/// Dispatch a snipe response by mode.
///
/// An explicit match, not a string-keyed handler table: an invalid mode is
/// unrepresentable here because it was rejected when the setting was set.
pub async fn respond(
    mode: ResponseMode,
    responder: &dyn SnipeResponder,
    req: SnipeRequest,
    history: &MessageHistory,
) -> Result<DeliveredResponse> {
    match mode {
        ResponseMode::Embed => responder.send_embed(req, history).await,
        ResponseMode::Webhook => responder.send_webhook(req, history).await,
    }
}
