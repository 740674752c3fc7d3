//! Channel-facing message types and the outbound messenger capability.
//!
//! The transport layer (webhook receiver, polling loop, REPL) normalizes
//! whatever it receives into an [`IncomingMessage`] and decides, via
//! [`should_process`], whether the bot was addressed at all. The agent core
//! never sees un-addressed chatter.

pub mod repl;

use async_trait::async_trait;
use regex::Regex;

use crate::error::ChannelError;

/// Normalized inbound update handed over by the transport layer.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub chat_id: i64,
    pub user_id: i64,
    pub message_id: i64,
    pub text: String,
    pub is_reply_to_bot: bool,
    pub mentions_bot: bool,
}

impl IncomingMessage {
    pub fn new(chat_id: i64, user_id: i64, message_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            user_id,
            message_id,
            text: text.into(),
            is_reply_to_bot: false,
            mentions_bot: false,
        }
    }
}

/// Per-conversation key: at most one pending action per user per chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChatKey {
    pub chat_id: i64,
    pub user_id: i64,
}

impl From<&IncomingMessage> for ChatKey {
    fn from(message: &IncomingMessage) -> Self {
        Self {
            chat_id: message.chat_id,
            user_id: message.user_id,
        }
    }
}

/// Whether the bot should handle this update at all.
///
/// In group chats and channels the bot only reacts when mentioned or when
/// the message replies to one of its own; in private chats it reacts to
/// everything.
pub fn should_process(message: &IncomingMessage, private_chat: bool) -> bool {
    private_chat || message.is_reply_to_bot || message.mentions_bot
}

/// Strip the bot's `@mention` and a leading called name ("Alfred, ...")
/// from the text, leaving the request itself.
pub fn strip_addressing(text: &str, bot_name: &str) -> String {
    let mut out = text.to_string();
    if let Ok(mention) = Regex::new(&format!(r"(?i)@{}\b", regex::escape(bot_name))) {
        out = mention.replace_all(&out, "").into_owned();
    }
    if let Ok(called) = Regex::new(&format!(r"(?i)^\s*{}\s*[,:]?\s+", regex::escape(bot_name))) {
        out = called.replace(&out, "").into_owned();
    }
    out.trim().to_string()
}

/// Outbound messaging capability.
///
/// One reply per handled update; fire-and-forget from the state machine's
/// perspective. Delivery failures are logged by the caller, never retried.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_reply(
        &self,
        chat_id: i64,
        reply_to_message_id: i64,
        text: &str,
    ) -> Result<(), ChannelError>;
}
