//! Messaging transport seam
//!
//! The reminder engine never talks to a chat platform directly. Everything it
//! needs from the transport goes through [`Messenger`]; inbound traffic reaches
//! it as [`IncomingMessage`] and [`CallbackQuery`] values built by the adapter.
//!
//! - **Version**: 1.0.0
//! - **Since**: 2.0.0

use anyhow::Result;
use async_trait::async_trait;

/// Conversation a message is posted to
pub type ChatId = i64;
/// Author of an inbound message or callback
pub type UserId = i64;

/// Location of a message previously sent by the bot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: u64,
}

/// A button offered under an outgoing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    /// Payload echoed back in [`CallbackQuery::payload`]
    pub id: String,
    pub label: String,
}

impl Choice {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// Rendering options for [`Messenger::send_message`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOptions {
    pub choices: Vec<Choice>,
}

impl SendOptions {
    pub fn with_choices(choices: Vec<Choice>) -> Self {
        Self { choices }
    }
}

/// Plain text message from a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub text: String,
}

/// A user pressed one of the offered choices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackQuery {
    pub user_id: UserId,
    /// Opaque handle used to answer the callback
    pub callback_id: String,
    pub payload: String,
    /// Message the choice was attached to, when the transport reports it
    pub message: Option<MessageRef>,
}

/// Outbound primitives of the chat transport
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Post `text` to `chat_id`, returning where it landed
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        options: SendOptions,
    ) -> Result<MessageRef>;

    /// Acknowledge a callback with a short notice
    async fn answer_callback(&self, callback_id: &str, text: &str, is_alert: bool) -> Result<()>;

    /// Replace the text of an earlier message and drop its choices
    async fn edit_message(&self, target: MessageRef, text: &str) -> Result<()>;
}
