//! Message transport between the principal and the dispatcher
//!
//! The dispatcher only needs to send a message, edit it later and delete
//! messages by handle. [`TelegramTransport`] implements this over the
//! Telegram Bot API; tests use an in-memory recorder.

mod telegram;

pub use telegram::TelegramTransport;

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Opaque handle to a message in a conversation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    /// Conversation the message lives in
    pub chat_id: i64,
    /// Message id within the conversation
    pub message_id: i64,
}

/// A text message received from someone
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    /// Identity of the sender, checked against the allowed principal
    pub principal: i64,
    /// Handle of the received message, used for delayed deletion
    pub message: MessageRef,
    /// Message text
    pub text: String,
}

/// Outbound side of a conversation
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `text` to `chat_id` and return a handle to the new message
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<MessageRef>;

    /// Replace the text of an earlier message
    async fn edit_message(&self, message: &MessageRef, text: &str) -> Result<()>;

    /// Delete a message
    async fn delete_message(&self, message: &MessageRef) -> Result<()>;
}
