//! Telegram Bot API transport (long polling)

use super::{InboundMessage, MessageRef, Transport};
use crate::config::TelegramConfig;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Longest text the Bot API accepts in one message
const MAX_MESSAGE_CHARS: usize = 4096;

/// Pause after a failed `getUpdates` before polling again
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Bot API client
pub struct TelegramTransport {
    client: reqwest::Client,
    base: String,
    poll_timeout: Duration,
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    disable_web_page_preview: bool,
}

#[derive(Serialize)]
struct EditMessageText<'a> {
    chat_id: i64,
    message_id: i64,
    text: &'a str,
    disable_web_page_preview: bool,
}

#[derive(Serialize)]
struct DeleteMessage {
    chat_id: i64,
    message_id: i64,
}

#[derive(Serialize)]
struct GetUpdates<'a> {
    offset: i64,
    timeout: u64,
    allowed_updates: &'a [&'a str],
}

#[derive(Deserialize)]
struct Update {
    update_id: i64,
    message: Option<Message>,
}

#[derive(Deserialize)]
struct Message {
    message_id: i64,
    chat: Chat,
    from: Option<User>,
    text: Option<String>,
}

#[derive(Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Deserialize)]
struct User {
    id: i64,
}

impl TelegramTransport {
    /// Build a client for the configured bot
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        if config.token.is_empty() {
            return Err(Error::config("telegram.token", "bot token is required"));
        }

        // long polls hold the connection for poll_timeout
        let client = reqwest::Client::builder()
            .timeout(config.poll_timeout + Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base: format!(
                "{}/bot{}",
                config.api_url.trim_end_matches('/'),
                config.token
            ),
            poll_timeout: config.poll_timeout,
        })
    }

    async fn call<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .client
            .post(format!("{}/{}", self.base, method))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let parsed: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| Error::Transport(format!("{method}: unreadable response ({status}): {e}")))?;

        if !parsed.ok {
            return Err(Error::Transport(format!(
                "{method}: {}",
                parsed
                    .description
                    .unwrap_or_else(|| format!("request failed with {status}"))
            )));
        }
        parsed
            .result
            .ok_or_else(|| Error::Transport(format!("{method}: response has no result")))
    }

    /// Receive updates until `cancel` fires, forwarding text messages to `tx`
    ///
    /// Polling errors are logged and retried after a pause. Returns when the
    /// token is cancelled or the receiver is dropped.
    pub async fn poll_updates(&self, tx: mpsc::Sender<InboundMessage>, cancel: CancellationToken) {
        let mut offset = 0;
        tracing::info!("Telegram polling started");

        loop {
            let request = GetUpdates {
                offset,
                timeout: self.poll_timeout.as_secs(),
                allowed_updates: &["message"],
            };
            let updates: Result<Vec<Update>> = tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.call("getUpdates", &request) => result,
            };

            let updates = match updates {
                Ok(updates) => updates,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to fetch updates");
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(POLL_ERROR_BACKOFF) => continue,
                    }
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);
                let Some(inbound) = update.message.and_then(inbound_from) else {
                    continue;
                };
                if tx.send(inbound).await.is_err() {
                    tracing::info!("Inbound receiver dropped, stopping polling");
                    return;
                }
            }
        }

        tracing::info!("Telegram polling stopped");
    }
}

fn inbound_from(message: Message) -> Option<InboundMessage> {
    Some(InboundMessage {
        principal: message.from?.id,
        message: MessageRef {
            chat_id: message.chat.id,
            message_id: message.message_id,
        },
        text: message.text?,
    })
}

fn fit(text: &str) -> String {
    if text.chars().count() <= MAX_MESSAGE_CHARS {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(MAX_MESSAGE_CHARS - 1).collect();
    cut.push('…');
    cut
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<MessageRef> {
        let text = fit(text);
        let sent: Message = self
            .call(
                "sendMessage",
                &SendMessage {
                    chat_id,
                    text: &text,
                    disable_web_page_preview: true,
                },
            )
            .await?;
        Ok(MessageRef {
            chat_id: sent.chat.id,
            message_id: sent.message_id,
        })
    }

    async fn edit_message(&self, message: &MessageRef, text: &str) -> Result<()> {
        let text = fit(text);
        let edited: Result<serde_json::Value> = self
            .call(
                "editMessageText",
                &EditMessageText {
                    chat_id: message.chat_id,
                    message_id: message.message_id,
                    text: &text,
                    disable_web_page_preview: true,
                },
            )
            .await;

        match edited {
            Ok(_) => Ok(()),
            // repeated progress notes
            Err(Error::Transport(reason)) if reason.contains("message is not modified") => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn delete_message(&self, message: &MessageRef) -> Result<()> {
        let _: bool = self
            .call(
                "deleteMessage",
                &DeleteMessage {
                    chat_id: message.chat_id,
                    message_id: message.message_id,
                },
            )
            .await?;
        Ok(())
    }
}
