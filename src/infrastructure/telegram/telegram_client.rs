use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::TelegramCfg;
use crate::shared::errors::NotifyError;
use crate::shared::utils::truncate_chars;
use super::Notifier;

/// Telegram rejects longer message bodies
const MAX_MESSAGE_CHARS: usize = 4096;

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    #[serde(default)]
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    chat: Chat,
    #[serde(default)]
    from: Option<User>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct User {
    id: i64,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// A text message received by the bot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub update_id: i64,
    pub chat_id: String,
    pub user_id: Option<String>,
    pub text: String,
}

/// Result of one `getUpdates` poll
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpdateBatch {
    /// Offset acknowledging every update seen, text or not
    pub next_offset: i64,
    pub messages: Vec<IncomingMessage>,
}

/// Minimal Bot API client: `sendMessage` and long-polling `getUpdates`
pub struct TelegramClient {
    http_client: Client,
    base_url: String,
    long_poll_seconds: u64,
}

impl TelegramClient {
    pub fn new(cfg: &TelegramCfg, bot_token: &str) -> Result<Self, NotifyError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(cfg.long_poll_seconds + 10))
            .build()?;
        Ok(Self {
            http_client,
            base_url: format!("{}/bot{}", cfg.api_base.trim_end_matches('/'), bot_token),
            long_poll_seconds: cfg.long_poll_seconds,
        })
    }

    /// Fetch text messages newer than `offset`
    pub async fn get_updates(&self, offset: i64) -> Result<UpdateBatch, NotifyError> {
        let url = format!("{}/getUpdates", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", self.long_poll_seconds.to_string()),
            ])
            .send()
            .await?;

        let body: ApiResponse<Vec<Update>> = response.json().await?;
        if !body.ok {
            return Err(NotifyError::Rejected(body.description.unwrap_or_default()));
        }

        let updates = body.result.unwrap_or_default();
        let next_offset = updates
            .iter()
            .map(|u| u.update_id + 1)
            .max()
            .unwrap_or(offset);

        let messages: Vec<IncomingMessage> = updates
            .into_iter()
            .filter_map(|update| {
                let message = update.message?;
                Some(IncomingMessage {
                    update_id: update.update_id,
                    chat_id: message.chat.id.to_string(),
                    user_id: message.from.map(|u| u.id.to_string()),
                    text: message.text?,
                })
            })
            .collect();
        debug!("{} incoming messages", messages.len());
        Ok(UpdateBatch {
            next_offset,
            messages,
        })
    }
}

#[async_trait]
impl Notifier for TelegramClient {
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), NotifyError> {
        let url = format!("{}/sendMessage", self.base_url);
        let request = SendMessageRequest {
            chat_id,
            text: truncate_chars(text, MAX_MESSAGE_CHARS),
        };
        let body: ApiResponse<serde_json::Value> = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await?
            .json()
            .await?;

        if body.ok {
            info!("📨 Message delivered to chat {}", chat_id);
            Ok(())
        } else {
            Err(NotifyError::Rejected(body.description.unwrap_or_default()))
        }
    }
}
