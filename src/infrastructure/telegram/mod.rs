//! Telegram Bot API delivery and command intake

mod telegram_client;

pub use telegram_client::{IncomingMessage, TelegramClient, UpdateBatch};

use async_trait::async_trait;
use crate::shared::errors::NotifyError;

/// Delivers formatted text to a chat destination
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), NotifyError>;
}
