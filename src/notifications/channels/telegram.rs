//! Telegram notification channel
//!
//! Delivers the plain-text run summary through the Bot API `sendMessage`
//! endpoint.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::{Channel, ChannelError, ChannelResult, DeliveryStatus};
use crate::report::BatchReport;

/// Telegram bot channel
pub struct TelegramChannel {
    bot_token: String,
    chat_id: String,
    client: Client,
}

impl TelegramChannel {
    /// Create a channel for one bot token and chat
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> ChannelResult<Self> {
        let bot_token = bot_token.into();
        let chat_id = chat_id.into();

        if bot_token.is_empty() || chat_id.is_empty() {
            return Err(ChannelError::InvalidConfig(String::from(
                "Telegram bot token and chat id must both be set",
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            bot_token,
            chat_id,
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token)
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn deliver(&self, title: &str, report: &BatchReport) -> ChannelResult<DeliveryStatus> {
        let text = format!("{title}\n\n{}", report.text_summary());

        let response = self
            .client
            .post(self.endpoint())
            .json(&serde_json::json!({
                "chat_id": self.chat_id,
                "text": text,
            }))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(DeliveryStatus::success(self.name()))
        } else {
            Err(ChannelError::Rejected(format!("HTTP {}", status.as_u16())))
        }
    }
}
