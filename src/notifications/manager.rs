//! Notification manager for run-report fan-out

use tracing::{error, info, warn};

use super::channels::{Channel, DeliveryStatus};
use super::{TelegramChannel, WebhookChannel};
use crate::report::BatchReport;

/// Registry of notification channels with independent dispatch
#[derive(Default)]
pub struct NotificationManager {
    channels: Vec<Box<dyn Channel + Send + Sync>>,
}

impl NotificationManager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a manager from environment variables
    ///
    /// `GATECHECK_WEBHOOK_URL` registers the generic webhook channel;
    /// `TG_BOT_TOKEN` + `TG_CHAT_ID` register the Telegram channel.
    /// A channel whose configuration is malformed is skipped with a
    /// warning rather than failing the run.
    pub fn from_env() -> Self {
        let mut manager = Self::new();

        if let Ok(url) = std::env::var("GATECHECK_WEBHOOK_URL") {
            match WebhookChannel::from_url(url) {
                Ok(channel) => manager.add_channel(Box::new(channel)),
                Err(err) => warn!(error = %err, "Skipping webhook channel"),
            }
        }

        if let (Ok(token), Ok(chat_id)) =
            (std::env::var("TG_BOT_TOKEN"), std::env::var("TG_CHAT_ID"))
        {
            match TelegramChannel::new(token, chat_id) {
                Ok(channel) => manager.add_channel(Box::new(channel)),
                Err(err) => warn!(error = %err, "Skipping telegram channel"),
            }
        }

        manager
    }

    /// Add a notification channel
    pub fn add_channel(&mut self, channel: Box<dyn Channel + Send + Sync>) {
        self.channels.push(channel);
    }

    /// Number of registered channels
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Deliver the report to every channel, independently
    ///
    /// Each channel is invoked regardless of the others' outcomes; failures
    /// are logged and reflected in the returned statuses but never stop the
    /// dispatch.
    pub async fn dispatch(&self, title: &str, report: &BatchReport) -> Vec<DeliveryStatus> {
        let mut statuses = Vec::with_capacity(self.channels.len());

        for channel in &self.channels {
            match channel.deliver(title, report).await {
                Ok(status) => {
                    info!(channel = %channel.name(), "Notification delivered");
                    statuses.push(status);
                }
                Err(err) => {
                    error!(channel = %channel.name(), error = %err, "Notification delivery failed");
                    statuses.push(DeliveryStatus::failure(channel.name(), err.to_string()));
                }
            }
        }

        statuses
    }
}
