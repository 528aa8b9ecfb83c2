//! Notification channels for delivering run reports

pub mod telegram;
pub mod webhook;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::report::BatchReport;

/// Result type for channel operations
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Errors that can occur during channel operations
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Invalid channel configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Channel endpoint rejected the delivery
    #[error("Delivery rejected: {0}")]
    Rejected(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Result of one delivery attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryStatus {
    /// Whether the report was successfully delivered
    pub success: bool,
    /// Channel that delivered (or failed to deliver) the report
    pub channel: String,
    /// Optional message about the delivery
    pub message: Option<String>,
    /// Timestamp of the delivery attempt
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl DeliveryStatus {
    /// Create a successful delivery status
    pub fn success(channel: impl Into<String>) -> Self {
        Self {
            success: true,
            channel: channel.into(),
            message: None,
            timestamp: chrono::Utc::now(),
        }
    }

    /// Create a failed delivery status
    pub fn failure(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            channel: channel.into(),
            message: Some(message.into()),
            timestamp: chrono::Utc::now(),
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.success { "SUCCESS" } else { "FAILED" };
        write!(f, "[{status}] {}", self.channel)?;
        if let Some(msg) = &self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

/// Trait for notification channels
///
/// Implement this trait to add a delivery target. Channels decide their own
/// rendering: a rich sink may send the full tabular payload, a plain one
/// just the text summary.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Get the channel name
    fn name(&self) -> &str;

    /// Deliver a run report through this channel
    async fn deliver(&self, title: &str, report: &BatchReport) -> ChannelResult<DeliveryStatus>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_status_success() {
        let status = DeliveryStatus::success("webhook");
        assert!(status.success);
        assert_eq!(status.channel, "webhook");
        assert!(status.message.is_none());
    }

    #[test]
    fn test_delivery_status_failure() {
        let status = DeliveryStatus::failure("telegram", "connection timeout");
        assert!(!status.success);
        assert_eq!(status.channel, "telegram");
        assert_eq!(status.message, Some(String::from("connection timeout")));
    }

    #[test]
    fn test_delivery_status_display() {
        let success = DeliveryStatus::success("webhook");
        assert!(success.to_string().contains("SUCCESS"));
        assert!(success.to_string().contains("webhook"));

        let failure = DeliveryStatus::failure("telegram", "HTTP 502");
        assert!(failure.to_string().contains("FAILED"));
        assert!(failure.to_string().contains("HTTP 502"));
    }
}
