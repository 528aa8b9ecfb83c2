//! Generic webhook notification channel
//!
//! Sends the run report as a JSON payload via HTTP POST. The payload
//! carries the full tabular data so rich consumers (email bridges,
//! dashboards) can render a styled table, plus the pre-rendered text
//! summary for plain consumers.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::{Channel, ChannelError, ChannelResult, DeliveryStatus};
use crate::report::BatchReport;

/// Webhook channel configuration
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Webhook URL endpoint
    pub url: String,
    /// Optional authentication token (sent as Bearer token)
    pub auth_token: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl WebhookConfig {
    /// Create a new webhook configuration
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth_token: None,
            timeout_secs: 10,
        }
    }

    /// Set authentication token
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.url.is_empty() {
            return Err(String::from("Webhook URL cannot be empty"));
        }

        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err(String::from(
                "Webhook URL must start with http:// or https://",
            ));
        }

        if self.timeout_secs == 0 {
            return Err(String::from("Timeout must be greater than 0"));
        }

        Ok(())
    }
}

/// Webhook notification channel
pub struct WebhookChannel {
    config: WebhookConfig,
    client: Client,
}

impl WebhookChannel {
    /// Create a new webhook channel
    pub fn new(config: WebhookConfig) -> ChannelResult<Self> {
        config.validate().map_err(ChannelError::InvalidConfig)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    /// Create a simple webhook channel with just a URL
    pub fn from_url(url: impl Into<String>) -> ChannelResult<Self> {
        Self::new(WebhookConfig::new(url))
    }

    /// Get the webhook URL
    pub fn url(&self) -> &str {
        &self.config.url
    }

    fn build_payload(&self, title: &str, report: &BatchReport) -> serde_json::Value {
        serde_json::json!({
            "title": title,
            "summary": report.text_summary(),
            "success_count": report.success_count,
            "total": report.total,
            "entries": report.entries,
            "fingerprint": report.fingerprint,
            "finished_at": report.finished_at.to_rfc3339(),
        })
    }
}

#[async_trait]
impl Channel for WebhookChannel {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn deliver(&self, title: &str, report: &BatchReport) -> ChannelResult<DeliveryStatus> {
        let payload = self.build_payload(title, report);

        let mut request = self.client.post(&self.config.url).json(&payload);
        if let Some(token) = &self.config.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            Ok(DeliveryStatus::success(self.name()))
        } else {
            Err(ChannelError::Rejected(format!("HTTP {}", status.as_u16())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_report() -> BatchReport {
        BatchReport {
            entries: vec![crate::report::AccountEntry {
                name: String::from("account_1"),
                success: true,
                quota: Some(2.0),
                used_quota: Some(1.0),
                note: String::from("OK"),
            }],
            success_count: 1,
            total: 1,
            fingerprint: None,
            finished_at: Utc::now(),
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(WebhookConfig::new("https://hooks.example.com/x")
            .validate()
            .is_ok());
        assert!(WebhookConfig::new("").validate().is_err());
        assert!(WebhookConfig::new("ftp://bad.example.com")
            .validate()
            .is_err());
        assert!(WebhookConfig::new("https://ok.example.com")
            .with_timeout(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_channel_rejects_invalid_config() {
        assert!(WebhookChannel::from_url("not-a-url").is_err());
    }

    #[test]
    fn test_payload_carries_entries_and_summary() {
        let channel = WebhookChannel::from_url("https://hooks.example.com/x").unwrap();
        let payload = channel.build_payload("Check-in Report", &sample_report());

        assert_eq!(payload["title"], "Check-in Report");
        assert_eq!(payload["success_count"], 1);
        assert_eq!(payload["entries"][0]["name"], "account_1");
        assert!(payload["summary"]
            .as_str()
            .unwrap()
            .contains("[SUCCESS] account_1"));
    }
}
