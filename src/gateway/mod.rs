//! HTTP client for the gateway API contract
//!
//! This module issues the check-in POST and the balance GET against one
//! provider, with a browser-like header bundle and the merged session
//! cookies. Response classification is explicit: the loose truthy-field
//! checks of the gateway's JSON dialect are decoded into a tagged
//! [`SignInStatus`], with substring matching on the raw body kept only as a
//! documented last resort for non-JSON responses.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, ORIGIN, REFERER,
    USER_AGENT as USER_AGENT_HEADER,
};
use reqwest::{Client, Url};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::ProviderProfile;
use crate::session::CookieMap;
use crate::utils::format_amount;

/// Browser-like User-Agent sent on every request, shared with the
/// bootstrap browser so both halves of a session look identical
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36";

/// Scale factor between raw integer quota and displayed currency units
const QUOTA_SCALE: f64 = 500_000.0;

/// Errors that can occur while talking to the gateway
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Network-level request failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-200 status code
    #[error("HTTP {0}")]
    Status(u16),

    /// Gateway accepted the request but rejected the check-in
    #[error("{0}")]
    Rejected(String),

    /// Body was neither valid JSON nor a recognizable success response
    #[error("Invalid response format")]
    MalformedResponse,

    /// Provider domain could not be parsed as a URL
    #[error("Invalid gateway domain: {0}")]
    InvalidDomain(String),

    /// Caller-identifier header name or value is not valid HTTP
    #[error("Invalid caller-identifier header: {0}")]
    InvalidHeader(String),
}

/// Classification of a check-in response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInStatus {
    /// Gateway confirmed the check-in
    Success,
    /// Gateway returned a structured rejection with its message
    GatewayError(String),
    /// Body could not be interpreted at all
    MalformedResponse,
}

/// Provider-reported balance figures, already scaled to currency units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Balance {
    /// Remaining quota
    pub quota: f64,
    /// Consumed quota
    pub used_quota: f64,
}

impl Balance {
    /// Human-readable balance line for logs and notifications
    pub fn display(&self) -> String {
        format!(
            "Current balance: ${}, Used: ${}",
            format_amount(self.quota),
            format_amount(self.used_quota)
        )
    }
}

/// Scale a raw integer quota into currency units, rounded to 2 decimals
pub fn scale_quota(raw: i64) -> f64 {
    (raw as f64 / QUOTA_SCALE * 100.0).round() / 100.0
}

#[derive(Deserialize)]
struct SignInBody {
    ret: Option<i64>,
    code: Option<i64>,
    #[serde(default)]
    success: bool,
    msg: Option<String>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct UserInfoBody {
    #[serde(default)]
    success: bool,
    data: Option<UserInfoData>,
}

#[derive(Deserialize)]
struct UserInfoData {
    #[serde(default)]
    quota: i64,
    #[serde(default)]
    used_quota: i64,
}

/// Classify a 200-status check-in body
///
/// The gateway dialects signal success as `ret == 1`, `code == 0`, or a
/// truthy `success` field. Non-JSON bodies fall back to a case-insensitive
/// substring match on "success"; anything else is malformed.
pub fn classify_sign_in(body: &str) -> SignInStatus {
    match serde_json::from_str::<SignInBody>(body) {
        Ok(parsed) => {
            if parsed.ret == Some(1) || parsed.code == Some(0) || parsed.success {
                SignInStatus::Success
            } else {
                let message = parsed
                    .msg
                    .or(parsed.message)
                    .unwrap_or_else(|| String::from("Unknown error"));
                SignInStatus::GatewayError(message)
            }
        }
        Err(_) => {
            // Last resort for gateways that answer plain text
            if body.to_lowercase().contains("success") {
                SignInStatus::Success
            } else {
                SignInStatus::MalformedResponse
            }
        }
    }
}

/// HTTP client bound to one provider and one account's credential set
///
/// Owns its reqwest client and cookie jar; nothing is shared between
/// accounts, and dropping the client releases the connection pool before
/// the next account is processed.
pub struct GatewayClient {
    client: Client,
    profile: ProviderProfile,
    api_user_name: HeaderName,
    api_user_value: HeaderValue,
}

impl GatewayClient {
    /// Create a client with the merged session cookies installed
    pub fn new(
        profile: ProviderProfile,
        api_user: &str,
        cookies: &CookieMap,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let base_url: Url = profile
            .domain
            .parse()
            .map_err(|_| GatewayError::InvalidDomain(profile.domain.clone()))?;

        // A request without the caller-identifier header would reach the
        // gateway and fail with an opaque rejection; reject it here instead
        let api_user_name = HeaderName::from_bytes(profile.api_user_header.as_bytes())
            .map_err(|_| GatewayError::InvalidHeader(profile.api_user_header.clone()))?;
        let api_user_value = HeaderValue::from_str(api_user)
            .map_err(|_| GatewayError::InvalidHeader(api_user.to_string()))?;

        let jar = Arc::new(reqwest::cookie::Jar::default());
        for (name, value) in cookies {
            jar.add_cookie_str(&format!("{name}={value}"), &base_url);
        }

        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .cookie_provider(jar)
            .build()?;

        Ok(Self {
            client,
            profile,
            api_user_name,
            api_user_value,
        })
    }

    /// Build the browser-like header bundle for gateway requests
    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert(USER_AGENT_HEADER, HeaderValue::from_static(USER_AGENT));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("zh-CN,zh;q=0.9,en;q=0.8"),
        );

        if let Ok(domain) = HeaderValue::from_str(&self.profile.domain) {
            headers.insert(REFERER, domain.clone());
            headers.insert(ORIGIN, domain);
        }

        headers.insert(self.api_user_name.clone(), self.api_user_value.clone());

        headers
    }

    /// Issue the check-in POST and classify the outcome
    ///
    /// Returns `Ok(())` on a confirmed check-in; any other status or
    /// classification is an error for the caller to record. The caller
    /// decides whether to invoke this at all (auto-check-in providers
    /// never need it).
    pub async fn check_in(&self, account: &str) -> Result<(), GatewayError> {
        info!(account = %account, "Executing check-in");

        let mut headers = self.build_headers();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            HeaderName::from_static("x-requested-with"),
            HeaderValue::from_static("XMLHttpRequest"),
        );

        let response = self
            .client
            .post(self.profile.sign_in_url())
            .headers(headers)
            .send()
            .await?;

        let status = response.status();
        debug!(account = %account, status = %status, "Check-in response received");

        // Exactly 200, not any 2xx: the gateway only answers a completed
        // check-in with 200, and body classification assumes it
        if status.as_u16() != 200 {
            return Err(GatewayError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        match classify_sign_in(&body) {
            SignInStatus::Success => {
                info!(account = %account, "Check-in successful");
                Ok(())
            }
            SignInStatus::GatewayError(message) => Err(GatewayError::Rejected(message)),
            SignInStatus::MalformedResponse => Err(GatewayError::MalformedResponse),
        }
    }

    /// Fetch the account's current balance
    ///
    /// Only a 200 response with a truthy `success` field counts; anything
    /// else surfaces as an error carrying the HTTP status so the caller can
    /// record a short diagnostic.
    pub async fn fetch_balance(&self, account: &str) -> Result<Balance, GatewayError> {
        let response = self
            .client
            .get(self.profile.user_info_url())
            .headers(self.build_headers())
            .send()
            .await?;

        let status = response.status().as_u16();

        if status == 200 {
            if let Ok(body) = response.json::<UserInfoBody>().await {
                if body.success {
                    let data = body.data.unwrap_or(UserInfoData {
                        quota: 0,
                        used_quota: 0,
                    });
                    let balance = Balance {
                        quota: scale_quota(data.quota),
                        used_quota: scale_quota(data.used_quota),
                    };
                    debug!(account = %account, balance = %balance.display(), "Balance retrieved");
                    return Ok(balance);
                }
            }
        }

        Err(GatewayError::Status(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_quota() {
        assert_eq!(scale_quota(1_000_000), 2.0);
        assert_eq!(scale_quota(750_000), 1.5);
        assert_eq!(scale_quota(0), 0.0);
        assert_eq!(scale_quota(625_000), 1.25);
    }

    #[test]
    fn test_balance_display() {
        let balance = Balance {
            quota: 2.0,
            used_quota: 1.0,
        };
        assert_eq!(balance.display(), "Current balance: $2.0, Used: $1.0");
    }

    #[test]
    fn test_classify_ret_one() {
        assert_eq!(classify_sign_in(r#"{"ret":1}"#), SignInStatus::Success);
    }

    #[test]
    fn test_classify_code_zero() {
        assert_eq!(classify_sign_in(r#"{"code":0}"#), SignInStatus::Success);
    }

    #[test]
    fn test_classify_truthy_success() {
        assert_eq!(
            classify_sign_in(r#"{"success":true}"#),
            SignInStatus::Success
        );
    }

    #[test]
    fn test_classify_rejection_uses_msg() {
        assert_eq!(
            classify_sign_in(r#"{"ret":0,"msg":"Already checked in"}"#),
            SignInStatus::GatewayError(String::from("Already checked in"))
        );
    }

    #[test]
    fn test_classify_rejection_falls_back_to_message() {
        assert_eq!(
            classify_sign_in(r#"{"success":false,"message":"not logged in"}"#),
            SignInStatus::GatewayError(String::from("not logged in"))
        );
    }

    #[test]
    fn test_classify_rejection_without_message() {
        assert_eq!(
            classify_sign_in(r#"{"success":false}"#),
            SignInStatus::GatewayError(String::from("Unknown error"))
        );
    }

    #[test]
    fn test_classify_non_json_success_substring() {
        assert_eq!(classify_sign_in("Check-in SUCCESS"), SignInStatus::Success);
    }

    #[test]
    fn test_classify_non_json_garbage() {
        assert_eq!(
            classify_sign_in("<html>blocked</html>"),
            SignInStatus::MalformedResponse
        );
    }

    #[test]
    fn test_classify_code_nonzero_is_rejection() {
        assert_eq!(
            classify_sign_in(r#"{"code":403,"message":"forbidden"}"#),
            SignInStatus::GatewayError(String::from("forbidden"))
        );
    }
}
