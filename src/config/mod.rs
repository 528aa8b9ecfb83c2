//! Configuration management for gatecheck
//!
//! This module handles loading and validating configuration from environment
//! variables and files. Provider profiles describe the HTTP contract of one
//! API gateway; account credentials bind a cookie payload and caller
//! identifier to a provider.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Immutable description of one API gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderProfile {
    /// Base origin, e.g. `https://anyrouter.top`
    pub domain: String,

    /// Login page path, navigated by the browser bootstrap
    #[serde(default = "default_login_path")]
    pub login_path: String,

    /// Check-in endpoint path (POST)
    pub sign_in_path: String,

    /// User info endpoint path (GET)
    pub user_info_path: String,

    /// Header name carrying the caller's user identifier
    pub api_user_header: String,

    /// Whether the gateway triggers check-in automatically on any
    /// authenticated request, making the explicit POST unnecessary
    #[serde(default)]
    pub auto_check_in: bool,

    /// Anti-bot cookie names that must be acquired by browser bootstrap
    /// before any API request is accepted; empty means no bootstrap needed
    #[serde(default)]
    pub waf_cookie_names: Vec<String>,
}

fn default_login_path() -> String {
    String::from("/login")
}

impl ProviderProfile {
    /// Whether WAF cookies must be bootstrapped for this provider
    pub fn needs_waf_cookies(&self) -> bool {
        !self.waf_cookie_names.is_empty()
    }

    /// Whether an explicit check-in request must be issued
    pub fn needs_explicit_check_in(&self) -> bool {
        !self.auto_check_in
    }

    /// Full login page URL
    pub fn login_url(&self) -> String {
        format!("{}{}", self.domain, self.login_path)
    }

    /// Full check-in endpoint URL
    pub fn sign_in_url(&self) -> String {
        format!("{}{}", self.domain, self.sign_in_path)
    }

    /// Full user info endpoint URL
    pub fn user_info_url(&self) -> String {
        format!("{}{}", self.domain, self.user_info_path)
    }
}

/// Raw cookie payload as supplied by the user
///
/// Either a structured name/value mapping or a semicolon-delimited cookie
/// string as copied from browser devtools.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CookiePayload {
    /// Structured mapping, passed through unchanged
    Map(HashMap<String, String>),
    /// `"a=1; b=2"` style string, parsed tolerantly
    Raw(String),
}

/// One account's identity: provider reference, caller identifier, cookies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountCredential {
    /// Provider name, resolved against the provider table
    pub provider: String,

    /// Value for the provider's caller-identifier header
    pub api_user: String,

    /// Session cookie payload
    pub cookies: CookiePayload,

    /// Optional display name for logs and reports
    #[serde(default)]
    pub name: Option<String>,
}

impl AccountCredential {
    /// Display name for logs and reports, defaulting to `account_<n>`
    pub fn display_name(&self, index: usize) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("account_{}", index + 1))
    }
}

/// Runtime tunables for a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Path of the persisted balance fingerprint file
    pub state_file: PathBuf,

    /// Upper bound of the random whole-run start delay, in seconds;
    /// zero disables the delay
    pub max_start_delay_secs: u64,

    /// HTTP request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            state_file: PathBuf::from("balance_state.txt"),
            max_start_delay_secs: 0,
            request_timeout_secs: 30,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Known provider profiles by name
    pub providers: HashMap<String, ProviderProfile>,

    /// Accounts to process, in order
    pub accounts: Vec<AccountCredential>,

    /// Runtime tunables
    #[serde(default)]
    pub run: RunConfig,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// `GATECHECK_ACCOUNTS` (JSON array) is required. `GATECHECK_PROVIDERS`
    /// (JSON object) overlays the built-in provider table.
    pub fn from_env() -> Result<Self> {
        let mut providers = Self::default_providers();

        if let Ok(raw) = std::env::var("GATECHECK_PROVIDERS") {
            let extra: HashMap<String, ProviderProfile> = serde_json::from_str(&raw)
                .context("Failed to parse GATECHECK_PROVIDERS as JSON")?;
            providers.extend(extra);
        }

        let accounts_raw = std::env::var("GATECHECK_ACCOUNTS")
            .or_else(|_| std::env::var("ACCOUNTS"))
            .context("GATECHECK_ACCOUNTS is not set")?;
        let accounts: Vec<AccountCredential> = serde_json::from_str(&accounts_raw)
            .context("Failed to parse GATECHECK_ACCOUNTS as JSON")?;

        let state_file = std::env::var("GATECHECK_STATE_FILE")
            .unwrap_or_else(|_| String::from("balance_state.txt"))
            .into();

        let max_start_delay_secs = std::env::var("GATECHECK_MAX_START_DELAY")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);

        let request_timeout_secs = std::env::var("GATECHECK_REQUEST_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(30);

        Ok(Self {
            providers,
            accounts,
            run: RunConfig {
                state_file,
                max_start_delay_secs,
                request_timeout_secs,
            },
        })
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        // File-declared providers overlay the built-in table
        let mut providers = Self::default_providers();
        providers.extend(config.providers);
        config.providers = providers;

        Ok(config)
    }

    /// Built-in provider table for the reference gateway
    pub fn default_providers() -> HashMap<String, ProviderProfile> {
        let mut providers = HashMap::new();
        providers.insert(
            String::from("anyrouter"),
            ProviderProfile {
                domain: String::from("https://anyrouter.top"),
                login_path: String::from("/login"),
                sign_in_path: String::from("/api/user/sign_in"),
                user_info_path: String::from("/api/user/self"),
                api_user_header: String::from("new-api-user"),
                auto_check_in: false,
                waf_cookie_names: vec![
                    String::from("acw_tc"),
                    String::from("cdn_sec_tc"),
                    String::from("acw_sc__v2"),
                ],
            },
        );
        providers
    }

    /// Look up a provider profile by name
    pub fn get_provider(&self, name: &str) -> Option<&ProviderProfile> {
        self.providers.get(name)
    }

    /// Validate configuration values
    ///
    /// Unknown provider references are not rejected here: resolution
    /// failures are per-account failures at run time, not startup errors.
    pub fn validate(&self) -> Result<()> {
        if self.accounts.is_empty() {
            anyhow::bail!("No accounts configured");
        }

        if self.run.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than 0");
        }

        for (name, provider) in &self.providers {
            if !provider.domain.starts_with("http://") && !provider.domain.starts_with("https://") {
                anyhow::bail!("Provider '{name}' domain must start with http:// or https://");
            }
        }

        Ok(())
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.run.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> Config {
        Config {
            providers: Config::default_providers(),
            accounts: vec![AccountCredential {
                provider: String::from("anyrouter"),
                api_user: String::from("12345"),
                cookies: CookiePayload::Raw(String::from("session=abc")),
                name: None,
            }],
            run: RunConfig::default(),
        }
    }

    #[test]
    fn test_default_providers_contains_reference_gateway() {
        let providers = Config::default_providers();
        let profile = providers.get("anyrouter").expect("built-in profile");
        assert_eq!(profile.domain, "https://anyrouter.top");
        assert!(profile.needs_waf_cookies());
        assert!(profile.needs_explicit_check_in());
        assert_eq!(profile.waf_cookie_names.len(), 3);
    }

    #[test]
    fn test_provider_urls() {
        let providers = Config::default_providers();
        let profile = providers.get("anyrouter").unwrap();
        assert_eq!(profile.login_url(), "https://anyrouter.top/login");
        assert_eq!(profile.sign_in_url(), "https://anyrouter.top/api/user/sign_in");
        assert_eq!(profile.user_info_url(), "https://anyrouter.top/api/user/self");
    }

    #[test]
    fn test_display_name_defaults() {
        let config = sample_config();
        assert_eq!(config.accounts[0].display_name(0), "account_1");

        let mut named = config.accounts[0].clone();
        named.name = Some(String::from("work"));
        assert_eq!(named.display_name(5), "work");
    }

    #[test]
    fn test_validate_rejects_empty_accounts() {
        let mut config = sample_config();
        config.accounts.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = sample_config();
        config.run.request_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_unknown_provider_reference() {
        let mut config = sample_config();
        config.accounts[0].provider = String::from("nonexistent");
        // Unknown provider is a per-account runtime failure, not a config error
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cookie_payload_deserialization() {
        let raw: AccountCredential =
            serde_json::from_str(r#"{"provider":"anyrouter","api_user":"1","cookies":"a=1; b=2"}"#)
                .unwrap();
        assert!(matches!(raw.cookies, CookiePayload::Raw(_)));

        let mapped: AccountCredential = serde_json::from_str(
            r#"{"provider":"anyrouter","api_user":"1","cookies":{"session":"xyz"}}"#,
        )
        .unwrap();
        assert!(matches!(mapped.cookies, CookiePayload::Map(_)));
    }

    #[test]
    fn test_toml_roundtrip() {
        let toml_text = r#"
[providers.local]
domain = "http://localhost:9000"
sign_in_path = "/api/user/sign_in"
user_info_path = "/api/user/self"
api_user_header = "new-api-user"
auto_check_in = true

[[accounts]]
provider = "local"
api_user = "42"
cookies = "session=s1"
name = "primary"

[run]
state_file = "state.txt"
max_start_delay_secs = 0
request_timeout_secs = 15
"#;
        let config: Config = toml::from_str(toml_text).unwrap();
        assert_eq!(config.accounts.len(), 1);
        let local = config.providers.get("local").unwrap();
        assert!(local.auto_check_in);
        assert!(!local.needs_waf_cookies());
        assert_eq!(local.login_path, "/login");
        assert_eq!(config.run.request_timeout_secs, 15);
    }
}
