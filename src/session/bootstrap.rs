//! WAF cookie bootstrap via headless Chromium
//!
//! Some gateways sit behind an anti-bot layer that only issues verification
//! cookies to a real browser. This module navigates a throwaway Chromium
//! profile to the provider's login page and harvests the required cookies.
//!
//! The browser dependency is kept behind the [`WafBootstrapper`] trait so the
//! orchestration core can run against a deterministic stub in tests.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::CookieMap;
use crate::gateway::USER_AGENT;

/// Bounded wait for the page to reach a stable loaded state
const PAGE_LOAD_TIMEOUT: Duration = Duration::from_secs(5);

/// Fixed fallback wait applied when the load signal never arrives
const PAGE_LOAD_FALLBACK: Duration = Duration::from_secs(3);

/// Errors that can occur during WAF cookie bootstrap
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// Browser could not be launched
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    /// Navigation or cookie read failed
    #[error("Browser navigation failed: {0}")]
    Navigation(String),

    /// Required cookies were not present after the wait
    #[error("Missing WAF cookies: {0:?}")]
    MissingCookies(Vec<String>),

    /// Temporary profile directory could not be created
    #[error("Failed to create browser profile dir: {0}")]
    Profile(#[from] std::io::Error),
}

/// Acquires anti-bot verification cookies for a login URL
///
/// Implementations must return the full required set or fail; a partial set
/// is useless because every subsequent request would be rejected.
#[async_trait]
pub trait WafBootstrapper: Send + Sync {
    /// Acquire the named cookies from a fresh session on `login_url`
    async fn acquire(
        &self,
        account: &str,
        login_url: &str,
        required: &[String],
    ) -> Result<CookieMap, BootstrapError>;
}

/// Chromium-backed bootstrapper
///
/// Each invocation launches an isolated browser profile in a temporary
/// directory and tears it down before returning, so cookies can never leak
/// between accounts. The browser is closed on every exit path.
#[derive(Debug, Clone)]
pub struct BrowserBootstrapper {
    headless: bool,
}

impl Default for BrowserBootstrapper {
    fn default() -> Self {
        Self { headless: true }
    }
}

impl BrowserBootstrapper {
    /// Create a headless bootstrapper
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle headless mode (headful is only useful for local debugging)
    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    fn build_config(&self, profile_dir: &std::path::Path) -> Result<BrowserConfig, BootstrapError> {
        let mut builder = BrowserConfig::builder()
            .user_data_dir(profile_dir)
            .no_sandbox()
            .request_timeout(Duration::from_secs(30))
            .args(vec![
                format!("--user-agent={USER_AGENT}"),
                String::from("--disable-blink-features=AutomationControlled"),
                String::from("--disable-dev-shm-usage"),
                String::from("--disable-gpu"),
                String::from("--no-first-run"),
                String::from("--window-size=1920,1080"),
            ]);

        if !self.headless {
            builder = builder.with_head();
        }

        builder.build().map_err(BootstrapError::Launch)
    }

    async fn harvest_cookies(
        &self,
        account: &str,
        browser: &Browser,
        login_url: &str,
        required: &[String],
    ) -> Result<CookieMap, BootstrapError> {
        let page = browser
            .new_page(login_url)
            .await
            .map_err(|err| BootstrapError::Navigation(err.to_string()))?;

        self.wait_for_load(account, &page).await;

        let cookies = page
            .get_cookies()
            .await
            .map_err(|err| BootstrapError::Navigation(err.to_string()))?;

        let waf_cookies: CookieMap = cookies
            .into_iter()
            .filter(|cookie| required.contains(&cookie.name))
            .map(|cookie| (cookie.name, cookie.value))
            .collect();

        info!(
            account = %account,
            acquired = waf_cookies.len(),
            "Collected WAF cookies from login page"
        );

        let missing: Vec<String> = required
            .iter()
            .filter(|name| !waf_cookies.contains_key(*name))
            .cloned()
            .collect();

        if !missing.is_empty() {
            return Err(BootstrapError::MissingCookies(missing));
        }

        Ok(waf_cookies)
    }

    /// Wait for page-load stabilization, bounded by [`PAGE_LOAD_TIMEOUT`]
    ///
    /// On timeout the bootstrap does not fail; the anti-bot layer usually
    /// sets its cookies early, so a fixed fallback wait is enough.
    async fn wait_for_load(&self, account: &str, page: &Page) {
        match tokio::time::timeout(PAGE_LOAD_TIMEOUT, page.wait_for_navigation()).await {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => {
                debug!(account = %account, error = %err, "Navigation wait reported error");
                tokio::time::sleep(PAGE_LOAD_FALLBACK).await;
            }
            Err(_) => {
                debug!(account = %account, "Page load wait timed out, using fixed fallback");
                tokio::time::sleep(PAGE_LOAD_FALLBACK).await;
            }
        }
    }
}

#[async_trait]
impl WafBootstrapper for BrowserBootstrapper {
    async fn acquire(
        &self,
        account: &str,
        login_url: &str,
        required: &[String],
    ) -> Result<CookieMap, BootstrapError> {
        info!(account = %account, url = %login_url, "Launching browser for WAF cookies");

        let profile_dir = tempfile::tempdir()?;
        let config = self.build_config(profile_dir.path())?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|err| BootstrapError::Launch(err.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(error = %err, "Chromium handler reported error");
                }
            }
        });

        let result = self
            .harvest_cookies(account, &browser, login_url, required)
            .await;

        // The browser must be torn down on every exit path, success or not
        if let Err(err) = browser.close().await {
            warn!(account = %account, error = %err, "Failed to close browser gracefully");
        }
        if let Err(err) = handler_task.await {
            warn!(account = %account, error = %err, "Browser handler join error");
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrapper_defaults_to_headless() {
        let bootstrapper = BrowserBootstrapper::new();
        assert!(bootstrapper.headless);

        let headful = BrowserBootstrapper::new().with_headless(false);
        assert!(!headful.headless);
    }

    #[test]
    fn test_missing_cookie_error_lists_names() {
        let err = BootstrapError::MissingCookies(vec![String::from("acw_tc")]);
        assert!(err.to_string().contains("acw_tc"));
    }
}
