//! Single-account check-in sequence
//!
//! Strictly ordered, one pass, no retries. The first three stages
//! (provider resolution, credential parsing, session bootstrap) abort the
//! account on failure; check-in and balance fetch never do, because a
//! balance reading is useful even when the check-in was rejected (for
//! example when the account already checked in today).

use std::time::Duration;

use tracing::{info, warn};

use super::{AccountError, AccountOutcome, BalanceOutcome};
use crate::config::{AccountCredential, Config};
use crate::gateway::GatewayClient;
use crate::session::{merge_cookies, parse_cookies, CookieMap, WafBootstrapper};
use crate::utils::truncate_error;

/// Pause between a successful check-in write and the balance read, giving
/// the gateway time to settle the new quota
const SETTLE_DELAY: Duration = Duration::from_secs(1);

/// Runs one account through the check-in sequence
pub struct AccountOrchestrator<'a> {
    config: &'a Config,
    bootstrapper: &'a dyn WafBootstrapper,
}

impl<'a> AccountOrchestrator<'a> {
    /// Create an orchestrator over shared configuration and a bootstrapper
    pub fn new(config: &'a Config, bootstrapper: &'a dyn WafBootstrapper) -> Self {
        Self {
            config,
            bootstrapper,
        }
    }

    /// Process one account end to end
    ///
    /// Returns an [`AccountOutcome`] when the account reached the check-in
    /// stage, or an [`AccountError`] describing which earlier stage failed.
    pub async fn process(
        &self,
        account: &AccountCredential,
        index: usize,
    ) -> Result<AccountOutcome, AccountError> {
        let name = account.display_name(index);
        info!(account = %name, provider = %account.provider, "Starting account processing");

        let profile = self
            .config
            .get_provider(&account.provider)
            .ok_or_else(|| AccountError::UnknownProvider(account.provider.clone()))?;

        let user_cookies = parse_cookies(&account.cookies);
        if user_cookies.is_empty() {
            return Err(AccountError::InvalidCookies);
        }

        let waf_cookies = if profile.needs_waf_cookies() {
            self.bootstrapper
                .acquire(&name, &profile.login_url(), &profile.waf_cookie_names)
                .await?
        } else {
            info!(account = %name, "WAF bypass not required, using user cookies directly");
            CookieMap::new()
        };

        let session = merge_cookies(&waf_cookies, &user_cookies);

        let client = GatewayClient::new(
            profile.clone(),
            &account.api_user,
            &session,
            self.config.request_timeout(),
        )
        .map_err(|err| AccountError::Unexpected(err.into()))?;

        let mut check_in_error = None;
        if profile.needs_explicit_check_in() {
            match client.check_in(&name).await {
                Ok(()) => {
                    // Let the gateway settle before reading the balance
                    tokio::time::sleep(SETTLE_DELAY).await;
                }
                Err(err) => {
                    warn!(account = %name, error = %err, "Check-in failed");
                    check_in_error = Some(format!(
                        "Check-in failed: {}",
                        truncate_error(&err.to_string())
                    ));
                }
            }
        } else {
            info!(account = %name, "Explicit check-in skipped (auto trigger)");
        }

        let balance = match client.fetch_balance(&name).await {
            Ok(balance) => {
                info!(account = %name, "{}", balance.display());
                BalanceOutcome::Retrieved(balance)
            }
            Err(err) => {
                let error = format!(
                    "Failed to get user info: {}",
                    truncate_error(&err.to_string())
                );
                warn!(account = %name, "{error}");
                BalanceOutcome::Unavailable { error }
            }
        };

        // For auto-check-in providers any authenticated request triggers the
        // check-in, so reaching this point already counts as success
        let success = if profile.needs_explicit_check_in() {
            check_in_error.is_none()
        } else {
            true
        };

        Ok(AccountOutcome {
            success,
            check_in_error,
            balance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CookiePayload, ProviderProfile, RunConfig};
    use crate::session::BootstrapError;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct FailingBootstrapper;

    #[async_trait]
    impl WafBootstrapper for FailingBootstrapper {
        async fn acquire(
            &self,
            _account: &str,
            _login_url: &str,
            required: &[String],
        ) -> Result<CookieMap, BootstrapError> {
            Err(BootstrapError::MissingCookies(required.to_vec()))
        }
    }

    fn config_with(profile: ProviderProfile, account: AccountCredential) -> Config {
        let mut providers = HashMap::new();
        providers.insert(account.provider.clone(), profile);
        Config {
            providers,
            accounts: vec![account],
            run: RunConfig::default(),
        }
    }

    fn account(cookies: CookiePayload) -> AccountCredential {
        AccountCredential {
            provider: String::from("test"),
            api_user: String::from("1"),
            cookies,
            name: None,
        }
    }

    fn profile(waf: Vec<String>) -> ProviderProfile {
        ProviderProfile {
            domain: String::from("http://localhost:1"),
            login_path: String::from("/login"),
            sign_in_path: String::from("/api/user/sign_in"),
            user_info_path: String::from("/api/user/self"),
            api_user_header: String::from("new-api-user"),
            auto_check_in: false,
            waf_cookie_names: waf,
        }
    }

    #[tokio::test]
    async fn test_unknown_provider_aborts_account() {
        let mut config = config_with(
            profile(vec![]),
            account(CookiePayload::Raw(String::from("a=1"))),
        );
        config.accounts[0].provider = String::from("other");

        let bootstrapper = FailingBootstrapper;
        let orchestrator = AccountOrchestrator::new(&config, &bootstrapper);
        let result = orchestrator.process(&config.accounts[0], 0).await;

        assert!(matches!(result, Err(AccountError::UnknownProvider(_))));
    }

    #[tokio::test]
    async fn test_empty_cookie_payload_aborts_account() {
        let config = config_with(
            profile(vec![]),
            account(CookiePayload::Raw(String::from("no-equals-here"))),
        );

        let bootstrapper = FailingBootstrapper;
        let orchestrator = AccountOrchestrator::new(&config, &bootstrapper);
        let result = orchestrator.process(&config.accounts[0], 0).await;

        assert!(matches!(result, Err(AccountError::InvalidCookies)));
    }

    #[tokio::test]
    async fn test_bootstrap_failure_aborts_before_any_request() {
        let config = config_with(
            profile(vec![String::from("acw_tc")]),
            account(CookiePayload::Raw(String::from("session=abc"))),
        );

        let bootstrapper = FailingBootstrapper;
        let orchestrator = AccountOrchestrator::new(&config, &bootstrapper);
        let result = orchestrator.process(&config.accounts[0], 0).await;

        // The domain is unroutable, so reaching the network would error
        // differently; a Bootstrap error proves no request was attempted
        assert!(matches!(result, Err(AccountError::Bootstrap(_))));
    }
}
