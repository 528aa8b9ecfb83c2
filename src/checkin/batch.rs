//! Batch coordination across all configured accounts
//!
//! Accounts are processed strictly sequentially: each one spins up its own
//! browser context during bootstrap, and running them in parallel would
//! multiply resource usage and trip provider-side rate heuristics. One
//! account's failure, whatever its cause, never stops the batch.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::Rng;
use tracing::{error, info};

use super::{AccountOrchestrator, BalanceOutcome};
use crate::config::Config;
use crate::notifications::NotificationManager;
use crate::report::{
    self, balance_fingerprint, AccountEntry, BatchReport, FileStateStore, StateStore,
};
use crate::session::{BrowserBootstrapper, WafBootstrapper};
use crate::utils::truncate_error;

/// Title used for dispatched notifications
const REPORT_TITLE: &str = "Check-in Report";

/// Runs the whole batch and hands the result to reporting collaborators
pub struct BatchCoordinator {
    config: Config,
    bootstrapper: Arc<dyn WafBootstrapper>,
    state: Box<dyn StateStore>,
    notifier: NotificationManager,
}

impl BatchCoordinator {
    /// Create a coordinator with explicit collaborators
    ///
    /// Tests inject a stub bootstrapper, an in-memory state store, and
    /// recording channels here.
    pub fn new(
        config: Config,
        bootstrapper: Arc<dyn WafBootstrapper>,
        state: Box<dyn StateStore>,
        notifier: NotificationManager,
    ) -> Self {
        Self {
            config,
            bootstrapper,
            state,
            notifier,
        }
    }

    /// Create a coordinator with production collaborators
    ///
    /// Browser-backed bootstrap, file-backed fingerprint state, and
    /// env-configured notification channels.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        config.validate()?;
        let state = Box::new(FileStateStore::new(config.run.state_file.clone()));
        Ok(Self::new(
            config,
            Arc::new(BrowserBootstrapper::new()),
            state,
            NotificationManager::from_env(),
        ))
    }

    /// Optional whole-run start delay, desynchronizing scheduled runs
    async fn start_delay(&self) {
        let max = self.config.run.max_start_delay_secs;
        if max == 0 {
            return;
        }

        let delay = rand::thread_rng().gen_range(0..=max);
        info!(delay_secs = delay, "Applying random start delay");
        tokio::time::sleep(std::time::Duration::from_secs(delay)).await;
    }

    /// Process every account and assemble the run report
    ///
    /// Fault isolation is the central property here: any per-account error
    /// is converted into a failure entry and processing continues. The
    /// notification is dispatched whenever at least one entry exists; the
    /// fingerprint comparison is informational only and never gates it.
    pub async fn run(&self) -> BatchReport {
        info!(
            accounts = self.config.accounts.len(),
            providers = self.config.providers.len(),
            "Batch check-in started"
        );

        self.start_delay().await;

        let last_fingerprint = self.state.load_fingerprint();
        let orchestrator = AccountOrchestrator::new(&self.config, self.bootstrapper.as_ref());

        let mut entries = Vec::with_capacity(self.config.accounts.len());
        let mut balances = BTreeMap::new();
        let mut success_count = 0;

        for (index, account) in self.config.accounts.iter().enumerate() {
            let name = account.display_name(index);
            let account_key = format!("account_{}", index + 1);

            match orchestrator.process(account, index).await {
                Ok(outcome) => {
                    if outcome.success {
                        success_count += 1;
                    }

                    let (quota, used_quota) = match outcome.balance.balance() {
                        Some(balance) => {
                            balances.insert(account_key, balance.quota);
                            (Some(balance.quota), Some(balance.used_quota))
                        }
                        None => (None, None),
                    };

                    let note = match (&outcome.check_in_error, &outcome.balance) {
                        (Some(check_in_error), _) => check_in_error.clone(),
                        (None, BalanceOutcome::Unavailable { error }) => error.clone(),
                        (None, BalanceOutcome::Retrieved(_)) => String::from("OK"),
                    };

                    entries.push(AccountEntry {
                        name,
                        success: outcome.success,
                        quota,
                        used_quota,
                        note,
                    });
                }
                Err(err) => {
                    error!(account = %name, error = %err, "Account processing failed");
                    entries.push(AccountEntry {
                        name,
                        success: false,
                        quota: None,
                        used_quota: None,
                        note: truncate_error(&err.to_string()),
                    });
                }
            }
        }

        let fingerprint = if balances.is_empty() {
            None
        } else {
            let current = balance_fingerprint(&balances);
            self.state.save_fingerprint(&current);
            if last_fingerprint.as_deref() != Some(current.as_str()) {
                info!("Balance change detected");
            }
            Some(current)
        };

        let report = BatchReport {
            total: entries.len(),
            entries,
            success_count,
            fingerprint,
            finished_at: chrono::Utc::now(),
        };

        report::append_step_summary(&report);

        if !report.entries.is_empty() {
            self.notifier.dispatch(REPORT_TITLE, &report).await;
        }

        info!(
            success = report.success_count,
            total = report.total,
            "Batch check-in finished"
        );

        report
    }
}
