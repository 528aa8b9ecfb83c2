//! Per-account check-in orchestration and batch coordination
//!
//! The orchestrator runs one account through a strictly ordered sequence:
//! resolve provider, parse credentials, bootstrap the session, check in,
//! fetch the balance. The batch coordinator fans that out over all
//! configured accounts with per-account fault isolation.

pub mod batch;
pub mod orchestrator;

use thiserror::Error;

use crate::gateway::Balance;
use crate::session::BootstrapError;

pub use batch::BatchCoordinator;
pub use orchestrator::AccountOrchestrator;

/// Errors that abort one account before its check-in is attempted
///
/// All of these are account-scoped: the batch records them as a failure
/// entry and moves on to the next account.
#[derive(Error, Debug)]
pub enum AccountError {
    /// Account references a provider name absent from the configuration
    #[error("Provider '{0}' not found in configuration")]
    UnknownProvider(String),

    /// Cookie payload parsed to nothing usable
    #[error("Invalid cookie configuration format")]
    InvalidCookies,

    /// Required WAF cookies could not be acquired
    #[error("Unable to get WAF cookies: {0}")]
    Bootstrap(#[from] BootstrapError),

    /// Anything not anticipated above
    #[error("{0}")]
    Unexpected(#[from] anyhow::Error),
}

/// Balance state recorded for one account after its run
#[derive(Debug, Clone)]
pub enum BalanceOutcome {
    /// Balance request succeeded
    Retrieved(Balance),
    /// Balance request failed; carries a truncated diagnostic
    Unavailable {
        /// Short human-readable reason
        error: String,
    },
}

impl BalanceOutcome {
    /// The retrieved balance, if any
    pub fn balance(&self) -> Option<Balance> {
        match self {
            Self::Retrieved(balance) => Some(*balance),
            Self::Unavailable { .. } => None,
        }
    }
}

/// Final result for one account that reached the check-in stage
///
/// `success` reflects the check-in outcome for explicit providers and is
/// always true for gateway-automatic ones. The balance is recorded
/// independently: it is valuable even when the check-in itself failed.
#[derive(Debug, Clone)]
pub struct AccountOutcome {
    /// Overall per-account success flag
    pub success: bool,
    /// Diagnostic from a failed explicit check-in, already truncated
    pub check_in_error: Option<String>,
    /// Balance fetch result
    pub balance: BalanceOutcome,
}
