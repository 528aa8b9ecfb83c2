//! gatecheck - Automated multi-account check-in for quota-based API gateways
//!
//! Runs a daily "check-in" action against one or more accounts registered
//! with an API gateway, records the resulting balance, and reports outcomes
//! through notification channels.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Provider profiles, account credentials, and runtime settings
//! - [`session`] - Cookie parsing/merging and WAF cookie bootstrap
//! - [`gateway`] - HTTP client for check-in and balance requests
//! - [`checkin`] - Per-account orchestration and batch coordination
//! - [`report`] - Run summaries, balance fingerprinting, persisted state
//! - [`notifications`] - Fan-out delivery of run reports
//! - [`utils`] - Common helpers
//!
//! # Example
//!
//! ```no_run
//! use gatecheck::checkin::BatchCoordinator;
//! use gatecheck::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let coordinator = BatchCoordinator::from_config(config)?;
//!     let report = coordinator.run().await;
//!     std::process::exit(if report.success_count > 0 { 0 } else { 1 });
//! }
//! ```

pub mod checkin;
pub mod config;
pub mod gateway;
pub mod notifications;
pub mod report;
pub mod session;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::checkin::{AccountOutcome, BalanceOutcome, BatchCoordinator};
    pub use crate::config::{AccountCredential, Config, ProviderProfile};
    pub use crate::gateway::{Balance, GatewayClient};
    pub use crate::report::{BatchReport, StateStore};
    pub use crate::session::WafBootstrapper;
}
