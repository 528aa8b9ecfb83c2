//! Run reports, balance fingerprinting, and step summaries
//!
//! A [`BatchReport`] collects one entry per processed account and renders
//! both the Markdown table (machine-visible step summary) and the free-text
//! summary used by push notifications. The balance fingerprint is a short
//! digest over the retrieved balances, used only to log whether anything
//! changed since the previous run.

pub mod state;

use std::collections::BTreeMap;
use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::utils::format_amount;

pub use state::{FileStateStore, MemoryStateStore, StateStore};

/// One account's line in the run report
#[derive(Debug, Clone, Serialize)]
pub struct AccountEntry {
    /// Display name
    pub name: String,
    /// Overall per-account success
    pub success: bool,
    /// Scaled remaining quota, when retrieved
    pub quota: Option<f64>,
    /// Scaled used quota, when retrieved
    pub used_quota: Option<f64>,
    /// Short status or error note
    pub note: String,
}

/// Aggregated result of one batch run
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// Per-account entries, in processing order
    pub entries: Vec<AccountEntry>,
    /// Number of accounts whose check-in succeeded
    pub success_count: usize,
    /// Total accounts processed
    pub total: usize,
    /// Fingerprint over this run's balances, when any were retrieved
    pub fingerprint: Option<String>,
    /// When the run finished
    pub finished_at: DateTime<Utc>,
}

impl BatchReport {
    /// Render the Markdown summary table
    pub fn markdown_table(&self) -> String {
        let mut markdown = String::from("### Check-in results\n\n");
        markdown.push_str("| Account | Status | Balance | Used | Note |\n");
        markdown.push_str("| :--- | :---: | :---: | :---: | :--- |\n");

        for entry in &self.entries {
            let status = if entry.success { "✅" } else { "❌" };
            let quota = entry
                .quota
                .map(|v| format!("${}", format_amount(v)))
                .unwrap_or_else(|| String::from("-"));
            let used = entry
                .used_quota
                .map(|v| format!("${}", format_amount(v)))
                .unwrap_or_else(|| String::from("-"));
            markdown.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                entry.name, status, quota, used, entry.note
            ));
        }

        markdown
    }

    /// Render the free-text summary for push notifications
    ///
    /// Every account appears with its status tag, balance line or error
    /// note, so operators can diagnose failures from the notification
    /// alone.
    pub fn text_summary(&self) -> String {
        let mut blocks = Vec::with_capacity(self.entries.len() + 1);

        for entry in &self.entries {
            let tag = if entry.success { "[SUCCESS]" } else { "[FAIL]" };
            let mut block = format!("{tag} {}", entry.name);

            if let (Some(quota), Some(used)) = (entry.quota, entry.used_quota) {
                block.push_str(&format!(
                    "\nCurrent balance: ${}, Used: ${}",
                    format_amount(quota),
                    format_amount(used)
                ));
            }
            if !entry.success || entry.quota.is_none() {
                block.push_str(&format!("\nNote: {}", entry.note));
            }

            blocks.push(block);
        }

        blocks.push(format!(
            "Success: {}/{}\n{}",
            self.success_count,
            self.total,
            self.finished_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));

        blocks.join("\n\n")
    }
}

/// Compute the balance fingerprint for a run
///
/// First 16 hex characters of the SHA-256 digest of the compact JSON
/// encoding of the account-key → quota map. `BTreeMap` iteration is
/// key-sorted, so the digest is independent of insertion order.
pub fn balance_fingerprint(balances: &BTreeMap<String, f64>) -> String {
    let canonical = serde_json::to_string(balances).unwrap_or_default();
    let digest = Sha256::digest(canonical.as_bytes());
    format!("{digest:x}")[..16].to_string()
}

/// Append the Markdown table to the CI step summary file, if designated
///
/// Controlled by the `GITHUB_STEP_SUMMARY` environment variable. Write
/// failures are warnings; the run result never depends on this side
/// channel.
pub fn append_step_summary(report: &BatchReport) {
    let Ok(path) = std::env::var("GITHUB_STEP_SUMMARY") else {
        return;
    };

    let result = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .and_then(|mut file| file.write_all(report.markdown_table().as_bytes()));

    match result {
        Ok(()) => info!("Step summary appended"),
        Err(err) => warn!(error = %err, path = %path, "Failed to write step summary"),
    }
}
