//! Common utilities and helper functions
//!
//! This module provides shared utilities used across the application.

/// Maximum length of error text surfaced in summaries and notifications
pub const ERROR_DISPLAY_LIMIT: usize = 50;

/// Truncate error text for display, appending an ellipsis when shortened
///
/// Diagnostic strings from the gateway or the network stack can be long;
/// summaries and push notifications keep them to [`ERROR_DISPLAY_LIMIT`]
/// characters so a single bad account cannot flood the report.
pub fn truncate_error(text: &str) -> String {
    if text.chars().count() <= ERROR_DISPLAY_LIMIT {
        return text.to_string();
    }

    let truncated: String = text.chars().take(ERROR_DISPLAY_LIMIT).collect();
    format!("{truncated}...")
}

/// Format a scaled quota amount the way the gateway UI shows it
///
/// Two decimal places with trailing zeros trimmed, but always at least one
/// digit after the point: `2.0`, `1.5`, `1.25`.
pub fn format_amount(value: f64) -> String {
    let mut text = format!("{value:.2}");
    if text.ends_with('0') {
        text.pop();
    }
    text
}
