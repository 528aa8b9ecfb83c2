//! Session credential handling
//!
//! This module parses user-supplied cookie payloads and merges them with
//! bootstrap-acquired WAF cookies into the credential set used for every
//! gateway request.

pub mod bootstrap;

use std::collections::HashMap;

use crate::config::CookiePayload;

pub use bootstrap::{BootstrapError, BrowserBootstrapper, WafBootstrapper};

/// Mapping from cookie name to value
pub type CookieMap = HashMap<String, String>;

/// Parse a cookie payload into a name/value mapping
///
/// Structured mappings pass through unchanged. Semicolon-delimited strings
/// are split tolerantly: whitespace around segments is trimmed, segments
/// without `=` are silently dropped, and the first `=` separates name from
/// value so values may themselves contain `=`.
pub fn parse_cookies(payload: &CookiePayload) -> CookieMap {
    match payload {
        CookiePayload::Map(map) => map.clone(),
        CookiePayload::Raw(raw) => raw
            .split(';')
            .filter_map(|segment| {
                let segment = segment.trim();
                segment.split_once('=').map(|(name, value)| {
                    (name.trim().to_string(), value.trim().to_string())
                })
            })
            .collect(),
    }
}

/// Merge bootstrap-acquired WAF cookies with user-supplied session cookies
///
/// Bootstrap cookies are applied first and user cookies second, so on a name
/// collision the user-supplied value wins. This merge order is a contract:
/// user configuration must be able to pin any cookie the bootstrap would
/// otherwise control.
pub fn merge_cookies(bootstrap: &CookieMap, user: &CookieMap) -> CookieMap {
    let mut merged = bootstrap.clone();
    merged.extend(user.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> CookieMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_raw_cookie_string() {
        let parsed = parse_cookies(&CookiePayload::Raw(String::from("a=1; b=2")));
        assert_eq!(parsed, map(&[("a", "1"), ("b", "2")]));
    }

    #[test]
    fn test_parse_drops_malformed_segments() {
        let parsed = parse_cookies(&CookiePayload::Raw(String::from("a=1; garbage; b=2;")));
        assert_eq!(parsed, map(&[("a", "1"), ("b", "2")]));
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let parsed = parse_cookies(&CookiePayload::Raw(String::from("  a = 1 ;b= 2 ")));
        assert_eq!(parsed, map(&[("a", "1"), ("b", "2")]));
    }

    #[test]
    fn test_parse_keeps_equals_in_value() {
        let parsed = parse_cookies(&CookiePayload::Raw(String::from("token=ab=cd")));
        assert_eq!(parsed, map(&[("token", "ab=cd")]));
    }

    #[test]
    fn test_parse_map_passthrough() {
        let source = map(&[("session", "xyz")]);
        let parsed = parse_cookies(&CookiePayload::Map(source.clone()));
        assert_eq!(parsed, source);
    }

    #[test]
    fn test_parse_empty_string() {
        let parsed = parse_cookies(&CookiePayload::Raw(String::new()));
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_merge_user_wins_on_collision() {
        let bootstrap = map(&[("acw_tc", "waf-value"), ("shared", "from-waf")]);
        let user = map(&[("session", "abc"), ("shared", "from-user")]);

        let merged = merge_cookies(&bootstrap, &user);

        assert_eq!(merged.get("acw_tc").unwrap(), "waf-value");
        assert_eq!(merged.get("session").unwrap(), "abc");
        assert_eq!(merged.get("shared").unwrap(), "from-user");
    }

    #[test]
    fn test_merge_with_empty_bootstrap() {
        let user = map(&[("session", "abc")]);
        let merged = merge_cookies(&CookieMap::new(), &user);
        assert_eq!(merged, user);
    }
}
