//! # String Format Predicates
//!
//! Pure predicates keyed by [`StringFormat`]. [`check`] returns `None` for
//! formats it does not understand so that the validator can skip them
//! instead of rejecting documents written for a newer dialect.

use chrono::DateTime;
use lex_core::{validate_label, Nsid};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::StringFormat;

/// Maximum length of a handle.
const MAX_HANDLE_LEN: usize = 253;

/// Simplified BCP-47 `xx[-Xxxx][-XX]`: two-letter language, optional
/// four-letter script, optional two-letter region.
static LANGUAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z]{2}(-[A-Za-z]{4})?(-[A-Za-z]{2})?$").expect("language tag pattern compiles")
});

/// Whether `value` satisfies `format`. `None` for unrecognised formats.
pub fn check(format: &StringFormat, value: &str) -> Option<bool> {
    let ok = match format {
        StringFormat::Datetime => is_datetime(value),
        StringFormat::Uri => is_uri(value),
        StringFormat::AtUri => value.starts_with("at://"),
        StringFormat::Did => value.starts_with("did:"),
        StringFormat::Handle => is_handle(value),
        StringFormat::AtIdentifier => value.starts_with("did:") || is_handle(value),
        StringFormat::Nsid => Nsid::parse(value).is_ok(),
        StringFormat::Cid => is_cid(value),
        StringFormat::Language => LANGUAGE_RE.is_match(value),
        StringFormat::Other(_) => return None,
    };
    Some(ok)
}

/// An RFC 3339 timestamp with an explicit offset.
pub fn is_datetime(value: &str) -> bool {
    DateTime::parse_from_rfc3339(value).is_ok()
}

/// An absolute URI (has a scheme).
pub fn is_uri(value: &str) -> bool {
    url::Url::parse(value).is_ok()
}

/// A domain-like name of at least two labels.
pub fn is_handle(value: &str) -> bool {
    if value.len() > MAX_HANDLE_LEN {
        return false;
    }
    let labels: Vec<&str> = value.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|label| validate_label(label).is_ok())
}

/// A content identifier in its string encoding.
pub fn is_cid(value: &str) -> bool {
    (8..=256).contains(&value.len()) && value.chars().all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datetime() {
        assert!(is_datetime("2024-01-15T10:30:00Z"));
        assert!(is_datetime("2024-01-15T10:30:00.123+05:30"));
        assert!(!is_datetime("2024-01-15"));
        assert!(!is_datetime("2024-13-45T10:30:00Z"));
        assert!(!is_datetime("yesterday"));
    }

    #[test]
    fn test_uri() {
        assert!(is_uri("https://example.com/path?q=1"));
        assert!(is_uri("mailto:someone@example.com"));
        assert!(!is_uri("/relative/path"));
        assert!(!is_uri("not a uri"));
    }

    #[test]
    fn test_handle() {
        assert!(is_handle("alice.example.com"));
        assert!(is_handle("a-b.example"));
        assert!(!is_handle("localhost"), "single label rejected");
        assert!(!is_handle("-alice.example.com"));
        assert!(!is_handle("alice..com"));
        assert!(!is_handle(&format!("{}.com", "a".repeat(64))));
    }

    #[test]
    fn test_at_identifier() {
        let fmt = StringFormat::AtIdentifier;
        assert_eq!(check(&fmt, "did:plc:abc123"), Some(true));
        assert_eq!(check(&fmt, "alice.example.com"), Some(true));
        assert_eq!(check(&fmt, "alice"), Some(false));
    }

    #[test]
    fn test_prefix_formats() {
        assert_eq!(check(&StringFormat::AtUri, "at://did:plc:abc/app.post/1"), Some(true));
        assert_eq!(check(&StringFormat::AtUri, "https://x"), Some(false));
        assert_eq!(check(&StringFormat::Did, "did:web:example.com"), Some(true));
        assert_eq!(check(&StringFormat::Did, "plc:abc"), Some(false));
    }

    #[test]
    fn test_nsid_and_cid() {
        assert_eq!(check(&StringFormat::Nsid, "com.example.feed.post"), Some(true));
        assert_eq!(check(&StringFormat::Nsid, "com.example"), Some(false));
        assert_eq!(
            check(&StringFormat::Cid, "bafyreie5737gdxlw5i64vzichcalba3z2v5n6icifvx5xytvske7mr3hpm"),
            Some(true)
        );
        assert_eq!(check(&StringFormat::Cid, "short"), Some(false));
        assert_eq!(check(&StringFormat::Cid, "has spaces in it"), Some(false));
    }

    #[test]
    fn test_language() {
        for ok in ["en", "en-US", "pt-br", "zh-Hant", "zh-Hant-TW"] {
            assert_eq!(check(&StringFormat::Language, ok), Some(true), "{ok}");
        }
        for bad in ["e", "english", "en_US", "en-", "en-USA1", "haw", "es-419", "en-Latn-USA", "en-US-Latn"] {
            assert_eq!(check(&StringFormat::Language, bad), Some(false), "{bad}");
        }
    }

    #[test]
    fn test_unknown_format_skipped() {
        assert_eq!(check(&StringFormat::Other("tid".into()), "anything"), None);
    }
}
