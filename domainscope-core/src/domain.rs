//! Domain Name Normalization
//!
//! Turns loose user input ("https://WWW.Example.COM:443/path?q=1") into a
//! canonical lowercase domain name, or rejects it as a client error. Invalid
//! input is never silently dropped.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{CoreError, CoreResult};

static DOMAIN_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9.-]+$").unwrap());

/// Normalize raw input into a canonical domain name.
///
/// Strips scheme, path/query/fragment and port, trims surrounding dots and
/// whitespace, lowercases, then validates the character set and requires at
/// least one dot.
pub fn normalize_domain(input: &str) -> CoreResult<String> {
    let mut s = input.trim();

    if let Some(idx) = s.find("://") {
        s = &s[idx + 3..];
    }
    // Everything after the authority part is irrelevant here.
    s = s
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    // Drop a port suffix if present.
    s = s.split(':').next().unwrap_or_default();

    let normalized = s.trim().trim_matches('.').to_lowercase();

    if normalized.is_empty()
        || !normalized.contains('.')
        || !DOMAIN_CHARS.is_match(&normalized)
    {
        return Err(CoreError::invalid_domain(input));
    }

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_domain_passes_through_lowercased() {
        assert_eq!(normalize_domain("Example.COM").unwrap(), "example.com");
    }

    #[test]
    fn test_url_is_stripped_to_host() {
        assert_eq!(
            normalize_domain("https://www.example.com:8443/path?q=1#frag").unwrap(),
            "www.example.com"
        );
    }

    #[test]
    fn test_surrounding_dots_and_whitespace_trimmed() {
        assert_eq!(normalize_domain("  .example.com.  ").unwrap(), "example.com");
    }

    #[test]
    fn test_requires_at_least_one_dot() {
        assert!(normalize_domain("localhost").is_err());
    }

    #[test]
    fn test_rejects_invalid_characters() {
        assert!(normalize_domain("exa mple.com").is_err());
        assert!(normalize_domain("exam_ple.com").is_err());
        assert!(normalize_domain("").is_err());
    }

    #[test]
    fn test_error_carries_original_input() {
        let err = normalize_domain("not a domain").unwrap_err();
        assert_eq!(
            err,
            CoreError::InvalidDomain {
                input: "not a domain".to_string()
            }
        );
    }
}
