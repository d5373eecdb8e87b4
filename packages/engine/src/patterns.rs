//! Shared text heuristics used by the Metadata Extractor, DOM Analyzer,
//! and Selector Evaluator: date recognition in particular needs to agree
//! across all three so that the same document scores identically no
//! matter which component looked at it.

use chrono::DateTime;
use once_cell::sync::Lazy;
use regex::Regex;

/// Matches a bare year-month-day pattern, e.g. `2024-03-15` or
/// `2024/03/15`, independent of surrounding text.
static YEAR_MONTH_DAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(19|20)\d{2}[-/](0[1-9]|1[0-2])[-/](0[1-9]|[12]\d|3[01])\b").unwrap());

/// True if `text` parses as RFC 3339 or contains a recognizable
/// year-month-day pattern.
pub fn looks_like_date(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return false;
    }
    if DateTime::parse_from_rfc3339(trimmed).is_ok() {
        return true;
    }
    YEAR_MONTH_DAY.is_match(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso_date() {
        assert!(looks_like_date("2024-03-15T10:00:00Z"));
    }

    #[test]
    fn test_year_month_day() {
        assert!(looks_like_date("Published 2024-03-15"));
        assert!(looks_like_date("2024/03/15"));
    }

    #[test]
    fn test_not_a_date() {
        assert!(!looks_like_date("hello world"));
        assert!(!looks_like_date(""));
    }
}
