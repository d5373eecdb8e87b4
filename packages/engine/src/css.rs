//! A tiny selector dialect layered on top of `scraper`'s CSS engine.
//!
//! DOM candidates are identified by a plain CSS selector (tag, class, or
//! id) plus an optional `::nth(N)` suffix picking the Nth document-order
//! match (1-indexed) when a tag alone is ambiguous. Selector production
//! (DOM Analyzer) and selector resolution (Selector Evaluator) agree on
//! this dialect exactly, so there is no dependency on `scraper`'s own
//! (and subtly different) `:nth-of-type` semantics.

use scraper::{ElementRef, Html, Selector as CssSelector};

/// Resolve a selector string against a parsed document, returning the
/// matched element (if any).
pub fn resolve<'a>(document: &'a Html, raw: &str) -> Option<ElementRef<'a>> {
    let (base, nth) = split_nth(raw);
    let selector = CssSelector::parse(base).ok()?;
    let mut matches = document.select(&selector);
    match nth {
        Some(n) if n >= 1 => matches.nth(n - 1),
        _ => matches.next(),
    }
}

/// Build the Nth-match selector string for a plain base selector.
pub fn with_nth(base: &str, nth: usize) -> String {
    format!("{base}::nth({nth})")
}

fn split_nth(raw: &str) -> (&str, Option<usize>) {
    if let Some(idx) = raw.rfind("::nth(") {
        if let Some(end) = raw[idx..].find(')') {
            if let Ok(n) = raw[idx + 6..idx + end].parse() {
                return (&raw[..idx], Some(n));
            }
        }
    }
    (raw, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_nth() {
        assert_eq!(split_nth("div::nth(2)"), ("div", Some(2)));
        assert_eq!(split_nth("h1"), ("h1", None));
    }

    #[test]
    fn test_resolve_nth_match() {
        let html = Html::parse_document("<html><body><div>a</div><div>b</div></body></html>");
        let el = resolve(&html, &with_nth("div", 2)).unwrap();
        assert_eq!(el.text().collect::<String>(), "b");
    }
}
