//! Metadata Extractor (C1): Schema.org JSON-LD and Open Graph / article
//! meta tags, used both as UC1's structured-data path and as UC3's fast
//! path.

use crate::patterns::looks_like_date;
use crate::types::{MetadataCandidate, MetadataSource};
use scraper::{Html, Selector};
use serde_json::Value;

/// Parse embedded structured metadata from raw HTML.
///
/// Tries, in order: (a) `<script type="application/ld+json">` blocks
/// typed as an article/news kind, merging multiple blocks by
/// first-non-null-wins per field; (b) Open Graph / article meta tags.
/// Falls through on malformed JSON-LD. Returns a zero-quality candidate
/// if neither source yields a title.
pub fn extract(raw_html: &str) -> MetadataCandidate {
    let document = Html::parse_document(raw_html);

    if let Some(candidate) = from_json_ld(&document) {
        if candidate.title.is_some() {
            return candidate;
        }
    }

    from_meta_tags(&document)
}

fn from_json_ld(document: &Html) -> Option<MetadataCandidate> {
    let (title, body, date) = json_ld_fields(document)?;
    let quality = score(&title, &body, &date);
    Some(MetadataCandidate {
        title,
        body,
        date,
        source: Some(MetadataSource::JsonLd),
        quality,
    })
}

/// Extract `(title, body, date)` from any article/news-typed JSON-LD
/// block, merging multiple blocks first-non-null-wins. Returns `None`
/// if no structured block declares an article/news type at all (as
/// opposed to declaring one but yielding empty fields).
fn json_ld_fields(document: &Html) -> Option<(Option<String>, Option<String>, Option<String>)> {
    let script_selector = Selector::parse(r#"script[type="application/ld+json"]"#).ok()?;

    let mut title = None;
    let mut body = None;
    let mut date = None;
    let mut found_any = false;

    for script in document.select(&script_selector) {
        let text: String = script.text().collect();
        let Ok(value) = serde_json::from_str::<Value>(&text) else {
            continue;
        };
        for object in flatten_json_ld(&value) {
            if !is_article_type(&object) {
                continue;
            }
            found_any = true;
            if title.is_none() {
                title = string_field(&object, &["headline", "name"]);
            }
            if body.is_none() {
                body = string_field(&object, &["articleBody", "description"]);
            }
            if date.is_none() {
                date = string_field(&object, &["datePublished", "dateCreated"]);
            }
        }
    }

    if !found_any {
        return None;
    }

    Some((title, body, date))
}

/// `@graph` arrays and top-level arrays both need flattening; a single
/// object flattens to itself.
fn flatten_json_ld(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.iter().flat_map(flatten_json_ld).collect(),
        Value::Object(map) => {
            if let Some(graph) = map.get("@graph") {
                flatten_json_ld(graph)
            } else {
                vec![value.clone()]
            }
        }
        _ => Vec::new(),
    }
}

fn is_article_type(value: &Value) -> bool {
    let Some(type_field) = value.get("@type") else {
        return false;
    };
    let types: Vec<String> = match type_field {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect(),
        _ => return false,
    };
    types
        .iter()
        .any(|t| t.to_lowercase().contains("article") || t.to_lowercase().contains("news"))
}

fn string_field(value: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(s) = value.get(*key).and_then(Value::as_str) {
            if !s.trim().is_empty() {
                return Some(s.trim().to_string());
            }
        }
    }
    None
}

fn from_meta_tags(document: &Html) -> MetadataCandidate {
    let title = meta_content(document, "og:title").or_else(|| meta_content(document, "twitter:title"));
    let body = meta_content(document, "og:description");
    let date = meta_content(document, "article:published_time");

    let quality = score(&title, &body, &date);
    MetadataCandidate {
        title,
        body,
        date,
        source: Some(MetadataSource::Meta),
        quality,
    }
}

/// Resolve a `meta:` sentinel key against document head metadata.
/// Shared with the Selector Evaluator so that `meta:`-prefixed
/// selectors are always resolved the same way regardless of which
/// component asks. A `json-ld:title|body|date` key resolves against
/// structured data instead of a literal meta tag, so UC3's fast-path
/// synthesized `SelectorSet` (source `json-ld`) stays resolvable on
/// later UC1 runs even though nothing named `json-ld` appears as an
/// actual `<meta>` element.
pub fn meta_value(document: &Html, key: &str) -> Option<String> {
    if let Some(field) = key.strip_prefix("json-ld:") {
        let (title, body, date) = json_ld_fields(document)?;
        return match field {
            "title" => title,
            "body" => body,
            "date" => date,
            _ => None,
        };
    }
    meta_content(document, key)
}

fn meta_content(document: &Html, property: &str) -> Option<String> {
    let selector = Selector::parse(&format!(
        r#"meta[property="{property}"], meta[name="{property}"]"#
    ))
    .ok()?;
    document
        .select(&selector)
        .find_map(|el| el.value().attr("content"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// `quality = 0.3*hasTitle(>=10 chars) + 0.5*hasBody(>=100 chars) +
/// 0.2*hasDate(ISO or recognizable pattern)`
fn score(title: &Option<String>, body: &Option<String>, date: &Option<String>) -> f32 {
    let has_title = title.as_deref().map(|s| s.len() >= 10).unwrap_or(false);
    let has_body = body.as_deref().map(|s| s.len() >= 100).unwrap_or(false);
    let has_date = date.as_deref().map(looks_like_date).unwrap_or(false);

    let mut quality = 0.0;
    if has_title {
        quality += 0.3;
    }
    if has_body {
        quality += 0.5;
    }
    if has_date {
        quality += 0.2;
    }
    quality
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_ld_article() {
        let body = "x".repeat(120);
        let html = format!(
            r#"<html><head><script type="application/ld+json">
            {{"@type": "NewsArticle", "headline": "A Long Enough Headline",
             "articleBody": "{body}",
             "datePublished": "2024-03-15T10:00:00Z"}}
        </script></head><body></body></html>"#
        );
        let candidate = extract(&html);
        assert_eq!(candidate.title.as_deref(), Some("A Long Enough Headline"));
        assert!(candidate.quality > 0.9);
    }

    #[test]
    fn test_meta_value_json_ld_sentinel() {
        let html = r#"<html><head><script type="application/ld+json">
            {"@type": "NewsArticle", "headline": "A Long Enough Headline"}
        </script></head><body></body></html>"#;
        let document = Html::parse_document(html);
        assert_eq!(meta_value(&document, "json-ld:title").as_deref(), Some("A Long Enough Headline"));
        assert_eq!(meta_value(&document, "json-ld:body"), None);
    }

    #[test]
    fn test_malformed_json_ld_falls_through_to_meta() {
        let html = r#"<html><head>
            <script type="application/ld+json">{not valid json</script>
            <meta property="og:title" content="Fallback Title Here">
        </head><body></body></html>"#;
        let candidate = extract(html);
        assert_eq!(candidate.title.as_deref(), Some("Fallback Title Here"));
        assert_eq!(candidate.source, Some(MetadataSource::Meta));
    }

    #[test]
    fn test_no_candidate_zero_quality() {
        let html = "<html><head></head><body><p>nothing</p></body></html>";
        let candidate = extract(html);
        assert!(candidate.title.is_none());
        assert_eq!(candidate.quality, 0.0);
    }

    #[test]
    fn test_multiple_blocks_merge_first_non_null_wins() {
        let html = r#"<html><head>
            <script type="application/ld+json">{"@type":"Article","headline":"First Headline Wins"}</script>
            <script type="application/ld+json">{"@type":"Article","headline":"Second Headline","datePublished":"2024-01-01"}</script>
        </head><body></body></html>"#;
        let candidate = extract(html);
        assert_eq!(candidate.title.as_deref(), Some("First Headline Wins"));
        assert_eq!(candidate.date.as_deref(), Some("2024-01-01"));
    }
}
