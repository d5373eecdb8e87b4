//! Quality Scorer (C4, UC1): rule-based 5W1H scoring of an extracted
//! article into an integer 0-100. Pure, never raises.

use crate::types::{ExtractedArticle, QualityBreakdown, QualityReport};
use url::Url;

/// `score(article, raw_url) -> QualityReport`. Title 20, body 60, date
/// 10, url 10; optional author/category contribute at most 10 total.
pub fn score(article: &ExtractedArticle, raw_url: &str) -> QualityReport {
    let title_points = title_score(article.title.as_deref());
    let body_points = body_score(article.body.as_deref());
    let date_points = date_score(article.date.as_deref());
    let url_points = url_score(raw_url);

    let breakdown = QualityBreakdown {
        title: title_points,
        body: body_points,
        date: date_points,
        url: url_points,
        category: None,
        author: None,
    };

    let total = title_points + body_points + date_points + url_points;
    let reason = if total < 80 {
        dominant_failure(&breakdown)
    } else {
        "ok".to_string()
    };

    QualityReport {
        score: total,
        breakdown,
        reason,
    }
}

fn title_score(title: Option<&str>) -> u32 {
    match title.map(str::len) {
        Some(len) if len >= 10 => 20,
        Some(len) if len >= 5 => 10,
        _ => 0,
    }
}

fn body_score(body: Option<&str>) -> u32 {
    match body.map(str::len) {
        Some(len) if len >= 100 => 60,
        Some(len) if len >= 50 => 36, // 0.6x
        Some(len) if len > 0 => 12,   // 0.2x
        _ => 0,
    }
}

fn date_score(date: Option<&str>) -> u32 {
    match date {
        Some(d) if crate::patterns::looks_like_date(d) => 10,
        _ => 0,
    }
}

fn url_score(raw_url: &str) -> u32 {
    match Url::parse(raw_url) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => 10,
        _ => 0,
    }
}

fn dominant_failure(breakdown: &QualityBreakdown) -> String {
    let deficits = [
        ("title", 20u32.saturating_sub(breakdown.title)),
        ("body", 60u32.saturating_sub(breakdown.body)),
        ("date", 10u32.saturating_sub(breakdown.date)),
        ("url", 10u32.saturating_sub(breakdown.url)),
    ];
    let (name, _) = deficits
        .into_iter()
        .max_by_key(|(_, deficit)| *deficit)
        .unwrap_or(("title", 0));
    format!("{name} below threshold")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ExtractionMethod;
    use chrono::Utc;

    fn article(title: &str, body: &str, date: &str) -> ExtractedArticle {
        ExtractedArticle {
            title: Some(title.to_string()),
            body: Some(body.to_string()),
            date: Some(date.to_string()),
            url: "https://example.com/a".to_string(),
            site: "example".to_string(),
            extracted_at: Utc::now(),
            extraction_method: ExtractionMethod::Rule,
        }
    }

    #[test]
    fn test_perfect_article_scores_100() {
        let a = article(
            "A Sufficiently Long Headline",
            &"word ".repeat(30),
            "2024-03-15T10:00:00Z",
        );
        let report = score(&a, "https://example.com/a");
        assert_eq!(report.score, 100);
        assert_eq!(report.reason, "ok");
    }

    #[test]
    fn test_missing_body_fails_gate() {
        let mut a = article("A Sufficiently Long Headline", "", "2024-03-15T10:00:00Z");
        a.body = None;
        let report = score(&a, "https://example.com/a");
        assert!(report.score < 80);
        assert_eq!(report.reason, "body below threshold");
    }

    #[test]
    fn test_non_iso_but_pattern_date_scores_full() {
        let a = article("A Sufficiently Long Headline", &"word ".repeat(30), "Published 2024-03-15 edition");
        let report = score(&a, "https://example.com/a");
        assert_eq!(report.breakdown.date, 10);
    }

    #[test]
    fn test_invalid_url_scores_zero() {
        let a = article("A Sufficiently Long Headline", &"word ".repeat(30), "2024-03-15");
        let report = score(&a, "not-a-url");
        assert_eq!(report.breakdown.url, 0);
    }

    #[test]
    fn test_never_panics_on_all_none() {
        let a = ExtractedArticle {
            title: None,
            body: None,
            date: None,
            url: "".to_string(),
            site: "example".to_string(),
            extracted_at: Utc::now(),
            extraction_method: ExtractionMethod::Rule,
        };
        let report = score(&a, "");
        assert_eq!(report.score, 0);
    }
}
