//! DOM Analyzer (C2): ranked candidate selectors per field from DOM
//! statistics (tag frequency, text length, date regex, semantic tags).

use crate::css;
use crate::patterns::looks_like_date;
use crate::types::{Candidate, DomCandidates};
use scraper::{Html, Selector as CssSelector};

const TITLE_TAGS: [(&str, f32); 3] = [("h1", 0.95), ("h2", 0.85), ("h3", 0.85)];
const BODY_TAGS: [&str; 4] = ["article", "main", "section", "div"];
const MAX_CANDIDATES: usize = 3;

/// Produce ranked candidate selectors per field from a parsed DOM.
/// Output is deterministic given input.
pub fn analyze(html: &str) -> DomCandidates {
    let document = Html::parse_document(html);
    DomCandidates {
        title: analyze_title(&document),
        body: analyze_body(&document),
        date: analyze_date(&document),
    }
}

fn analyze_title(document: &Html) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    for (tag, confidence) in TITLE_TAGS {
        let Ok(selector) = CssSelector::parse(tag) else {
            continue;
        };
        for (i, element) in document.select(&selector).enumerate() {
            let text: String = element.text().collect::<String>().trim().to_string();
            let len = text.chars().count();
            if (5..=500).contains(&len) {
                candidates.push(Candidate {
                    selector: css::with_nth(tag, i + 1),
                    confidence,
                });
            }
            if candidates.len() >= MAX_CANDIDATES {
                return candidates;
            }
        }
    }
    candidates
}

fn analyze_body(document: &Html) -> Vec<Candidate> {
    struct Scored {
        selector: String,
        tag_rank: usize,
        confidence: f32,
        paragraph_density: f32,
    }

    let mut scored = Vec::new();
    for (tag_rank, tag) in BODY_TAGS.iter().enumerate() {
        let Ok(selector) = CssSelector::parse(tag) else {
            continue;
        };
        let Ok(paragraph_selector) = CssSelector::parse("p") else {
            continue;
        };
        for (i, element) in document.select(&selector).enumerate() {
            let text: String = element.text().collect::<String>().trim().to_string();
            let len = text.chars().count();
            if len < 300 {
                continue;
            }
            let confidence = (len as f32 / 2000.0).min(1.0);
            let paragraph_count = element.select(&paragraph_selector).count();
            let paragraph_density = paragraph_count as f32 / (len as f32).max(1.0);
            scored.push(Scored {
                selector: css::with_nth(tag, i + 1),
                tag_rank,
                confidence,
                paragraph_density,
            });
        }
    }

    scored.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.tag_rank.cmp(&b.tag_rank))
            .then(
                b.paragraph_density
                    .partial_cmp(&a.paragraph_density)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    });

    scored
        .into_iter()
        .take(MAX_CANDIDATES)
        .map(|s| Candidate {
            selector: s.selector,
            confidence: s.confidence,
        })
        .collect()
}

fn analyze_date(document: &Html) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    if let Ok(selector) = CssSelector::parse("time[datetime]") {
        for (i, element) in document.select(&selector).enumerate() {
            candidates.push(Candidate {
                selector: css::with_nth("time[datetime]", i + 1),
                confidence: 1.0,
            });
            if candidates.len() >= MAX_CANDIDATES {
                return candidates;
            }
        }
    }

    if meta_published_time(document).is_some() && candidates.len() < MAX_CANDIDATES {
        candidates.push(Candidate {
            selector: "meta:article:published_time".to_string(),
            confidence: 1.0,
        });
    }

    if candidates.len() < MAX_CANDIDATES {
        for tag in ["span", "div", "p"] {
            let Ok(selector) = CssSelector::parse(tag) else {
                continue;
            };
            for (i, element) in document.select(&selector).enumerate() {
                let text: String = element.text().collect::<String>().trim().to_string();
                if looks_like_date(&text) {
                    candidates.push(Candidate {
                        selector: css::with_nth(tag, i + 1),
                        confidence: 0.7,
                    });
                }
                if candidates.len() >= MAX_CANDIDATES {
                    return candidates;
                }
            }
        }
    }

    candidates
}

fn meta_published_time(document: &Html) -> Option<String> {
    let selector = CssSelector::parse(r#"meta[property="article:published_time"]"#).ok()?;
    document
        .select(&selector)
        .find_map(|el| el.value().attr("content"))
        .map(str::to_string)
}
