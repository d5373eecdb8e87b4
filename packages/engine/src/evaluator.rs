//! Selector Evaluator (C3): resolves a `SelectorSet` against a DOM and
//! scores the result. Used both to score UC1's reused selectors and to
//! score a Proposer's candidate selectors before consensus.

use crate::css;
use crate::metadata::meta_value;
use crate::patterns::looks_like_date;
use crate::types::{ExtractionReport, Selector, SelectorSet};
use scraper::Html;

/// Resolve every field of `selectors` against `html` and score the
/// result. Never panics: an unresolvable field simply scores zero.
pub fn evaluate(html: &str, selectors: &SelectorSet) -> ExtractionReport {
    let document = Html::parse_document(html);

    let title = resolve_field(&document, &selectors.title, false);
    let body = resolve_field(&document, &selectors.body, false);
    let date = resolve_field(&document, &selectors.date, true);

    let title_quality = score_title(&title);
    let body_quality = score_body(&body);
    let date_quality = score_date(&date);
    let combined = 0.3 * title_quality + 0.5 * body_quality + 0.2 * date_quality;

    ExtractionReport {
        title,
        body,
        date,
        title_quality,
        body_quality,
        date_quality,
        combined,
    }
}

/// Resolve one field. `prefer_datetime_attr` is set for the date field:
/// a resolved `<time datetime="...">` element yields the attribute
/// value rather than its text content, matching how the DOM Analyzer
/// proposes `time[datetime]` candidates in the first place.
fn resolve_field(document: &Html, selector: &Selector, prefer_datetime_attr: bool) -> Option<String> {
    match selector {
        Selector::Meta(key) => meta_value(document, key),
        Selector::Css(raw) => {
            let element = css::resolve(document, raw)?;
            if prefer_datetime_attr {
                if let Some(attr) = element.value().attr("datetime") {
                    return Some(attr.trim().to_string());
                }
            }
            let text: String = element.text().collect::<String>().trim().to_string();
            if text.is_empty() {
                None
            } else {
                Some(text)
            }
        }
    }
}

fn score_title(title: &Option<String>) -> f32 {
    match title.as_deref().map(str::len) {
        Some(len) if len >= 10 => 1.0,
        Some(len) if len >= 5 => 0.5,
        _ => 0.0,
    }
}

fn score_body(body: &Option<String>) -> f32 {
    match body.as_deref().map(str::len) {
        Some(len) if len >= 200 => 1.0,
        Some(len) if len >= 100 => 0.6,
        Some(len) if len >= 50 => 0.3,
        _ => 0.0,
    }
}

fn score_date(date: &Option<String>) -> f32 {
    match date {
        Some(d) if looks_like_date(d) => 1.0,
        _ => 0.0,
    }
}
