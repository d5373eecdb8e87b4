//! Few-Shot Retriever (C11): selects up to `k` prior successful
//! `SelectorSet`s ranked by similarity to the target site, for use as
//! in-context examples in the Proposer prompt.

use crate::types::SelectorRecord;
use std::collections::HashMap;

/// The features the similarity heuristic compares. Implementations
/// derive this once per site (language detection, news heuristics,
/// DOM tag-frequency histogram) and cache it alongside the
/// `SelectorRecord` it describes.
#[derive(Debug, Clone, Default)]
pub struct SiteProfile {
    pub language: Option<String>,
    pub is_news: bool,
    pub tag_histogram: HashMap<String, f32>,
}

/// `top_k(site, k) -> seq<SelectorRecord>`, ranked by: same language
/// family (+0.2), news-domain signals (+0.3), DOM tag-distribution
/// cosine similarity (x0.5). Falls back to the globally most
/// successful records when nothing scores above zero.
pub fn top_k(target: &SiteProfile, candidates: &[(SelectorRecord, SiteProfile)], k: usize) -> Vec<SelectorRecord> {
    let mut scored: Vec<(f32, &SelectorRecord)> = candidates
        .iter()
        .map(|(record, profile)| (similarity(target, profile), record))
        .collect();

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    if scored.iter().all(|(score, _)| *score <= 0.0) {
        let mut by_success: Vec<&SelectorRecord> = candidates.iter().map(|(record, _)| record).collect();
        by_success.sort_by(|a, b| b.success_count.cmp(&a.success_count));
        return by_success.into_iter().take(k).cloned().collect();
    }

    scored.into_iter().take(k).map(|(_, record)| record.clone()).collect()
}

fn similarity(target: &SiteProfile, candidate: &SiteProfile) -> f32 {
    let mut score = 0.0;

    if let (Some(a), Some(b)) = (&target.language, &candidate.language) {
        if a == b {
            score += 0.2;
        }
    }

    if target.is_news && candidate.is_news {
        score += 0.3;
    }

    score += 0.5 * cosine_similarity(&target.tag_histogram, &candidate.tag_histogram);
    score
}

/// Cosine similarity between two sparse tag histograms.
fn cosine_similarity(a: &HashMap<String, f32>, b: &HashMap<String, f32>) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().map(|(tag, count)| count * b.get(tag).copied().unwrap_or(0.0)).sum();
    let norm_a: f32 = a.values().map(|v| v * v).sum::<f32>().sqrt();
    let norm_b: f32 = b.values().map(|v| v * v).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
