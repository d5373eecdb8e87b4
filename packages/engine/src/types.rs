//! Core data model entities.
//!
//! These are the nouns the rest of the crate operates on: requests,
//! documents, selectors, reports, and the records written to the
//! Selector Store, Decision Log, and Cost Meter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A caller's request for one article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRequest {
    pub url: String,
    pub site: String,
    #[serde(default)]
    pub hints: Option<RequestHints>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestHints {
    pub language: Option<String>,
    pub expected_category: Option<String>,
}

/// The fetched page, immutable for the duration of a request.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub url: String,
    pub html: String,
    pub fetched_at: DateTime<Utc>,
}

/// A field locator: either a CSS-style path or a `meta:`-prefixed
/// sentinel resolved against document head/meta tags rather than via
/// DOM traversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Selector {
    Css(String),
    Meta(String),
}

impl Selector {
    /// Parse the wire form (`"h1.title"` or `"meta:og:title"`).
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        match raw.strip_prefix("meta:") {
            Some(key) => Selector::Meta(key.to_string()),
            None => Selector::Css(raw),
        }
    }

    /// Render back to wire form.
    pub fn to_wire(&self) -> String {
        match self {
            Selector::Css(s) => s.clone(),
            Selector::Meta(key) => format!("meta:{key}"),
        }
    }
}

/// Where a `SelectorSet` came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectorSource {
    Uc1Reuse,
    Uc2Heal,
    Uc3DiscoverJsonLd,
    Uc3DiscoverLlm,
}

impl SelectorSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectorSource::Uc1Reuse => "uc1-reuse",
            SelectorSource::Uc2Heal => "uc2-heal",
            SelectorSource::Uc3DiscoverJsonLd => "uc3-discover-json-ld",
            SelectorSource::Uc3DiscoverLlm => "uc3-discover-llm",
        }
    }
}

impl std::fmt::Display for SelectorSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The triple of field locators used to extract `{title, body, date}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectorSet {
    pub title: Selector,
    pub body: Selector,
    pub date: Selector,
    pub source: Option<SelectorSource>,
    pub confidence: Option<f32>,
}

impl SelectorSet {
    pub fn new(title: Selector, body: Selector, date: Selector) -> Self {
        Self {
            title,
            body,
            date,
            source: None,
            confidence: None,
        }
    }

    pub fn with_source(mut self, source: SelectorSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Content hash of the functional selector triple, used to detect
    /// whether a proposed set is identical to one already on file
    /// (idempotence under retries).
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.title.to_wire().as_bytes());
        hasher.update(b"\0");
        hasher.update(self.body.to_wire().as_bytes());
        hasher.update(b"\0");
        hasher.update(self.date.to_wire().as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetadataSource {
    JsonLd,
    Meta,
}

/// The output of the Metadata Extractor (C1).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataCandidate {
    pub title: Option<String>,
    pub body: Option<String>,
    pub date: Option<String>,
    pub source: Option<MetadataSource>,
    pub quality: f32,
}

impl MetadataCandidate {
    pub fn empty() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    Rule,
    Heal,
    Discover,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::Rule => "rule",
            ExtractionMethod::Heal => "heal",
            ExtractionMethod::Discover => "discover",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedArticle {
    pub title: Option<String>,
    pub body: Option<String>,
    pub date: Option<String>,
    pub url: String,
    pub site: String,
    pub extracted_at: DateTime<Utc>,
    pub extraction_method: ExtractionMethod,
}

/// A ranked DOM candidate for one field (C2 output).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub selector: String,
    pub confidence: f32,
}

/// Ranked candidate selectors per field, length <= 3 each (C2 output).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomCandidates {
    pub title: Vec<Candidate>,
    pub body: Vec<Candidate>,
    pub date: Vec<Candidate>,
}

/// The result of applying a `SelectorSet` to a DOM (C3 output).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub title: Option<String>,
    pub body: Option<String>,
    pub date: Option<String>,
    pub title_quality: f32,
    pub body_quality: f32,
    pub date_quality: f32,
    pub combined: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualityBreakdown {
    pub title: u32,
    pub body: u32,
    pub date: u32,
    pub url: u32,
    pub category: Option<u32>,
    pub author: Option<u32>,
}

/// Rule-based 5W1H scoring output (C4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    pub score: u32,
    pub breakdown: QualityBreakdown,
    pub reason: String,
}

/// The Proposer LLM's structured response (C5).
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ProposerOutput {
    pub selectors: ProposedSelectors,
    pub confidence: f32,
    pub reasoning: String,
}

/// Wire shape matching the Proposer's strict JSON schema
/// (`title_selector, body_selector, date_selector, confidence,
/// reasoning`), kept distinct from [`SelectorSet`] since the LLM speaks
/// in raw strings, not resolved [`Selector`] variants.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ProposedSelectors {
    pub title_selector: String,
    pub body_selector: String,
    pub date_selector: String,
}

impl ProposedSelectors {
    pub fn into_selector_set(self) -> SelectorSet {
        SelectorSet::new(
            Selector::parse(self.title_selector),
            Selector::parse(self.body_selector),
            Selector::parse(self.date_selector),
        )
    }
}

/// The Validator LLM's structured response (C6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorOutput {
    pub is_valid: bool,
    pub confidence: f32,
    pub chosen_selectors: SelectorSet,
    pub feedback: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsensusTier {
    High,
    Medium,
    Reject,
}

impl ConsensusTier {
    pub fn accepts(&self) -> bool {
        matches!(self, ConsensusTier::High | ConsensusTier::Medium)
    }
}

/// Per-agent scores folded into one consensus score (C7 output).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentContributions {
    pub proposer_confidence: f32,
    pub validator_confidence: f32,
    pub extraction_quality: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusResult {
    pub score: f32,
    pub tier: ConsensusTier,
    pub selectors: Option<SelectorSet>,
    pub agent_contributions: AgentContributions,
}

/// A site-keyed persisted `SelectorSet` (C8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorRecord {
    pub site: String,
    pub set: SelectorSet,
    pub source: SelectorSource,
    pub success_count: u32,
    pub failure_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UseCase {
    Uc2,
    Uc3,
}

impl UseCase {
    pub fn as_str(&self) -> &'static str {
        match self {
            UseCase::Uc2 => "uc2",
            UseCase::Uc3 => "uc3",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalAction {
    Accept,
    Reject,
    Retry,
    FastPath,
}

impl FinalAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinalAction::Accept => "accept",
            FinalAction::Reject => "reject",
            FinalAction::Retry => "retry",
            FinalAction::FastPath => "fast_path",
        }
    }
}

/// An append-only audit entry for one terminal UC2/UC3 step (C9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionLogEntry {
    pub id: uuid::Uuid,
    pub url: String,
    pub site: String,
    pub use_case: UseCase,
    pub proposer_output: Option<ProposerOutput>,
    pub validator_output: Option<ValidatorOutput>,
    pub consensus: Option<ConsensusResult>,
    pub final_action: FinalAction,
    pub retry_count: u32,
    pub ts: DateTime<Utc>,
}

/// An append-only per-call cost entry (C10).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostMetric {
    pub id: uuid::Uuid,
    pub ts: DateTime<Utc>,
    pub provider: String,
    pub model: String,
    pub use_case: UseCase,
    pub site: String,
    pub url: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub input_cost: f64,
    pub output_cost: f64,
    pub total_cost: f64,
}

/// Which subsystem is (or was last) active for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurrentUc {
    None,
    Uc1,
    Uc2,
    Uc3,
}

/// Why a request terminated. Variant strings are part of the observable
/// contract (the `reason` field callers see) and must render exactly
/// as written here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalReason {
    Ok,
    FetchFailed,
    ParseFailed,
    QualityExhausted,
    PostDiscoveryQualityFailed,
    Uc2Exhausted,
    DiscoveryFailed,
    LoopBound,
    Deadline,
}

impl TerminalReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminalReason::Ok => "ok",
            TerminalReason::FetchFailed => "fetch_failed",
            TerminalReason::ParseFailed => "parse_failed",
            TerminalReason::QualityExhausted => "quality_exhausted",
            TerminalReason::PostDiscoveryQualityFailed => "post_discovery_quality_failed",
            TerminalReason::Uc2Exhausted => "uc2_exhausted",
            TerminalReason::DiscoveryFailed => "discovery_failed",
            TerminalReason::LoopBound => "loop_bound",
            TerminalReason::Deadline => "deadline",
        }
    }
}

impl std::fmt::Display for TerminalReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// In-memory per-request state threaded through the Supervisor.
#[derive(Debug, Clone)]
pub struct MasterState {
    pub url: String,
    pub site: String,
    pub html: Option<String>,
    pub selector_record: Option<SelectorRecord>,
    pub metadata_candidate: Option<MetadataCandidate>,
    pub uc1_report: Option<QualityReport>,
    pub article: Option<ExtractedArticle>,
    pub uc2_result: Option<ConsensusResult>,
    pub uc3_result: Option<ConsensusResult>,
    pub extraction_method: Option<ExtractionMethod>,
    pub current_uc: CurrentUc,
    pub failure_count: u32,
    pub loop_count: u32,
    pub uc2_retry_count: u32,
    pub uc3_retry_count: u32,
    pub came_from_uc3_accept: bool,
    pub history: Vec<String>,
    pub terminal_reason: Option<TerminalReason>,
}

impl MasterState {
    pub fn new(url: impl Into<String>, site: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            site: site.into(),
            html: None,
            selector_record: None,
            metadata_candidate: None,
            uc1_report: None,
            article: None,
            uc2_result: None,
            uc3_result: None,
            extraction_method: None,
            current_uc: CurrentUc::None,
            failure_count: 0,
            loop_count: 0,
            uc2_retry_count: 0,
            uc3_retry_count: 0,
            came_from_uc3_accept: false,
            history: Vec::new(),
            terminal_reason: None,
        }
    }

    pub fn push_history(&mut self, from: &str, to: &str) {
        self.history.push(format!("{from} → {to}"));
    }
}

/// The final shape returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationResult {
    pub ok: bool,
    pub article: Option<ExtractedArticle>,
    pub quality: Option<u32>,
    pub method: Option<ExtractionMethod>,
    pub history: Vec<String>,
    pub reason: String,
    pub cost_usd: f64,
}
