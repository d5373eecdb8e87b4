//! Testing utilities: mock collaborators for exercising the
//! [`crate::Orchestrator`] without real HTTP or LLM calls, plus the
//! end-to-end scenarios that pin down its observable behavior.

use crate::error::EngineError;
use crate::llm::{AgentCallMeta, Invocation, LlmAdapter};
use crate::orchestrator::Fetcher;
use crate::types::RawDocument;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// One canned outcome for a `MockLlmAdapter` call.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    Json { json: Value, input_tokens: u64, output_tokens: u64 },
    SchemaViolation,
    Timeout,
}

impl MockOutcome {
    pub fn json(json: Value, input_tokens: u64, output_tokens: u64) -> Self {
        MockOutcome::Json { json, input_tokens, output_tokens }
    }
}

/// Record of one call made to a `MockLlmAdapter`.
#[derive(Debug, Clone)]
pub struct MockLlmCall {
    pub model: String,
}

/// A queue-driven [`LlmAdapter`]. Each call pops the next outcome off
/// the front of the queue; once only one remains it is served
/// repeatedly, so a test only needs to seed the responses it actually
/// cares about distinguishing (e.g. "fail once, then succeed").
#[derive(Default)]
pub struct MockLlmAdapter {
    provider: String,
    outcomes: RwLock<VecDeque<MockOutcome>>,
    calls: Arc<RwLock<Vec<MockLlmCall>>>,
}

impl MockLlmAdapter {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            outcomes: RwLock::new(VecDeque::new()),
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn with_outcome(self, outcome: MockOutcome) -> Self {
        self.outcomes.write().unwrap().push_back(outcome);
        self
    }

    pub fn calls(&self) -> Vec<MockLlmCall> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl LlmAdapter for MockLlmAdapter {
    fn provider(&self) -> &str {
        &self.provider
    }

    async fn invoke(
        &self,
        model: &str,
        _prompt: &str,
        _schema: &Value,
        _timeout: Duration,
    ) -> Result<Invocation, crate::error::AgentError> {
        self.calls.write().unwrap().push(MockLlmCall { model: model.to_string() });

        let outcome = {
            let mut outcomes = self.outcomes.write().unwrap();
            if outcomes.len() > 1 {
                outcomes.pop_front()
            } else {
                outcomes.front().cloned()
            }
        };

        match outcome.unwrap_or(MockOutcome::SchemaViolation) {
            MockOutcome::Json { json, input_tokens, output_tokens } => Ok(Invocation {
                json,
                input_tokens,
                output_tokens,
                raw_text: String::new(),
                latency: Duration::from_millis(1),
            }),
            MockOutcome::SchemaViolation => Err(crate::error::AgentError::SchemaViolation("mock: malformed response".into())),
            MockOutcome::Timeout => Err(crate::error::AgentError::Timeout(Duration::from_secs(30))),
        }
    }
}

/// A canned [`Fetcher`]: serves fixed HTML per URL, or fails for URLs
/// marked with [`MockFetcher::fail_url`].
#[derive(Default)]
pub struct MockFetcher {
    pages: Arc<RwLock<HashMap<String, String>>>,
    fail_urls: Arc<RwLock<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.write().unwrap().insert(url.into(), html.into());
        self
    }

    pub fn fail_url(self, url: impl Into<String>) -> Self {
        self.fail_urls.write().unwrap().push(url.into());
        self
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<RawDocument, EngineError> {
        if self.fail_urls.read().unwrap().iter().any(|u| u == url) {
            return Err(EngineError::Fetch("mock: connection refused".into()));
        }
        let html = self.pages.read().unwrap().get(url).cloned().unwrap_or_default();
        Ok(RawDocument { url: url.to_string(), html, fetched_at: Utc::now() })
    }
}

/// Unused by `AgentCallMeta`'s own tests but re-exported so downstream
/// crates assembling mock pipelines don't need to depend on `engine`'s
/// internal `llm` module directly.
pub type CallMeta = AgentCallMeta;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{ProposerAgent, ProposerContext, ValidatorAgent};
    use crate::config::{EngineConfig, ProviderIdentity};
    use crate::orchestrator::Orchestrator;
    use crate::store::memory::{MemoryCostMeter, MemoryDecisionLog, MemorySelectorStore};
    use crate::types::{
        ArticleRequest, ExtractionMethod, RequestHints, Selector, SelectorSet, SelectorSource,
    };

    fn request(site: &str, path: &str) -> ArticleRequest {
        ArticleRequest {
            url: format!("https://example.test{path}"),
            site: site.to_string(),
            hints: Some(RequestHints { language: Some("en".into()), expected_category: None }),
        }
    }

    fn clean_article_html() -> String {
        let body = "word ".repeat(60); // 300 chars, well past the 100-char full-score floor
        format!(
            "<html><body><h1>A Sufficiently Long Headline</h1>\
             <article>{body}</article>\
             <time datetime=\"2024-03-15T10:00:00Z\">March 15</time></body></html>"
        )
    }

    fn good_selectors() -> SelectorSet {
        SelectorSet::new(Selector::parse("h1"), Selector::parse("article"), Selector::parse("time"))
    }

    struct Wiring {
        orchestrator: Orchestrator,
        store: Arc<MemorySelectorStore>,
        log: Arc<MemoryDecisionLog>,
        meter: Arc<MemoryCostMeter>,
    }

    fn wire(
        fetcher: MockFetcher,
        proposer_adapter: MockLlmAdapter,
        validator_adapter: MockLlmAdapter,
        config: EngineConfig,
    ) -> Wiring {
        let store = Arc::new(MemorySelectorStore::new());
        let log = Arc::new(MemoryDecisionLog::new());
        let meter = Arc::new(MemoryCostMeter::new());
        let proposer = ProposerAgent::new(
            Arc::new(proposer_adapter),
            ProviderIdentity::new("openai", "gpt-4o-mini"),
            20_000,
            Duration::from_secs(5),
        );
        let validator = ValidatorAgent::new(
            Arc::new(validator_adapter),
            ProviderIdentity::new("anthropic", "claude-3-5-haiku-20241022"),
            1024,
            Duration::from_secs(5),
        );
        let orchestrator = Orchestrator::new(
            Arc::new(fetcher),
            store.clone(),
            log.clone(),
            meter.clone(),
            proposer,
            validator,
            config,
        );
        Wiring { orchestrator, store, log, meter }
    }

    // -- Mock sanity checks -------------------------------------------------

    #[tokio::test]
    async fn test_mock_fetcher_serves_pages_and_fails_marked_urls() {
        let fetcher = MockFetcher::new()
            .with_page("https://example.test/ok", "<html></html>")
            .fail_url("https://example.test/down");

        let ok = fetcher.fetch("https://example.test/ok").await.unwrap();
        assert_eq!(ok.html, "<html></html>");
        assert!(fetcher.fetch("https://example.test/down").await.is_err());
    }

    #[tokio::test]
    async fn test_mock_llm_adapter_repeats_last_outcome_once_drained() {
        let adapter = MockLlmAdapter::new("test").with_outcome(MockOutcome::json(serde_json::json!({"a": 1}), 1, 1));
        let schema = serde_json::json!({});
        adapter.invoke("m", "p", &schema, Duration::from_secs(1)).await.unwrap();
        adapter.invoke("m", "p", &schema, Duration::from_secs(1)).await.unwrap();
        assert_eq!(adapter.calls().len(), 2);
    }

    // -- Scenario A: known site, clean extraction (UC1 only) ----------------

    #[tokio::test]
    async fn test_scenario_a_known_site_clean_extraction() {
        let fetcher = MockFetcher::new().with_page("https://example.test/a/1", clean_article_html());
        let wiring = wire(fetcher, MockLlmAdapter::new("openai"), MockLlmAdapter::new("anthropic"), EngineConfig::default());
        wiring.store.put_new("yonhap", good_selectors(), SelectorSource::Uc1Reuse).await.unwrap();

        let result = wiring.orchestrator.run(request("yonhap", "/a/1")).await;

        assert!(result.ok);
        assert_eq!(result.method, Some(ExtractionMethod::Rule));
        assert!(result.quality.unwrap_or(0) >= 95);
        assert_eq!(result.history, vec!["start → uc1".to_string(), "uc1 → end".to_string()]);
        assert_eq!(result.cost_usd, 0.0);
        assert!(wiring.log.for_site("yonhap").await.unwrap().is_empty());
    }

    // -- Scenario B: known site, drifted selectors, UC2 heals ----------------

    fn drifted_html() -> String {
        // Both the stored title and body selectors no longer match
        // anything (the site moved from h1/div markup to p/article); the
        // date selector still resolves. Pre-heal this scores 0+0+10+10=20,
        // well below the gate. The body is long enough (>100 chars) that
        // once the Proposer points at the right tags, post-heal scores
        // 20+60+10+10=100.
        let body = "word ".repeat(25); // 125 chars
        format!(
            "<html><body><p class=\"new-title-markup\">A Renamed Headline</p>\
             <article>{body}</article>\
             <time datetime=\"2024-03-15T10:00:00Z\">March 15</time></body></html>"
        )
    }

    fn drifted_stored_selectors() -> SelectorSet {
        SelectorSet::new(Selector::parse("h1.old-title"), Selector::parse("div.old-body"), Selector::parse("time"))
    }

    #[tokio::test]
    async fn test_scenario_b_selectors_drifted_uc2_heals() {
        let html = drifted_html();
        let fetcher = MockFetcher::new().with_page("https://example.test/a/2", html.clone());

        let proposer_adapter = MockLlmAdapter::new("openai").with_outcome(MockOutcome::json(
            serde_json::json!({
                "title_selector": "p.new-title-markup", "body_selector": "article", "date_selector": "time",
                "confidence": 0.95, "reasoning": "title markup changed from h1 to p"
            }),
            100,
            40,
        ));
        let validator_adapter = MockLlmAdapter::new("anthropic").with_outcome(MockOutcome::json(
            serde_json::json!({
                "is_valid": true, "confidence": 0.90,
                "chosen_selectors": {"title_selector": "p.new-title-markup", "body_selector": "article", "date_selector": "time"},
                "feedback": "selectors resolve to plausible article content"
            }),
            80,
            30,
        ));

        let wiring = wire(fetcher, proposer_adapter, validator_adapter, EngineConfig::default());
        wiring.store.put_new("yonhap", drifted_stored_selectors(), SelectorSource::Uc1Reuse).await.unwrap();
        let before = wiring.store.get("yonhap").await.unwrap().unwrap();

        let result = wiring.orchestrator.run(request("yonhap", "/a/2")).await;

        assert!(result.ok, "reason={}", result.reason);
        assert_eq!(
            result.history,
            vec![
                "start → uc1".to_string(),
                "uc1 → uc2".to_string(),
                "uc2 → uc1".to_string(),
                "uc1 → end".to_string(),
            ]
        );
        assert_eq!(result.method, Some(ExtractionMethod::Heal));

        let entries = wiring.log.for_site("yonhap").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].use_case, crate::types::UseCase::Uc2);
        assert_eq!(entries[0].final_action, crate::types::FinalAction::Accept);

        let after = wiring.store.get("yonhap").await.unwrap().unwrap();
        assert!(after.updated_at > before.updated_at);
        assert_eq!(after.source, SelectorSource::Uc2Heal);
    }

    // -- Scenario C: unknown site, JSON-LD fast path -------------------------

    fn json_ld_html() -> String {
        let body = "y".repeat(150);
        format!(
            "<html><head><script type=\"application/ld+json\">\
             {{\"@type\": \"NewsArticle\", \"headline\": \"A Fully Discoverable Headline\", \
             \"articleBody\": \"{body}\", \"datePublished\": \"2024-05-01T08:00:00Z\"}}\
             </script></head><body></body></html>"
        )
    }

    #[tokio::test]
    async fn test_scenario_c_json_ld_fast_path_no_llm_calls() {
        let fetcher = MockFetcher::new().with_page("https://example.test/b/1", json_ld_html());
        let proposer_adapter = MockLlmAdapter::new("openai");
        let validator_adapter = MockLlmAdapter::new("anthropic");
        let wiring = wire(fetcher, proposer_adapter, validator_adapter, EngineConfig::default());

        let result = wiring.orchestrator.run(request("newsite", "/b/1")).await;

        assert!(result.ok, "reason={}", result.reason);
        assert_eq!(
            result.history,
            vec!["start → uc3".to_string(), "uc3 → uc1".to_string(), "uc1 → end".to_string()]
        );
        assert_eq!(result.cost_usd, 0.0);
        assert_eq!(result.method, Some(ExtractionMethod::Discover));
        assert_eq!(result.quality, Some(100));

        let entries = wiring.log.for_site("newsite").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].use_case, crate::types::UseCase::Uc3);
        assert_eq!(entries[0].final_action, crate::types::FinalAction::FastPath);

        let record = wiring.store.get("newsite").await.unwrap().unwrap();
        assert_eq!(record.source, SelectorSource::Uc3DiscoverJsonLd);
        assert!(wiring.meter.total_for_site("newsite").await.unwrap() == 0.0);
    }

    // -- Scenario D: unknown site, LLM discovery succeeds --------------------

    #[tokio::test]
    async fn test_scenario_d_llm_discovery_succeeds() {
        // No JSON-LD, no OpenGraph: the metadata fast path scores 0 and
        // UC3 falls through to DOM analysis + Proposer/Validator consensus.
        let html = clean_article_html();
        let fetcher = MockFetcher::new().with_page("https://example.test/c/1", html);

        let proposer_adapter = MockLlmAdapter::new("openai").with_outcome(MockOutcome::json(
            serde_json::json!({
                "title_selector": "h1", "body_selector": "article", "date_selector": "time",
                "confidence": 0.80, "reasoning": "clear single-article layout"
            }),
            120,
            50,
        ));
        let validator_adapter = MockLlmAdapter::new("anthropic").with_outcome(MockOutcome::json(
            serde_json::json!({
                "is_valid": true, "confidence": 0.70,
                "chosen_selectors": {"title_selector": "h1", "body_selector": "article", "date_selector": "time"},
                "feedback": "selectors resolve correctly"
            }),
            90,
            35,
        ));

        let wiring = wire(fetcher, proposer_adapter, validator_adapter, EngineConfig::default());

        let result = wiring.orchestrator.run(request("othersite", "/c/1")).await;

        assert!(result.ok, "reason={}", result.reason);
        assert!(result.history.contains(&"start → uc3".to_string()));
        assert!(result.history.contains(&"uc3 → uc1".to_string()));
        assert!(result.history.contains(&"uc1 → end".to_string()));
        assert!(result.cost_usd > 0.0);
        assert_eq!(result.method, Some(ExtractionMethod::Discover));

        let record = wiring.store.get("othersite").await.unwrap().unwrap();
        assert_eq!(record.source, SelectorSource::Uc3DiscoverLlm);

        let entries = wiring.log.for_site("othersite").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].proposer_output.is_some(), true);
        assert_eq!(entries[0].validator_output.is_some(), true);
    }

    // -- Scenario E: adversarial loop, terminates on the loop bound ----------
    //
    // loop_count advances once per completed UC2-accept cycle back to UC1,
    // so with the default MAX_LOOPS=3 this resolves to exactly 2*3+1=7
    // history entries and exactly 3 uc2 decision log entries.

    #[tokio::test]
    async fn test_scenario_e_adversarial_loop_terminates_on_loop_bound() {
        let html = drifted_html(); // UC1 never passes against these selectors
        let fetcher = MockFetcher::new().with_page("https://example.test/e/1", html);

        // UC2 always accepts (high proposer/validator confidence carries a
        // Medium-tier consensus even with a low extraction score) but keeps
        // handing back the same non-resolving selectors, so UC1 never
        // clears the quality gate and the cycle repeats.
        let proposer_adapter = MockLlmAdapter::new("openai").with_outcome(MockOutcome::json(
            serde_json::json!({
                "title_selector": "h1.old-title", "body_selector": "div.old-body", "date_selector": "time",
                "confidence": 0.95, "reasoning": "looks right"
            }),
            50,
            20,
        ));
        let validator_adapter = MockLlmAdapter::new("anthropic").with_outcome(MockOutcome::json(
            serde_json::json!({
                "is_valid": true, "confidence": 0.95,
                "chosen_selectors": {"title_selector": "h1.old-title", "body_selector": "div.old-body", "date_selector": "time"},
                "feedback": "consistent with prior structure"
            }),
            50,
            20,
        ));

        let config = EngineConfig::default(); // max_loops = 3
        let wiring = wire(fetcher, proposer_adapter, validator_adapter, config.clone());
        wiring.store.put_new("yonhap", drifted_stored_selectors(), SelectorSource::Uc1Reuse).await.unwrap();

        let result = wiring.orchestrator.run(request("yonhap", "/e/1")).await;

        assert!(!result.ok);
        assert_eq!(result.reason, "loop_bound");
        assert_eq!(result.history.len() as u32, 2 * config.max_loops + 1);
        // The store still holds a committed (if ineffective) selector set;
        // callers never observe a half-written record.
        assert!(wiring.store.get("yonhap").await.unwrap().is_some());

        let entries = wiring.log.for_site("yonhap").await.unwrap();
        let uc2_entries = entries.iter().filter(|e| e.use_case == crate::types::UseCase::Uc2).count();
        assert_eq!(uc2_entries as u32, config.max_loops);
    }

    // -- Scenario F: proposer returns malformed JSON, recovers on fallback --

    #[tokio::test]
    async fn test_scenario_f_proposer_schema_violation_then_fallback_recovers() {
        let html = drifted_html();
        let fetcher = MockFetcher::new().with_page("https://example.test/f/1", html);

        let proposer_adapter = MockLlmAdapter::new("openai")
            .with_outcome(MockOutcome::SchemaViolation)
            .with_outcome(MockOutcome::json(
                serde_json::json!({
                    "title_selector": "p.new-title-markup", "body_selector": "article", "date_selector": "time",
                    "confidence": 0.8, "reasoning": "recovered on fallback model"
                }),
                60,
                25,
            ));
        let validator_adapter = MockLlmAdapter::new("anthropic").with_outcome(MockOutcome::json(
            serde_json::json!({
                "is_valid": true, "confidence": 0.7,
                "chosen_selectors": {"title_selector": "p.new-title-markup", "body_selector": "article", "date_selector": "time"},
                "feedback": "plausible"
            }),
            60,
            25,
        ));

        let config = EngineConfig::default().with_providers(
            ProviderIdentity::new("openai", "gpt-4o-mini").with_fallback("gpt-4o"),
            ProviderIdentity::new("anthropic", "claude-3-5-haiku-20241022"),
        );
        let wiring = wire(fetcher, proposer_adapter, validator_adapter, config);
        wiring.store.put_new("yonhap", drifted_stored_selectors(), SelectorSource::Uc1Reuse).await.unwrap();

        let result = wiring.orchestrator.run(request("yonhap", "/f/1")).await;

        assert!(result.ok, "reason={}", result.reason);

        let entries = wiring.log.for_site("yonhap").await.unwrap();
        assert_eq!(entries.len(), 1);
        let proposer_output = entries[0].proposer_output.as_ref().unwrap();
        assert_eq!(proposer_output.confidence, 0.8);

        let metrics_total = wiring.meter.total_for_site("yonhap").await.unwrap();
        assert!(metrics_total > 0.0);
    }
}
