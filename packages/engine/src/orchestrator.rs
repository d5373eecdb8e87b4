//! Master Orchestration Engine (C13): wires the Supervisor's pure
//! routing decisions to the concrete subsystems — UC1 (Quality Gate),
//! UC2 (Self-Healing), UC3 (Discovery) — and the Selector Store,
//! Decision Log, and Cost Meter side effects each one produces.
//!
//! Fetching HTML is out of scope for this crate; callers supply a
//! [`Fetcher`] (typically backed by `reqwest`) at construction time.

use crate::agents::{ProposerAgent, ProposerContext, ValidatorAgent};
use crate::config::EngineConfig;
use crate::consensus;
use crate::dom;
use crate::error::EngineError;
use crate::evaluator;
use crate::fewshot::{self, SiteProfile};
use crate::llm::AgentCallMeta;
use crate::metadata;
use crate::pricing;
use crate::quality;
use crate::store::{CostMeter, DecisionLog, SelectorStore};
use crate::supervisor::{self, Next};
use crate::types::{
    ArticleRequest, CostMetric, CurrentUc, DecisionLogEntry, ExtractedArticle, ExtractionMethod, FinalAction,
    MasterState, OrchestrationResult, RawDocument, Selector, SelectorRecord, SelectorSet, SelectorSource,
    TerminalReason, UseCase,
};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::time::Instant;
use uuid::Uuid;

/// Fetches raw HTML for a URL. The engine never speaks HTTP itself;
/// this is the seam a caller fills in (spec non-goal: "the HTTP
/// fetcher, retry/backoff policy, and proxy rotation").
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<RawDocument, EngineError>;
}

/// Ties the Supervisor's decisions to real subsystems and collaborators.
pub struct Orchestrator {
    fetcher: Arc<dyn Fetcher>,
    selector_store: Arc<dyn SelectorStore>,
    decision_log: Arc<dyn DecisionLog>,
    cost_meter: Arc<dyn CostMeter>,
    proposer: ProposerAgent,
    validator: ValidatorAgent,
    config: EngineConfig,
    few_shot_corpus: Vec<(SelectorRecord, SiteProfile)>,
}

impl Orchestrator {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        selector_store: Arc<dyn SelectorStore>,
        decision_log: Arc<dyn DecisionLog>,
        cost_meter: Arc<dyn CostMeter>,
        proposer: ProposerAgent,
        validator: ValidatorAgent,
        config: EngineConfig,
    ) -> Self {
        Self {
            fetcher,
            selector_store,
            decision_log,
            cost_meter,
            proposer,
            validator,
            config,
            few_shot_corpus: Vec::new(),
        }
    }

    /// The Few-Shot Retriever scans a corpus of prior successful
    /// records; this crate's Selector Store is keyed by site rather
    /// than built for corpus-wide scans, so the corpus is supplied by
    /// the operator (e.g. a periodic export) instead of queried live.
    pub fn with_few_shot_corpus(mut self, corpus: Vec<(SelectorRecord, SiteProfile)>) -> Self {
        self.few_shot_corpus = corpus;
        self
    }

    /// Run one request to completion: fetch, then loop the Supervisor
    /// until it reaches `End`, dispatching UC1/UC2/UC3 as directed.
    pub async fn run(&self, request: ArticleRequest) -> OrchestrationResult {
        let mut state = MasterState::new(request.url.clone(), request.site.clone());
        let deadline = Instant::now() + self.config.request_deadline;

        let document = match self.fetcher.fetch(&request.url).await {
            Ok(doc) => doc,
            Err(_) => return finalize(state, TerminalReason::FetchFailed, 0.0),
        };

        if document.html.trim().is_empty() {
            return finalize(state, TerminalReason::ParseFailed, 0.0);
        }

        state.html = Some(document.html);
        state.selector_record = self.selector_store.get(&request.site).await.ok().flatten();
        if state.selector_record.is_some() {
            state.extraction_method = Some(ExtractionMethod::Rule);
        }

        let mut total_cost = 0.0_f64;
        let mut current_label = "start".to_string();

        loop {
            if Instant::now() >= deadline {
                state.terminal_reason = Some(TerminalReason::Deadline);
                break;
            }

            let (next, next_state) = supervisor::route(&state, &self.config);
            state = next_state;
            let next_label = match next {
                Next::Uc1 => "uc1",
                Next::Uc2 => "uc2",
                Next::Uc3 => "uc3",
                Next::End => "end",
            };
            state.push_history(&current_label, next_label);

            match next {
                Next::Uc1 => {
                    state.current_uc = CurrentUc::Uc1;
                    self.run_uc1(&mut state, &request).await;
                }
                Next::Uc2 => {
                    state.current_uc = CurrentUc::Uc2;
                    total_cost += self.run_uc2(&mut state, &request, deadline).await;
                }
                Next::Uc3 => {
                    state.current_uc = CurrentUc::Uc3;
                    total_cost += self.run_uc3(&mut state, &request, deadline).await;
                }
                Next::End => break,
            }

            if state.terminal_reason.is_some() {
                break;
            }
            current_label = next_label.to_string();
        }

        let reason = state.terminal_reason.unwrap_or(TerminalReason::Deadline);
        if reason == TerminalReason::Uc2Exhausted {
            // Only write mark_failure once UC2 has exhausted its
            // retries, not on every individual UC1 miss.
            let _ = self.selector_store.mark_failure(&request.site).await;
        }
        finalize(state, reason, total_cost)
    }

    async fn run_uc1(&self, state: &mut MasterState, request: &ArticleRequest) {
        let html = state.html.clone().unwrap_or_default();
        let selectors = state
            .selector_record
            .as_ref()
            .map(|r| r.set.clone())
            .unwrap_or_else(|| SelectorSet::new(Selector::parse(""), Selector::parse(""), Selector::parse("")));

        let report = evaluator::evaluate(&html, &selectors);
        let metadata = metadata::extract(&html);

        let title = non_empty(report.title).or(metadata.title);
        let body = non_empty(report.body).or(metadata.body);
        let date = report.date.or(metadata.date);

        let article = ExtractedArticle {
            title,
            body,
            date,
            url: request.url.clone(),
            site: request.site.clone(),
            extracted_at: Utc::now(),
            extraction_method: state.extraction_method.unwrap_or(ExtractionMethod::Rule),
        };

        let quality_report = quality::score(&article, &request.url);
        let passed = quality_report.score >= self.config.quality_threshold;

        state.article = Some(article);
        state.uc1_report = Some(quality_report);

        if passed {
            let _ = self.selector_store.mark_success(&request.site).await;
        }
        // failure_count is advanced by the Supervisor's own transition
        // rule (route_after_uc1), not here, so the threshold check
        // and the count it reads stay in lockstep for the same failure.
    }

    async fn run_uc2(&self, state: &mut MasterState, request: &ArticleRequest, deadline: Instant) -> f64 {
        if Instant::now() >= deadline {
            state.terminal_reason = Some(TerminalReason::Deadline);
            return 0.0;
        }

        let html = state.html.clone().unwrap_or_default();
        let few_shot = fewshot::top_k(&self.site_profile(request), &self.few_shot_corpus, self.config.few_shot_k);

        let ctx = ProposerContext {
            html: &html,
            few_shot: &few_shot,
            site_hints: request.hints.as_ref().and_then(|h| h.expected_category.as_deref()),
            dom_candidates: None,
        };
        let (proposer_output, proposer_metas) = self.proposer.propose(&ctx).await;
        let mut cost = self.record_costs(&proposer_metas, UseCase::Uc2, request).await;

        let candidate = proposer_output.selectors.clone().into_selector_set();
        let (validator_output, validator_metas) = self.validator.validate(&candidate, &html).await;
        cost += self.record_costs(&validator_metas, UseCase::Uc2, request).await;

        let extraction_quality = evaluator::evaluate(&html, &validator_output.chosen_selectors).combined;
        let consensus_result = consensus::consensus(
            proposer_output.confidence,
            validator_output.confidence,
            extraction_quality,
            &self.config.consensus_weights,
            &self.config.uc2_thresholds,
            Some(validator_output.chosen_selectors.clone()),
        );

        let final_action = if consensus_result.tier.accepts() {
            FinalAction::Accept
        } else {
            FinalAction::Reject
        };

        if consensus_result.tier.accepts() {
            let set = validator_output
                .chosen_selectors
                .clone()
                .with_source(SelectorSource::Uc2Heal)
                .with_confidence(consensus_result.score);
            state.selector_record = self
                .selector_store
                .replace(&request.site, set, SelectorSource::Uc2Heal)
                .await
                .ok();
        }

        let _ = self
            .decision_log
            .append(DecisionLogEntry {
                id: Uuid::new_v4(),
                url: request.url.clone(),
                site: request.site.clone(),
                use_case: UseCase::Uc2,
                proposer_output: Some(proposer_output),
                validator_output: Some(validator_output),
                consensus: Some(consensus_result.clone()),
                final_action,
                retry_count: state.uc2_retry_count,
                ts: Utc::now(),
            })
            .await;

        state.uc2_result = Some(consensus_result);
        cost
    }

    async fn run_uc3(&self, state: &mut MasterState, request: &ArticleRequest, deadline: Instant) -> f64 {
        if Instant::now() >= deadline {
            state.terminal_reason = Some(TerminalReason::Deadline);
            return 0.0;
        }

        let html = state.html.clone().unwrap_or_default();
        let metadata_candidate = metadata::extract(&html);
        state.metadata_candidate = Some(metadata_candidate.clone());

        if metadata_candidate.quality >= self.config.json_ld_quality_threshold {
            let set = SelectorSet::new(
                Selector::Meta("json-ld:title".to_string()),
                Selector::Meta("json-ld:body".to_string()),
                Selector::Meta("json-ld:date".to_string()),
            )
            .with_source(SelectorSource::Uc3DiscoverJsonLd)
            .with_confidence(metadata_candidate.quality);

            state.selector_record = self.upsert_selector_record(request, set, SelectorSource::Uc3DiscoverJsonLd).await;

            let _ = self
                .decision_log
                .append(DecisionLogEntry {
                    id: Uuid::new_v4(),
                    url: request.url.clone(),
                    site: request.site.clone(),
                    use_case: UseCase::Uc3,
                    proposer_output: None,
                    validator_output: None,
                    consensus: None,
                    final_action: FinalAction::FastPath,
                    retry_count: state.uc3_retry_count,
                    ts: Utc::now(),
                })
                .await;

            return 0.0;
        }

        let dom_candidates = dom::analyze(&html);
        let few_shot = fewshot::top_k(&self.site_profile(request), &self.few_shot_corpus, self.config.few_shot_k);

        let ctx = ProposerContext {
            html: &html,
            few_shot: &few_shot,
            site_hints: request.hints.as_ref().and_then(|h| h.expected_category.as_deref()),
            dom_candidates: Some(&dom_candidates),
        };
        let (proposer_output, proposer_metas) = self.proposer.propose(&ctx).await;
        let mut cost = self.record_costs(&proposer_metas, UseCase::Uc3, request).await;

        let candidate = proposer_output.selectors.clone().into_selector_set();
        let (validator_output, validator_metas) = self.validator.validate(&candidate, &html).await;
        cost += self.record_costs(&validator_metas, UseCase::Uc3, request).await;

        let extraction_quality = evaluator::evaluate(&html, &validator_output.chosen_selectors).combined;
        let consensus_result = consensus::consensus(
            proposer_output.confidence,
            validator_output.confidence,
            extraction_quality,
            &self.config.consensus_weights,
            &self.config.uc3_thresholds,
            Some(validator_output.chosen_selectors.clone()),
        );

        let final_action = if consensus_result.tier.accepts() {
            FinalAction::Accept
        } else {
            FinalAction::Reject
        };

        if consensus_result.tier.accepts() {
            let set = validator_output
                .chosen_selectors
                .clone()
                .with_source(SelectorSource::Uc3DiscoverLlm)
                .with_confidence(consensus_result.score);
            state.selector_record = self.upsert_selector_record(request, set, SelectorSource::Uc3DiscoverLlm).await;
        }

        let _ = self
            .decision_log
            .append(DecisionLogEntry {
                id: Uuid::new_v4(),
                url: request.url.clone(),
                site: request.site.clone(),
                use_case: UseCase::Uc3,
                proposer_output: Some(proposer_output),
                validator_output: Some(validator_output),
                consensus: Some(consensus_result.clone()),
                final_action,
                retry_count: state.uc3_retry_count,
                ts: Utc::now(),
            })
            .await;

        state.uc3_result = Some(consensus_result);
        cost
    }

    /// `put_new`, falling back to `replace` if a record already exists
    /// (a concurrent request discovered the same site first).
    async fn upsert_selector_record(
        &self,
        request: &ArticleRequest,
        set: SelectorSet,
        source: SelectorSource,
    ) -> Option<SelectorRecord> {
        match self.selector_store.put_new(&request.site, set.clone(), source).await {
            Ok(record) => Some(record),
            Err(_) => self.selector_store.replace(&request.site, set, source).await.ok(),
        }
    }

    /// Records one `CostMetric` per call actually made — a Proposer or
    /// Validator step may spend tokens more than once (schema violation
    /// then fallback), and each spend must show up in the Cost Meter.
    async fn record_costs(&self, metas: &[AgentCallMeta], use_case: UseCase, request: &ArticleRequest) -> f64 {
        let mut total = 0.0;
        for meta in metas {
            let (input_cost, output_cost, total_cost) =
                pricing::cost(&meta.provider, &meta.model, meta.input_tokens, meta.output_tokens);
            let metric = CostMetric {
                id: Uuid::new_v4(),
                ts: Utc::now(),
                provider: meta.provider.clone(),
                model: meta.model.clone(),
                use_case,
                site: request.site.clone(),
                url: request.url.clone(),
                input_tokens: meta.input_tokens,
                output_tokens: meta.output_tokens,
                input_cost,
                output_cost,
                total_cost,
            };
            let _ = self.cost_meter.record(metric).await;
            total += total_cost;
        }
        total
    }

    /// A cheap, request-scoped profile. Tag-distribution similarity is
    /// left at zero here since computing it would require re-parsing
    /// the DOM purely for this purpose; language/news-domain signals
    /// still give the Few-Shot Retriever something to rank on.
    fn site_profile(&self, request: &ArticleRequest) -> SiteProfile {
        SiteProfile {
            language: request.hints.as_ref().and_then(|h| h.language.clone()),
            is_news: true,
            tag_histogram: Default::default(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn finalize(state: MasterState, reason: TerminalReason, cost_usd: f64) -> OrchestrationResult {
    let ok = reason == TerminalReason::Ok;
    OrchestrationResult {
        ok,
        article: if ok { state.article } else { None },
        quality: if ok { state.uc1_report.map(|r| r.score) } else { None },
        method: if ok { state.extraction_method } else { None },
        history: state.history,
        reason: reason.as_str().to_string(),
        cost_usd,
    }
}
