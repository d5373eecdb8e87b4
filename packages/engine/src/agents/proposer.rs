//! Proposer Agent (C5): given an HTML sample, few-shot examples, and
//! optional site hints (plus `DomCandidates` in UC3), asks the
//! configured LLM for a candidate `SelectorSet` with self-reported
//! confidence. Never executes selectors itself.

use crate::config::ProviderIdentity;
use crate::llm::{AgentCallMeta, LlmAdapter};
use crate::types::{DomCandidates, ProposedSelectors, ProposerOutput, SelectorRecord};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Everything the Proposer needs to build one prompt.
pub struct ProposerContext<'a> {
    pub html: &'a str,
    pub few_shot: &'a [SelectorRecord],
    pub site_hints: Option<&'a str>,
    pub dom_candidates: Option<&'a DomCandidates>,
}

pub struct ProposerAgent {
    adapter: Arc<dyn LlmAdapter>,
    identity: ProviderIdentity,
    html_max: usize,
    timeout: Duration,
}

/// The LLM's wire response shape: `title_selector, body_selector,
/// date_selector, confidence, reasoning`, flattened to top level. Kept
/// local since only this agent speaks this dialect.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct ProposerWire {
    #[serde(flatten)]
    selectors: ProposedSelectors,
    confidence: f32,
    reasoning: String,
}

impl ProposerAgent {
    pub fn new(adapter: Arc<dyn LlmAdapter>, identity: ProviderIdentity, html_max: usize, timeout: Duration) -> Self {
        Self { adapter, identity, html_max, timeout }
    }

    /// `propose(request_context) -> (ProposerOutput, Vec<AgentCallMeta>)`.
    /// Never raises: a schema violation on both the primary and
    /// fallback model yields `confidence = 0` with a diagnostic
    /// `reasoning`. Every model actually invoked gets its own
    /// `AgentCallMeta` in the returned vec, in call order, even ones
    /// that parsed invalid JSON and fell through to the fallback — a
    /// schema-violating response still spent real tokens and the Cost
    /// Meter must account for it.
    pub async fn propose(&self, ctx: &ProposerContext<'_>) -> (ProposerOutput, Vec<AgentCallMeta>) {
        let prompt = build_prompt(ctx, self.html_max);
        let schema = serde_json::to_value(schemars::schema_for!(ProposerWire))
            .expect("ProposerWire schema serializes");
        let mut metas = Vec::new();

        match self.invoke_and_parse(&self.identity.model, &prompt, &schema).await {
            Ok((output, meta)) => {
                metas.push(meta);
                return (output, metas);
            }
            Err(attempt) => metas.extend(attempt.meta),
        }

        if let Some(fallback) = &self.identity.fallback_model {
            match self.invoke_and_parse(fallback, &prompt, &schema).await {
                Ok((output, meta)) => {
                    metas.push(meta);
                    return (output, metas);
                }
                Err(attempt) => metas.extend(attempt.meta),
            }
        }

        let output = ProposerOutput {
            selectors: ProposedSelectors {
                title_selector: String::new(),
                body_selector: String::new(),
                date_selector: String::new(),
            },
            confidence: 0.0,
            reasoning: "proposer failed to produce a schema-conformant response after fallback".to_string(),
        };
        (output, metas)
    }

    /// Invokes `model` and parses its response. On schema violation the
    /// call still happened and spent tokens, so the failure carries the
    /// `AgentCallMeta` for it; a transport/timeout failure never reached
    /// the model at all, so it carries none.
    async fn invoke_and_parse(
        &self,
        model: &str,
        prompt: &str,
        schema: &serde_json::Value,
    ) -> Result<(ProposerOutput, AgentCallMeta), FailedAttempt> {
        let invocation = self
            .adapter
            .invoke(model, prompt, schema, self.timeout)
            .await
            .map_err(|_| FailedAttempt::none())?;
        let meta = AgentCallMeta {
            provider: self.identity.provider.clone(),
            model: model.to_string(),
            input_tokens: invocation.input_tokens,
            output_tokens: invocation.output_tokens,
        };
        let wire: ProposerWire = serde_json::from_value(invocation.json)
            .map_err(|_| FailedAttempt::spent(meta.clone()))?;
        Ok((
            ProposerOutput {
                selectors: wire.selectors,
                confidence: wire.confidence,
                reasoning: wire.reasoning,
            },
            meta,
        ))
    }
}

/// A model call that didn't yield usable output. Carries the spent
/// `AgentCallMeta` when the call itself succeeded but the response
/// violated the schema; `None` when the call never completed at all.
/// Shared with [`super::validator::ValidatorAgent`], which speaks the
/// same primary/fallback protocol.
pub(super) struct FailedAttempt {
    pub(super) meta: Option<AgentCallMeta>,
}

impl FailedAttempt {
    pub(super) fn none() -> Self {
        Self { meta: None }
    }

    pub(super) fn spent(meta: AgentCallMeta) -> Self {
        Self { meta: Some(meta) }
    }
}

fn build_prompt(ctx: &ProposerContext<'_>, html_max: usize) -> String {
    let sample: String = ctx.html.chars().take(html_max).collect();

    let mut prompt = String::new();
    prompt.push_str(
        "You are an expert web page structure analyst. Given the HTML sample below, \
         propose CSS selectors (or a meta:KEY sentinel) that extract the article title, \
         body, and publish date. Respond with a single JSON object matching the provided \
         schema: no prose, no markdown fences.\n\n",
    );

    if let Some(hints) = ctx.site_hints {
        prompt.push_str(&format!("Site hints: {hints}\n\n"));
    }

    if !ctx.few_shot.is_empty() {
        prompt.push_str("Examples of selectors that worked on structurally similar sites:\n");
        for record in ctx.few_shot {
            prompt.push_str(&format!(
                "- site={} title={} body={} date={}\n",
                record.site,
                record.set.title.to_wire(),
                record.set.body.to_wire(),
                record.set.date.to_wire(),
            ));
        }
        prompt.push('\n');
    }

    if let Some(candidates) = ctx.dom_candidates {
        prompt.push_str(&format!(
            "DOM analysis candidates: title={:?} body={:?} date={:?}\n\n",
            candidates.title, candidates.body, candidates.date
        ));
    }

    prompt.push_str("HTML sample:\n");
    prompt.push_str(&sample);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Invocation;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedAdapter {
        calls: AtomicUsize,
        responses: Vec<Result<serde_json::Value, ()>>,
    }

    #[async_trait]
    impl LlmAdapter for FixedAdapter {
        fn provider(&self) -> &str {
            "test"
        }

        async fn invoke(
            &self,
            _model: &str,
            _prompt: &str,
            _schema: &serde_json::Value,
            _timeout: Duration,
        ) -> Result<Invocation, crate::error::AgentError> {
            let i = self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.responses[i] {
                Ok(json) => Ok(Invocation {
                    json: json.clone(),
                    input_tokens: 10,
                    output_tokens: 10,
                    raw_text: json.to_string(),
                    latency: Duration::from_millis(1),
                }),
                Err(_) => Err(crate::error::AgentError::SchemaViolation("bad json".into())),
            }
        }
    }

    fn identity(fallback: Option<&str>) -> ProviderIdentity {
        ProviderIdentity {
            provider: "test".to_string(),
            model: "primary".to_string(),
            fallback_model: fallback.map(String::from),
        }
    }

    #[tokio::test]
    async fn test_propose_success_on_first_try() {
        let adapter = Arc::new(FixedAdapter {
            calls: AtomicUsize::new(0),
            responses: vec![Ok(serde_json::json!({
                "title_selector": "h1", "body_selector": "article",
                "date_selector": "time", "confidence": 0.9, "reasoning": "clear structure"
            }))],
        });
        let agent = ProposerAgent::new(adapter, identity(None), 20000, Duration::from_secs(30));
        let ctx = ProposerContext { html: "<html></html>", few_shot: &[], site_hints: None, dom_candidates: None };
        let (output, metas) = agent.propose(&ctx).await;
        assert_eq!(output.confidence, 0.9);
        assert_eq!(output.selectors.title_selector, "h1");
        assert_eq!(metas.len(), 1);
        assert_eq!(metas[0].input_tokens, 10);
    }

    #[tokio::test]
    async fn test_propose_falls_back_then_zero_confidence() {
        let adapter = Arc::new(FixedAdapter {
            calls: AtomicUsize::new(0),
            responses: vec![Err(()), Err(())],
        });
        let agent = ProposerAgent::new(adapter, identity(Some("fallback-model")), 20000, Duration::from_secs(30));
        let ctx = ProposerContext { html: "<html></html>", few_shot: &[], site_hints: None, dom_candidates: None };
        let (output, metas) = agent.propose(&ctx).await;
        assert_eq!(output.confidence, 0.0);
        assert!(metas.is_empty(), "SchemaViolation on a bad-json adapter carries no Invocation, so no meta");
    }

    #[tokio::test]
    async fn test_propose_records_meta_for_schema_violation_before_fallback() {
        let adapter = Arc::new(FixedAdapter {
            calls: AtomicUsize::new(0),
            responses: vec![
                Ok(serde_json::json!({"not": "a proposer shape"})),
                Ok(serde_json::json!({
                    "title_selector": "h1", "body_selector": "article",
                    "date_selector": "time", "confidence": 0.8, "reasoning": "recovered"
                })),
            ],
        });
        let agent = ProposerAgent::new(adapter, identity(Some("fallback-model")), 20000, Duration::from_secs(30));
        let ctx = ProposerContext { html: "<html></html>", few_shot: &[], site_hints: None, dom_candidates: None };
        let (output, metas) = agent.propose(&ctx).await;
        assert_eq!(output.confidence, 0.8);
        assert_eq!(metas.len(), 2, "the schema-violating primary call and the successful fallback both cost tokens");
        assert_eq!(metas[0].model, "primary");
        assert_eq!(metas[1].model, "fallback-model");
    }

    #[test]
    fn test_build_prompt_includes_few_shot() {
        let record = SelectorRecord {
            site: "example".to_string(),
            set: crate::types::SelectorSet::new(
                crate::types::Selector::parse("h1"),
                crate::types::Selector::parse("article"),
                crate::types::Selector::parse("time"),
            ),
            source: crate::types::SelectorSource::Uc1Reuse,
            success_count: 5,
            failure_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let ctx = ProposerContext { html: "<html></html>", few_shot: &[record], site_hints: Some("news site"), dom_candidates: None };
        let prompt = build_prompt(&ctx, 100);
        assert!(prompt.contains("news site"));
        assert!(prompt.contains("site=example"));
    }
}
