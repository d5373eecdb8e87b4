//! Validator Agent (C6): applies proposed selectors to the DOM itself
//! (via the Selector Evaluator), then asks a provider-heterogeneous LLM
//! to judge validity and confidence, optionally refining the selectors.

use crate::config::ProviderIdentity;
use crate::evaluator;
use crate::llm::{AgentCallMeta, LlmAdapter};
use crate::types::{ProposedSelectors, SelectorSet, ValidatorOutput};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

pub struct ValidatorAgent {
    adapter: Arc<dyn LlmAdapter>,
    identity: ProviderIdentity,
    max_tokens: u32,
    timeout: Duration,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct ValidatorWire {
    is_valid: bool,
    confidence: f32,
    chosen_selectors: ProposedSelectors,
    feedback: String,
}

impl ValidatorAgent {
    pub fn new(adapter: Arc<dyn LlmAdapter>, identity: ProviderIdentity, max_tokens: u32, timeout: Duration) -> Self {
        Self { adapter, identity, max_tokens, timeout }
    }

    /// `validate(selectors, dom, raw_html) -> (ValidatorOutput,
    /// Vec<AgentCallMeta>)`. Falls back like the Proposer on schema
    /// violation; never raises. Every model actually invoked — including
    /// one whose response violated the schema — gets its own
    /// `AgentCallMeta` in the returned vec, in call order.
    pub async fn validate(&self, selectors: &SelectorSet, raw_html: &str) -> (ValidatorOutput, Vec<AgentCallMeta>) {
        let measured = evaluator::evaluate(raw_html, selectors);
        let prompt = build_prompt(selectors, &measured, raw_html, self.max_tokens);
        let schema =
            serde_json::to_value(schemars::schema_for!(ValidatorWire)).expect("ValidatorWire schema serializes");
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

        let output = ValidatorOutput {
            is_valid: false,
            confidence: 0.0,
            chosen_selectors: selectors.clone(),
            feedback: "validator failed to produce a schema-conformant response after fallback".to_string(),
        };
        (output, metas)
    }

    async fn invoke_and_parse(
        &self,
        model: &str,
        prompt: &str,
        schema: &serde_json::Value,
    ) -> Result<(ValidatorOutput, AgentCallMeta), super::proposer::FailedAttempt> {
        let invocation = self
            .adapter
            .invoke(model, prompt, schema, self.timeout)
            .await
            .map_err(|_| super::proposer::FailedAttempt::none())?;
        let meta = AgentCallMeta {
            provider: self.identity.provider.clone(),
            model: model.to_string(),
            input_tokens: invocation.input_tokens,
            output_tokens: invocation.output_tokens,
        };
        let wire: ValidatorWire = serde_json::from_value(invocation.json)
            .map_err(|_| super::proposer::FailedAttempt::spent(meta.clone()))?;
        Ok((
            ValidatorOutput {
                is_valid: wire.is_valid,
                confidence: wire.confidence,
                chosen_selectors: wire.chosen_selectors.into_selector_set(),
                feedback: wire.feedback,
            },
            meta,
        ))
    }
}

fn build_prompt(
    selectors: &SelectorSet,
    measured: &crate::types::ExtractionReport,
    raw_html: &str,
    html_max: u32,
) -> String {
    let sample: String = raw_html.chars().take(html_max as usize).collect();
    format!(
        "You are an independent reviewer of proposed web page selectors. Given the proposed \
         selectors, the values they extracted, and the HTML sample, judge validity and \
         confidence. You may refine the selectors in `chosen_selectors` if you find a better \
         option. Respond with a single JSON object matching the provided schema: no prose.\n\n\
         Proposed selectors: title={} body={} date={}\n\
         Extracted values: title={:?} body={:?} date={:?}\n\
         Per-field quality: title={} body={} date={} combined={}\n\n\
         HTML sample:\n{sample}",
        selectors.title.to_wire(),
        selectors.body.to_wire(),
        selectors.date.to_wire(),
        measured.title,
        measured.body,
        measured.date,
        measured.title_quality,
        measured.body_quality,
        measured.date_quality,
        measured.combined,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Invocation;
    use crate::types::Selector;
    use async_trait::async_trait;

    struct OkAdapter;

    #[async_trait]
    impl LlmAdapter for OkAdapter {
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
            Ok(Invocation {
                json: serde_json::json!({
                    "is_valid": true, "confidence": 0.88,
                    "chosen_selectors": {"title_selector": "h1", "body_selector": "article", "date_selector": "time"},
                    "feedback": "looks good"
                }),
                input_tokens: 5,
                output_tokens: 5,
                raw_text: "{}".to_string(),
                latency: Duration::from_millis(1),
            })
        }
    }

    #[tokio::test]
    async fn test_validate_success() {
        let agent = ValidatorAgent::new(
            Arc::new(OkAdapter),
            ProviderIdentity::new("test", "primary"),
            1024,
            Duration::from_secs(30),
        );
        let selectors = SelectorSet::new(Selector::parse("h1"), Selector::parse("article"), Selector::parse("time"));
        let (output, metas) = agent.validate(&selectors, "<html><body><h1>Headline Text</h1></body></html>").await;
        assert!(output.is_valid);
        assert_eq!(output.confidence, 0.88);
        assert_eq!(metas.len(), 1);
        assert_eq!(metas[0].input_tokens, 5);
    }
}
