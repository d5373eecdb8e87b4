//! Engine configuration.
//!
//! Builder-pattern struct with compiled-in defaults, following the same
//! shape as a typical `*Config` type in this codebase: `Default` impl,
//! `with_*` setters, serde round-trippable.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Weights applied to proposer confidence, validator confidence, and
/// measured extraction quality when computing a consensus score.
/// MUST sum to 1.0 — rejected at startup rather than silently
/// normalized, see DESIGN.md.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConsensusWeights {
    pub proposer: f32,
    pub validator: f32,
    pub extraction: f32,
}

impl Default for ConsensusWeights {
    fn default() -> Self {
        Self {
            proposer: 0.3,
            validator: 0.3,
            extraction: 0.4,
        }
    }
}

impl ConsensusWeights {
    pub fn validate(&self) -> Result<(), EngineError> {
        let sum = self.proposer + self.validator + self.extraction;
        if (sum - 1.0).abs() > 1e-6 {
            return Err(EngineError::Config(format!(
                "CONSENSUS_WEIGHTS must sum to 1.0, got {sum}"
            )));
        }
        Ok(())
    }
}

/// Consensus acceptance thresholds for one use case (UC2 or UC3).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConsensusThresholds {
    pub high: f32,
    pub medium: f32,
}

/// Identifies one LLM vendor + model, e.g. the Proposer or Validator slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderIdentity {
    pub provider: String,
    pub model: String,
    pub fallback_model: Option<String>,
}

impl ProviderIdentity {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            fallback_model: None,
        }
    }

    pub fn with_fallback(mut self, model: impl Into<String>) -> Self {
        self.fallback_model = Some(model.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub quality_threshold: u32,
    pub json_ld_quality_threshold: f32,
    pub uc2_thresholds: ConsensusThresholds,
    pub uc3_thresholds: ConsensusThresholds,
    pub consensus_weights: ConsensusWeights,
    pub uc2_max_retries: u32,
    pub uc3_max_retries: u32,
    pub max_failures_before_heal: u32,
    pub max_loops: u32,
    pub proposer_html_max: usize,
    pub discoverer_html_max: usize,
    pub few_shot_k: usize,
    #[serde(with = "duration_secs")]
    pub agent_timeout: Duration,
    #[serde(with = "duration_secs")]
    pub request_deadline: Duration,
    pub proposer: ProviderIdentity,
    pub validator: ProviderIdentity,
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            quality_threshold: 80,
            json_ld_quality_threshold: 0.7,
            uc2_thresholds: ConsensusThresholds {
                high: 0.75,
                medium: 0.50,
            },
            uc3_thresholds: ConsensusThresholds {
                high: 0.70,
                medium: 0.50,
            },
            consensus_weights: ConsensusWeights::default(),
            uc2_max_retries: 3,
            uc3_max_retries: 3,
            max_failures_before_heal: 1,
            max_loops: 3,
            proposer_html_max: 20_000,
            discoverer_html_max: 15_000,
            few_shot_k: 5,
            agent_timeout: Duration::from_secs(30),
            request_deadline: Duration::from_secs(120),
            proposer: ProviderIdentity::new("openai", "gpt-4o-mini"),
            validator: ProviderIdentity::new("anthropic", "claude-3-5-haiku-20241022"),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quality_threshold(mut self, threshold: u32) -> Self {
        self.quality_threshold = threshold;
        self
    }

    pub fn with_consensus_weights(mut self, weights: ConsensusWeights) -> Self {
        self.consensus_weights = weights;
        self
    }

    pub fn with_max_loops(mut self, max_loops: u32) -> Self {
        self.max_loops = max_loops;
        self
    }

    pub fn with_providers(mut self, proposer: ProviderIdentity, validator: ProviderIdentity) -> Self {
        self.proposer = proposer;
        self.validator = validator;
        self
    }

    /// Validate invariants that must hold before the engine will run:
    /// weights sum to 1.0, and warn if both slots share a vendor family.
    pub fn validate(&self) -> Result<(), EngineError> {
        self.consensus_weights.validate()?;
        if self.proposer.provider == self.validator.provider {
            tracing::warn!(
                provider = %self.proposer.provider,
                "proposer and validator are routed to the same vendor family; \
                 consensus independence is not guaranteed"
            );
        }
        Ok(())
    }

    /// Load overrides from environment variables, falling back to
    /// compiled-in defaults for anything unset. Callers typically call
    /// `dotenvy::dotenv().ok()` before this, matching this codebase's
    /// binary bootstrap convention.
    pub fn from_env() -> Result<Self, EngineError> {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("QUALITY_THRESHOLD") {
            config.quality_threshold = v
                .parse()
                .map_err(|_| EngineError::Config("QUALITY_THRESHOLD must be an integer".into()))?;
        }
        if let Ok(v) = std::env::var("JSON_LD_QUALITY_THRESHOLD") {
            config.json_ld_quality_threshold = v
                .parse()
                .map_err(|_| EngineError::Config("JSON_LD_QUALITY_THRESHOLD must be a float".into()))?;
        }
        if let Ok(v) = std::env::var("MAX_LOOPS") {
            config.max_loops = v
                .parse()
                .map_err(|_| EngineError::Config("MAX_LOOPS must be an integer".into()))?;
        }
        if let Ok(v) = std::env::var("PROPOSER_PROVIDER") {
            config.proposer.provider = v;
        }
        if let Ok(v) = std::env::var("PROPOSER_MODEL") {
            config.proposer.model = v;
        }
        if let Ok(v) = std::env::var("VALIDATOR_PROVIDER") {
            config.validator.provider = v;
        }
        if let Ok(v) = std::env::var("VALIDATOR_MODEL") {
            config.validator.model = v;
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_one() {
        assert!(ConsensusWeights::default().validate().is_ok());
    }

    #[test]
    fn test_bad_weights_rejected() {
        let weights = ConsensusWeights {
            proposer: 0.5,
            validator: 0.5,
            extraction: 0.5,
        };
        assert!(weights.validate().is_err());
    }

    #[test]
    fn test_default_config_validates() {
        assert!(EngineConfig::default().validate().is_ok());
    }
}
