//! Consensus Calculator (C7): folds Proposer confidence, Validator
//! confidence, and measured extraction quality into a scalar consensus
//! with a tiered decision.

use crate::config::{ConsensusThresholds, ConsensusWeights};
use crate::types::{AgentContributions, ConsensusResult, ConsensusTier, SelectorSet};

/// `consensus(proposer_conf, validator_conf, extraction_quality) ->
/// ConsensusResult`. Weights and thresholds are caller-supplied so UC2
/// and UC3 can apply their own tuned defaults.
pub fn consensus(
    proposer_conf: f32,
    validator_conf: f32,
    extraction_quality: f32,
    weights: &ConsensusWeights,
    thresholds: &ConsensusThresholds,
    selectors: Option<SelectorSet>,
) -> ConsensusResult {
    let score = weights.proposer * proposer_conf
        + weights.validator * validator_conf
        + weights.extraction * extraction_quality;

    let tier = if score >= thresholds.high {
        ConsensusTier::High
    } else if score >= thresholds.medium {
        ConsensusTier::Medium
    } else {
        ConsensusTier::Reject
    };

    ConsensusResult {
        score,
        tier,
        selectors: if tier.accepts() { selectors } else { None },
        agent_contributions: AgentContributions {
            proposer_confidence: proposer_conf,
            validator_confidence: validator_conf,
            extraction_quality,
        },
    }
}
