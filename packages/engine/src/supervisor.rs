//! Supervisor / Router (C12): a pure state-transition function. No I/O,
//! no LLM calls. `route` is total — every branch of `MasterState` has a
//! defined outcome.

use crate::config::EngineConfig;
use crate::types::{CurrentUc, ExtractionMethod, MasterState, TerminalReason};

/// The subsystem (or terminal state) the Orchestrator should run next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    Uc1,
    Uc2,
    Uc3,
    End,
}

/// `route(state) -> (next, state')`. Dispatches on the per-use-case
/// transition rules, returning the next subsystem to run and the state
/// updated with counters/flags for that decision (the Orchestrator
/// still owns invoking the subsystem and persisting its result back
/// into `state'`).
///
/// `loop_count` is the global guard against endless UC1↔UC2/UC3
/// cycling: it advances once per completed heal/discover cycle (a UC2
/// or UC3 acceptance that would otherwise route back to UC1), not once
/// per `route` call — a single UC1 quality check or a UC2/UC3 internal
/// retry doesn't spend a loop. See `route_after_uc2`/`route_after_uc3`.
pub fn route(state: &MasterState, config: &EngineConfig) -> (Next, MasterState) {
    let mut next_state = state.clone();

    match state.current_uc {
        CurrentUc::None => {
            if state.selector_record.is_none() {
                (Next::Uc3, next_state)
            } else {
                (Next::Uc1, next_state)
            }
        }
        CurrentUc::Uc1 => route_after_uc1(state, config, &mut next_state),
        CurrentUc::Uc2 => route_after_uc2(state, config, &mut next_state),
        CurrentUc::Uc3 => route_after_uc3(state, config, &mut next_state),
    }
}

fn route_after_uc1(state: &MasterState, config: &EngineConfig, next_state: &mut MasterState) -> (Next, MasterState) {
    let score = state.uc1_report.as_ref().map(|r| r.score).unwrap_or(0);

    if score >= config.quality_threshold {
        next_state.terminal_reason = Some(TerminalReason::Ok);
        next_state.came_from_uc3_accept = false;
        return (Next::End, next_state.clone());
    }

    if state.came_from_uc3_accept {
        next_state.terminal_reason = Some(TerminalReason::PostDiscoveryQualityFailed);
        next_state.came_from_uc3_accept = false;
        return (Next::End, next_state.clone());
    }

    if state.failure_count < config.max_failures_before_heal {
        next_state.failure_count += 1;
        return (Next::Uc2, next_state.clone());
    }

    next_state.terminal_reason = Some(TerminalReason::QualityExhausted);
    (Next::End, next_state.clone())
}

fn route_after_uc2(state: &MasterState, config: &EngineConfig, next_state: &mut MasterState) -> (Next, MasterState) {
    let accepted = state.uc2_result.as_ref().map(|r| r.tier.accepts()).unwrap_or(false);

    if accepted {
        next_state.loop_count += 1;
        if next_state.loop_count >= config.max_loops {
            next_state.terminal_reason = Some(TerminalReason::LoopBound);
            return (Next::End, next_state.clone());
        }
        next_state.failure_count = 0;
        next_state.extraction_method = Some(ExtractionMethod::Heal);
        next_state.came_from_uc3_accept = false;
        return (Next::Uc1, next_state.clone());
    }

    if state.uc2_retry_count < config.uc2_max_retries {
        next_state.uc2_retry_count += 1;
        return (Next::Uc2, next_state.clone());
    }

    next_state.terminal_reason = Some(TerminalReason::Uc2Exhausted);
    (Next::End, next_state.clone())
}

fn route_after_uc3(state: &MasterState, config: &EngineConfig, next_state: &mut MasterState) -> (Next, MasterState) {
    let fast_path_succeeded = state
        .metadata_candidate
        .as_ref()
        .map(|m| m.quality >= config.json_ld_quality_threshold)
        .unwrap_or(false);
    let accepted = fast_path_succeeded || state.uc3_result.as_ref().map(|r| r.tier.accepts()).unwrap_or(false);

    if accepted {
        next_state.loop_count += 1;
        if next_state.loop_count >= config.max_loops {
            next_state.terminal_reason = Some(TerminalReason::LoopBound);
            return (Next::End, next_state.clone());
        }
        next_state.extraction_method = Some(ExtractionMethod::Discover);
        next_state.came_from_uc3_accept = true;
        return (Next::Uc1, next_state.clone());
    }

    if state.uc3_retry_count < config.uc3_max_retries {
        next_state.uc3_retry_count += 1;
        return (Next::Uc3, next_state.clone());
    }

    next_state.terminal_reason = Some(TerminalReason::DiscoveryFailed);
    (Next::End, next_state.clone())
}
