//! Adaptive, self-healing web article extraction.
//!
//! Three use cases share one Supervisor loop:
//!
//! - **UC1 (Quality Gate)** — reuse a known-good `SelectorSet`, score
//!   the result, and only fall through if the score misses threshold.
//! - **UC2 (Self-Healing)** — a Proposer/Validator LLM pair propose and
//!   independently check new selectors; consensus decides acceptance.
//! - **UC3 (Discovery)** — a JSON-LD/Open Graph fast path, or the same
//!   Proposer/Validator consensus machinery seeded from DOM statistics.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use engine::{ArticleRequest, EngineConfig, Orchestrator};
//! use engine::agents::{ProposerAgent, ValidatorAgent};
//! use engine::llm::adapters::{OpenAiAdapter, AnthropicAdapter};
//! use engine::store::memory::{MemorySelectorStore, MemoryDecisionLog, MemoryCostMeter};
//! use std::sync::Arc;
//!
//! let config = EngineConfig::default();
//! config.validate()?;
//!
//! let proposer = ProposerAgent::new(
//!     Arc::new(OpenAiAdapter::from_env()?),
//!     config.proposer.clone(),
//!     config.proposer_html_max,
//!     config.agent_timeout,
//! );
//! let validator = ValidatorAgent::new(
//!     Arc::new(AnthropicAdapter::from_env()?),
//!     config.validator.clone(),
//!     4096,
//!     config.agent_timeout,
//! );
//!
//! let orchestrator = Orchestrator::new(
//!     my_fetcher,
//!     Arc::new(MemorySelectorStore::new()),
//!     Arc::new(MemoryDecisionLog::new()),
//!     Arc::new(MemoryCostMeter::new()),
//!     proposer,
//!     validator,
//!     config,
//! );
//!
//! let result = orchestrator.run(ArticleRequest { url, site, hints: None }).await;
//! ```

pub mod agents;
pub mod config;
pub mod consensus;
pub mod css;
pub mod dom;
pub mod error;
pub mod evaluator;
pub mod fewshot;
pub mod llm;
pub mod metadata;
pub mod orchestrator;
pub mod patterns;
pub mod pricing;
pub mod quality;
pub mod store;
pub mod supervisor;
pub mod types;

pub mod testing;

pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use orchestrator::{Fetcher, Orchestrator};
pub use types::{ArticleRequest, ExtractedArticle, OrchestrationResult, RequestHints};
