//! Selector Store (C8), Decision Log (C9), and Cost Meter (C10) trait
//! definitions. Concrete backends live in [`memory`] (testing/dev) and,
//! behind the `postgres` feature, [`postgres`].

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use crate::error::StoreError;
use crate::types::{CostMetric, DecisionLogEntry, SelectorRecord, SelectorSet, SelectorSource};
use async_trait::async_trait;

type Result<T> = std::result::Result<T, StoreError>;

/// Site-keyed persistent store of `SelectorSet`s. Updates MUST be
/// transactional: a concurrent reader sees either the full new set or
/// the full old one, never a partial write.
#[async_trait]
pub trait SelectorStore: Send + Sync {
    async fn get(&self, site: &str) -> Result<Option<SelectorRecord>>;

    /// Fails with [`StoreError::AlreadyExists`] if a record for `site`
    /// already exists.
    async fn put_new(&self, site: &str, set: SelectorSet, source: SelectorSource) -> Result<SelectorRecord>;

    /// Atomically replaces the record, advancing `updated_at`.
    async fn replace(&self, site: &str, set: SelectorSet, source: SelectorSource) -> Result<SelectorRecord>;

    async fn mark_success(&self, site: &str) -> Result<()>;

    async fn mark_failure(&self, site: &str) -> Result<()>;
}

/// Append-only audit log of agent proposals, validations, consensus
/// outcomes, and final actions.
#[async_trait]
pub trait DecisionLog: Send + Sync {
    async fn append(&self, entry: DecisionLogEntry) -> Result<()>;

    async fn for_site(&self, site: &str) -> Result<Vec<DecisionLogEntry>>;
}

/// Append-only per-call token/cost ledger.
#[async_trait]
pub trait CostMeter: Send + Sync {
    async fn record(&self, metric: CostMetric) -> Result<()>;

    async fn total_for_site(&self, site: &str) -> Result<f64>;
}
