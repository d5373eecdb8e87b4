//! In-memory implementations of the Selector Store, Decision Log, and
//! Cost Meter. Useful for testing and development; data is lost on
//! restart.

use super::{CostMeter, DecisionLog, SelectorStore};
use crate::error::StoreError;
use crate::types::{CostMetric, DecisionLogEntry, SelectorRecord, SelectorSet, SelectorSource};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;

type Result<T> = std::result::Result<T, StoreError>;

/// In-memory Selector Store keyed by site. `RwLock<HashMap<_>>` gives
/// linearizable-per-site reads and writes without a database.
#[derive(Default)]
pub struct MemorySelectorStore {
    records: RwLock<HashMap<String, SelectorRecord>>,
}

impl MemorySelectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SelectorStore for MemorySelectorStore {
    async fn get(&self, site: &str) -> Result<Option<SelectorRecord>> {
        Ok(self.records.read().unwrap().get(site).cloned())
    }

    async fn put_new(&self, site: &str, set: SelectorSet, source: SelectorSource) -> Result<SelectorRecord> {
        let mut records = self.records.write().unwrap();
        if records.contains_key(site) {
            return Err(StoreError::AlreadyExists(site.to_string()));
        }
        let now = Utc::now();
        let record = SelectorRecord {
            site: site.to_string(),
            set,
            source,
            success_count: 0,
            failure_count: 0,
            created_at: now,
            updated_at: now,
        };
        records.insert(site.to_string(), record.clone());
        Ok(record)
    }

    async fn replace(&self, site: &str, set: SelectorSet, source: SelectorSource) -> Result<SelectorRecord> {
        let mut records = self.records.write().unwrap();
        let now = Utc::now();
        let record = match records.get(site) {
            Some(existing) => SelectorRecord {
                site: site.to_string(),
                set,
                source,
                success_count: existing.success_count,
                failure_count: existing.failure_count,
                created_at: existing.created_at,
                updated_at: now,
            },
            None => SelectorRecord {
                site: site.to_string(),
                set,
                source,
                success_count: 0,
                failure_count: 0,
                created_at: now,
                updated_at: now,
            },
        };
        records.insert(site.to_string(), record.clone());
        Ok(record)
    }

    async fn mark_success(&self, site: &str) -> Result<()> {
        let mut records = self.records.write().unwrap();
        let record = records.get_mut(site).ok_or_else(|| StoreError::NotFound(site.to_string()))?;
        record.success_count += 1;
        Ok(())
    }

    async fn mark_failure(&self, site: &str) -> Result<()> {
        let mut records = self.records.write().unwrap();
        let record = records.get_mut(site).ok_or_else(|| StoreError::NotFound(site.to_string()))?;
        record.failure_count += 1;
        Ok(())
    }
}

/// In-memory append-only Decision Log.
#[derive(Default)]
pub struct MemoryDecisionLog {
    entries: RwLock<Vec<DecisionLogEntry>>,
}

impl MemoryDecisionLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DecisionLog for MemoryDecisionLog {
    async fn append(&self, entry: DecisionLogEntry) -> Result<()> {
        self.entries.write().unwrap().push(entry);
        Ok(())
    }

    async fn for_site(&self, site: &str) -> Result<Vec<DecisionLogEntry>> {
        Ok(self
            .entries
            .read()
            .unwrap()
            .iter()
            .filter(|e| e.site == site)
            .cloned()
            .collect())
    }
}

/// In-memory append-only Cost Meter.
#[derive(Default)]
pub struct MemoryCostMeter {
    metrics: RwLock<Vec<CostMetric>>,
}

impl MemoryCostMeter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CostMeter for MemoryCostMeter {
    async fn record(&self, metric: CostMetric) -> Result<()> {
        self.metrics.write().unwrap().push(metric);
        Ok(())
    }

    async fn total_for_site(&self, site: &str) -> Result<f64> {
        Ok(self
            .metrics
            .read()
            .unwrap()
            .iter()
            .filter(|m| m.site == site)
            .map(|m| m.total_cost)
            .sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Selector;

    fn selectors() -> SelectorSet {
        SelectorSet::new(Selector::parse("h1"), Selector::parse("article"), Selector::parse("time"))
    }

    #[tokio::test]
    async fn test_put_new_then_get() {
        let store = MemorySelectorStore::new();
        store.put_new("example", selectors(), SelectorSource::Uc3DiscoverJsonLd).await.unwrap();
        let record = store.get("example").await.unwrap().unwrap();
        assert_eq!(record.site, "example");
        assert_eq!(record.success_count, 0);
    }

    #[tokio::test]
    async fn test_put_new_twice_fails() {
        let store = MemorySelectorStore::new();
        store.put_new("example", selectors(), SelectorSource::Uc3DiscoverJsonLd).await.unwrap();
        let result = store.put_new("example", selectors(), SelectorSource::Uc3DiscoverJsonLd).await;
        assert!(matches!(result, Err(StoreError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_replace_advances_updated_at_and_preserves_counters() {
        let store = MemorySelectorStore::new();
        store.put_new("example", selectors(), SelectorSource::Uc3DiscoverJsonLd).await.unwrap();
        store.mark_success("example").await.unwrap();
        let before = store.get("example").await.unwrap().unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        store.replace("example", selectors(), SelectorSource::Uc2Heal).await.unwrap();
        let after = store.get("example").await.unwrap().unwrap();

        assert!(after.updated_at > before.updated_at);
        assert_eq!(after.success_count, 1);
    }

    #[tokio::test]
    async fn test_decision_log_and_cost_meter_append_only() {
        let log = MemoryDecisionLog::new();
        let meter = MemoryCostMeter::new();

        let entry = DecisionLogEntry {
            id: uuid::Uuid::new_v4(),
            url: "https://example.com/a".to_string(),
            site: "example".to_string(),
            use_case: crate::types::UseCase::Uc2,
            proposer_output: None,
            validator_output: None,
            consensus: None,
            final_action: crate::types::FinalAction::Accept,
            retry_count: 0,
            ts: Utc::now(),
        };
        log.append(entry).await.unwrap();
        assert_eq!(log.for_site("example").await.unwrap().len(), 1);

        let metric = CostMetric {
            id: uuid::Uuid::new_v4(),
            ts: Utc::now(),
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            use_case: crate::types::UseCase::Uc2,
            site: "example".to_string(),
            url: "https://example.com/a".to_string(),
            input_tokens: 100,
            output_tokens: 50,
            input_cost: 0.01,
            output_cost: 0.01,
            total_cost: 0.02,
        };
        meter.record(metric).await.unwrap();
        assert!((meter.total_for_site("example").await.unwrap() - 0.02).abs() < 1e-9);
    }
}
