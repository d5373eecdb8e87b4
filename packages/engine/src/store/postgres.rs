//! PostgreSQL-backed Selector Store, Decision Log, and Cost Meter
//! (feature `postgres`).

use super::{CostMeter, DecisionLog, SelectorStore};
use crate::error::StoreError;
use crate::types::{
    ConsensusResult, CostMetric, DecisionLogEntry, FinalAction, ProposerOutput, Selector, SelectorRecord,
    SelectorSet, SelectorSource, UseCase, ValidatorOutput,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;

type Result<T> = std::result::Result<T, StoreError>;

/// Shared PostgreSQL-backed persistence for selectors, decision logs,
/// and cost metrics.
pub struct PostgresSelectorStore {
    pool: PgPool,
}

impl PostgresSelectorStore {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    pub async fn from_pool(pool: PgPool) -> Result<Self> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS selectors (
                id BIGSERIAL PRIMARY KEY,
                site TEXT NOT NULL UNIQUE,
                title_selector TEXT NOT NULL,
                body_selector TEXT NOT NULL,
                date_selector TEXT NOT NULL,
                source TEXT NOT NULL,
                success_count INTEGER NOT NULL DEFAULT 0,
                failure_count INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS decision_logs (
                id UUID PRIMARY KEY,
                url TEXT NOT NULL,
                site TEXT NOT NULL,
                use_case TEXT NOT NULL,
                proposer_output JSONB,
                validator_output JSONB,
                consensus_score DOUBLE PRECISION,
                consensus_tier TEXT,
                final_action TEXT NOT NULL,
                retry_count INTEGER NOT NULL,
                ts TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;
        sqlx::query("CREATE INDEX IF NOT EXISTS decision_logs_site_ts ON decision_logs (site, ts)")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cost_metrics (
                id UUID PRIMARY KEY,
                ts TIMESTAMPTZ NOT NULL,
                provider TEXT NOT NULL,
                model TEXT NOT NULL,
                use_case TEXT NOT NULL,
                site TEXT NOT NULL,
                url TEXT NOT NULL,
                input_tokens BIGINT NOT NULL,
                output_tokens BIGINT NOT NULL,
                input_cost DOUBLE PRECISION NOT NULL,
                output_cost DOUBLE PRECISION NOT NULL,
                total_cost DOUBLE PRECISION NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;
        sqlx::query("CREATE INDEX IF NOT EXISTS cost_metrics_ts_provider_uc ON cost_metrics (ts, provider, use_case)")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl SelectorStore for PostgresSelectorStore {
    async fn get(&self, site: &str) -> Result<Option<SelectorRecord>> {
        let row = sqlx::query(
            "SELECT site, title_selector, body_selector, date_selector, source, \
             success_count, failure_count, created_at, updated_at FROM selectors WHERE site = $1",
        )
        .bind(site)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(row.map(row_to_record))
    }

    async fn put_new(&self, site: &str, set: SelectorSet, source: SelectorSource) -> Result<SelectorRecord> {
        let now = Utc::now();
        let inserted = sqlx::query(
            "INSERT INTO selectors (site, title_selector, body_selector, date_selector, source, \
             success_count, failure_count, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, 0, 0, $6, $6) ON CONFLICT (site) DO NOTHING",
        )
        .bind(site)
        .bind(set.title.to_wire())
        .bind(set.body.to_wire())
        .bind(set.date.to_wire())
        .bind(source.as_str())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        if inserted.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists(site.to_string()));
        }

        Ok(SelectorRecord {
            site: site.to_string(),
            set,
            source,
            success_count: 0,
            failure_count: 0,
            created_at: now,
            updated_at: now,
        })
    }

    async fn replace(&self, site: &str, set: SelectorSet, source: SelectorSource) -> Result<SelectorRecord> {
        let now = Utc::now();
        let row = sqlx::query(
            "INSERT INTO selectors (site, title_selector, body_selector, date_selector, source, \
             success_count, failure_count, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, 0, 0, $6, $6) \
             ON CONFLICT (site) DO UPDATE SET \
             title_selector = EXCLUDED.title_selector, body_selector = EXCLUDED.body_selector, \
             date_selector = EXCLUDED.date_selector, source = EXCLUDED.source, updated_at = EXCLUDED.updated_at \
             RETURNING site, title_selector, body_selector, date_selector, source, \
             success_count, failure_count, created_at, updated_at",
        )
        .bind(site)
        .bind(set.title.to_wire())
        .bind(set.body.to_wire())
        .bind(set.date.to_wire())
        .bind(source.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(row_to_record(row))
    }

    async fn mark_success(&self, site: &str) -> Result<()> {
        let result = sqlx::query("UPDATE selectors SET success_count = success_count + 1 WHERE site = $1")
            .bind(site)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(site.to_string()));
        }
        Ok(())
    }

    async fn mark_failure(&self, site: &str) -> Result<()> {
        let result = sqlx::query("UPDATE selectors SET failure_count = failure_count + 1 WHERE site = $1")
            .bind(site)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(site.to_string()));
        }
        Ok(())
    }
}

fn row_to_record(row: sqlx::postgres::PgRow) -> SelectorRecord {
    let source: String = row.get("source");
    SelectorRecord {
        site: row.get("site"),
        set: SelectorSet::new(
            Selector::parse(row.get::<String, _>("title_selector")),
            Selector::parse(row.get::<String, _>("body_selector")),
            Selector::parse(row.get::<String, _>("date_selector")),
        ),
        source: parse_source(&source),
        success_count: row.get::<i32, _>("success_count") as u32,
        failure_count: row.get::<i32, _>("failure_count") as u32,
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
        updated_at: row.get::<DateTime<Utc>, _>("updated_at"),
    }
}

fn parse_source(raw: &str) -> SelectorSource {
    match raw {
        "uc1-reuse" => SelectorSource::Uc1Reuse,
        "uc2-heal" => SelectorSource::Uc2Heal,
        "uc3-discover-llm" => SelectorSource::Uc3DiscoverLlm,
        _ => SelectorSource::Uc3DiscoverJsonLd,
    }
}

/// PostgreSQL-backed Decision Log, sharing the pool with
/// [`PostgresSelectorStore`].
pub struct PostgresDecisionLog {
    pool: PgPool,
}

impl PostgresDecisionLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DecisionLog for PostgresDecisionLog {
    async fn append(&self, entry: DecisionLogEntry) -> Result<()> {
        let proposer_json = entry
            .proposer_output
            .as_ref()
            .map(|p| serde_json::to_value(p).unwrap_or(serde_json::Value::Null));
        let validator_json = entry
            .validator_output
            .as_ref()
            .map(|v| serde_json::to_value(v).unwrap_or(serde_json::Value::Null));
        let (consensus_score, consensus_tier) = entry
            .consensus
            .as_ref()
            .map(|c| (Some(c.score as f64), Some(format!("{:?}", c.tier).to_lowercase())))
            .unwrap_or((None, None));

        sqlx::query(
            "INSERT INTO decision_logs (id, url, site, use_case, proposer_output, validator_output, \
             consensus_score, consensus_tier, final_action, retry_count, ts) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(entry.id)
        .bind(entry.url)
        .bind(entry.site)
        .bind(entry.use_case.as_str())
        .bind(proposer_json)
        .bind(validator_json)
        .bind(consensus_score)
        .bind(consensus_tier)
        .bind(entry.final_action.as_str())
        .bind(entry.retry_count as i32)
        .bind(entry.ts)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn for_site(&self, site: &str) -> Result<Vec<DecisionLogEntry>> {
        let rows = sqlx::query(
            "SELECT id, url, site, use_case, proposer_output, validator_output, final_action, retry_count, ts \
             FROM decision_logs WHERE site = $1 ORDER BY ts",
        )
        .bind(site)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let proposer_output: Option<serde_json::Value> = row.get("proposer_output");
                let validator_output: Option<serde_json::Value> = row.get("validator_output");
                let use_case: String = row.get("use_case");
                let final_action: String = row.get("final_action");
                DecisionLogEntry {
                    id: row.get("id"),
                    url: row.get("url"),
                    site: row.get("site"),
                    use_case: if use_case == "uc2" { UseCase::Uc2 } else { UseCase::Uc3 },
                    proposer_output: proposer_output.and_then(|v| serde_json::from_value::<ProposerOutput>(v).ok()),
                    validator_output: validator_output
                        .and_then(|v| serde_json::from_value::<ValidatorOutput>(v).ok()),
                    consensus: None::<ConsensusResult>,
                    final_action: parse_final_action(&final_action),
                    retry_count: row.get::<i32, _>("retry_count") as u32,
                    ts: row.get("ts"),
                }
            })
            .collect())
    }
}

fn parse_final_action(raw: &str) -> FinalAction {
    match raw {
        "accept" => FinalAction::Accept,
        "retry" => FinalAction::Retry,
        "fast_path" => FinalAction::FastPath,
        _ => FinalAction::Reject,
    }
}

/// PostgreSQL-backed Cost Meter, sharing the pool with
/// [`PostgresSelectorStore`].
pub struct PostgresCostMeter {
    pool: PgPool,
}

impl PostgresCostMeter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CostMeter for PostgresCostMeter {
    async fn record(&self, metric: CostMetric) -> Result<()> {
        sqlx::query(
            "INSERT INTO cost_metrics (id, ts, provider, model, use_case, site, url, \
             input_tokens, output_tokens, input_cost, output_cost, total_cost) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(metric.id)
        .bind(metric.ts)
        .bind(metric.provider)
        .bind(metric.model)
        .bind(metric.use_case.as_str())
        .bind(metric.site)
        .bind(metric.url)
        .bind(metric.input_tokens as i64)
        .bind(metric.output_tokens as i64)
        .bind(metric.input_cost)
        .bind(metric.output_cost)
        .bind(metric.total_cost)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn total_for_site(&self, site: &str) -> Result<f64> {
        let row = sqlx::query("SELECT COALESCE(SUM(total_cost), 0.0) AS total FROM cost_metrics WHERE site = $1")
            .bind(site)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(row.get("total"))
    }
}
