//! `extract`: run one article through the engine from the command line.
//!
//! Wires a `reqwest`-backed `Fetcher`, the default OpenAI/Anthropic
//! adapters, and in-memory Selector Store / Decision Log / Cost Meter
//! into one `Orchestrator`, then prints the `OrchestrationResult` as JSON.

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use engine::agents::{ProposerAgent, ValidatorAgent};
use engine::error::EngineError;
use engine::llm::adapters::{AnthropicAdapter, OpenAiAdapter};
use engine::store::memory::{MemoryCostMeter, MemoryDecisionLog, MemorySelectorStore};
use engine::types::RawDocument;
use engine::{ArticleRequest, EngineConfig, Fetcher, Orchestrator, RequestHints};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "extract", about = "Extract one article's title, body, and date")]
struct Args {
    /// The article URL to fetch and extract.
    url: String,

    /// The site key used for the Selector Store (defaults to the URL's host).
    #[arg(long)]
    site: Option<String>,

    /// BCP-47-ish language hint passed to the Proposer/Validator prompts.
    #[arg(long)]
    language: Option<String>,
}

struct ReqwestFetcher {
    client: reqwest::Client,
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<RawDocument, EngineError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| EngineError::Fetch(e.to_string()))?;
        let html = response.text().await.map_err(|e| EngineError::Fetch(e.to_string()))?;
        Ok(RawDocument {
            url: url.to_string(),
            html,
            fetched_at: chrono::Utc::now(),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,engine=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = EngineConfig::from_env().context("failed to load engine configuration")?;

    let site = args.site.unwrap_or_else(|| {
        reqwest::Url::parse(&args.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| args.url.clone())
    });

    let proposer_client =
        proposer_client::ProposerClient::from_env().context("failed to build Proposer client")?;
    let validator_client =
        validator_client::ValidatorClient::from_env().context("failed to build Validator client")?;

    let proposer = ProposerAgent::new(
        Arc::new(OpenAiAdapter::new(proposer_client)),
        config.proposer.clone(),
        config.proposer_html_max,
        config.agent_timeout,
    );
    let validator = ValidatorAgent::new(
        Arc::new(AnthropicAdapter::new(validator_client)),
        config.validator.clone(),
        4096,
        config.agent_timeout,
    );

    let orchestrator = Orchestrator::new(
        Arc::new(ReqwestFetcher { client: reqwest::Client::new() }),
        Arc::new(MemorySelectorStore::new()),
        Arc::new(MemoryDecisionLog::new()),
        Arc::new(MemoryCostMeter::new()),
        proposer,
        validator,
        config,
    );

    let request = ArticleRequest {
        url: args.url,
        site,
        hints: Some(RequestHints { language: args.language, expected_category: None }),
    };

    let result = orchestrator.run(request).await;
    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.ok {
        std::process::exit(1);
    }
    Ok(())
}
