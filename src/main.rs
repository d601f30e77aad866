use std::sync::Arc;

use dutchbook::adapter::outbound::embedding::EmbeddingClient;
use dutchbook::adapter::outbound::llm;
use dutchbook::adapter::outbound::polymarket::cache::SnapshotCache;
use dutchbook::adapter::outbound::polymarket::PolymarketClient;
use dutchbook::application::orchestrator::Orchestrator;
use dutchbook::infrastructure::cancel::CancelToken;
use dutchbook::infrastructure::config::Config;
use dutchbook::infrastructure::rate_limit::TokenBucket;
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let config = match Config::load("dutchbook.toml") {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    config.init_logging();
    info!("dutchbook starting");

    let limiter = TokenBucket::start(config.rate.requests_per_second);

    let mut client = PolymarketClient::from_config(
        &config.polymarket,
        Arc::clone(&limiter),
        config.concurrency.source,
    );
    if config.cache.enabled {
        client = client.with_cache(SnapshotCache::new(config.cache.dir.clone(), config.cache.ttl()));
    }

    let llm_client = match llm::from_config(&config.llm) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Invalid LLM configuration: {e}");
            std::process::exit(1);
        }
    };
    if llm_client.is_none() {
        warn!("No LLM_API_KEY set, analyzer runs on deterministic rules only");
    }
    let embedder = EmbeddingClient::from_config(&config.embedding);
    if embedder.is_none() {
        warn!("No embedding key set, cluster strategies will be skipped");
    }

    let orchestrator = Orchestrator::new(config, Arc::new(client), embedder, llm_client)
        .with_limiter(limiter);

    let cancel = CancelToken::new();
    let watcher = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received, draining scan");
            watcher.cancel();
        }
    });

    match orchestrator.scan(&cancel).await {
        Ok(report) => match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                error!(error = %e, "Failed to serialize report");
                std::process::exit(1);
            }
        },
        Err(e) => {
            error!(error = %e, "Scan failed");
            std::process::exit(1);
        }
    }

    info!("dutchbook stopped");
}
