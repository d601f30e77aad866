//! Scan orchestrator.
//!
//! Drives one scan end to end: snapshot the catalog, compute each
//! derived input at most once (parsers always, clusters and the analyzer
//! only when an enabled strategy wants them), run the strategies
//! concurrently into a bounded candidate channel, and validate
//! candidates on the consuming side. The bounded channel is the
//! backpressure mechanism: saturated validators slow the producers.
//! Duplicate candidates are dropped by canonical key, earliest wins.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::analyzer::{AnalyzerConfig, RelationAnalyzer};
use super::cluster::{ClusterConfig, SemanticClusterer};
use super::graph::MarketGraph;
use super::parser::{IntervalParser, ThresholdParser};
use super::strategy::{self, Strategy, StrategyInput};
use super::validation::{ValidationConfig, ValidationEngine};
use crate::domain::market::Market;
use crate::domain::opportunity::{Opportunity, OpportunityStatus};
use crate::domain::report::ScanReport;
use crate::error::{Error, Result};
use crate::infrastructure::cancel::CancelToken;
use crate::infrastructure::config::Config;
use crate::infrastructure::rate_limit::TokenBucket;
use crate::port::outbound::{Embedder, Llm, MarketSource};

/// Candidate channel capacity; producers block here when validation
/// falls behind.
const CANDIDATE_CHANNEL_CAPACITY: usize = 64;

/// Orchestrates the discovery pipeline.
pub struct Orchestrator {
    config: Config,
    source: Arc<dyn MarketSource>,
    embedder: Option<Arc<dyn Embedder>>,
    llm: Option<Arc<dyn Llm>>,
    limiter: Option<Arc<TokenBucket>>,
}

impl Orchestrator {
    /// Creates an orchestrator over the given adapters. `embedder` and
    /// `llm` are optional; strategies whose inputs are unavailable are
    /// skipped with a warning.
    #[must_use]
    pub fn new(
        config: Config,
        source: Arc<dyn MarketSource>,
        embedder: Option<Arc<dyn Embedder>>,
        llm: Option<Arc<dyn Llm>>,
    ) -> Self {
        Self {
            config,
            source,
            embedder,
            llm,
            limiter: None,
        }
    }

    /// Shares the process-wide token bucket with analyzer calls.
    #[must_use]
    pub fn with_limiter(mut self, limiter: Arc<TokenBucket>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Collects the market snapshot from the lazy catalog stream.
    async fn snapshot(
        &self,
        cancel: &CancelToken,
        warnings: &mut Vec<String>,
    ) -> Result<Vec<Market>> {
        let limit = match self.config.scan.market_limit {
            0 => None,
            n => Some(n),
        };
        let mut rx = self
            .source
            .list_markets(&self.config.scan.tags, true, limit)
            .await?;

        let mut markets = Vec::new();
        loop {
            let item = tokio::select! {
                item = rx.recv() => item,
                () = cancel.canceled() => {
                    info!("Cancellation during catalog fetch");
                    break;
                }
            };
            let Some(item) = item else { break };
            match item {
                Ok(market) => {
                    if market.liquidity_usd >= self.config.scan.min_liquidity_usd {
                        markets.push(market);
                    }
                }
                Err(Error::SourceFormat(reason)) => {
                    warn!(reason = %reason, "Skipping malformed market record");
                    warnings.push(format!("skipped malformed record: {reason}"));
                }
                Err(err) => return Err(err),
            }
        }
        Ok(markets)
    }

    /// Runs one scan to completion (or cancellation).
    ///
    /// # Errors
    ///
    /// Returns an error only when the market source is unavailable;
    /// everything downstream degrades into warnings and rejections.
    pub async fn scan(&self, cancel: &CancelToken) -> Result<ScanReport> {
        let started_at = Utc::now();
        let scan_id = uuid::Uuid::new_v4().to_string();
        info!(scan_id = %scan_id, source = self.source.name(), "Scan starting");

        let mut warnings = Vec::new();
        let markets = self.snapshot(cancel, &mut warnings).await?;
        info!(count = markets.len(), "Market snapshot ready");

        // Strategies first, so only the inputs they need get computed.
        let strategies = strategy::registry(
            &self.config.strategies,
            &self.config.thresholds,
            &self.config.scan,
        );
        let wanted: HashSet<StrategyInput> = strategies
            .iter()
            .flat_map(|s| s.required_inputs().iter().copied())
            .collect();

        // Derived inputs, each computed at most once.
        let threshold_parser = ThresholdParser::new();
        let thresholds: Vec<_> = markets
            .iter()
            .filter_map(|m| threshold_parser.parse_market(m))
            .collect();
        let interval_parser = IntervalParser::new();
        let intervals: Vec<_> = markets
            .iter()
            .filter_map(|m| interval_parser.parse_market(m))
            .collect();
        debug!(
            thresholds = thresholds.len(),
            intervals = intervals.len(),
            "Question parsing complete"
        );

        let clusters = if wanted.contains(&StrategyInput::Clusters) {
            match &self.embedder {
                Some(embedder) => {
                    let clusterer = SemanticClusterer::new(
                        Arc::clone(embedder),
                        ClusterConfig {
                            similarity_threshold: self.config.scan.similarity_threshold,
                            batch_size: self.config.embedding.batch_size,
                            concurrency: self.config.concurrency.embed,
                        },
                    );
                    match clusterer.cluster(&markets).await {
                        Ok(clusters) => clusters,
                        Err(err) => {
                            warn!(error = %err, "Clustering failed, cluster strategies degraded");
                            warnings.push(format!("clustering failed: {err}"));
                            Vec::new()
                        }
                    }
                }
                None => {
                    warnings.push("no embedder configured, cluster strategies skipped".into());
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let analyzer = if wanted.contains(&StrategyInput::Llm) || self.llm.is_some() {
            Some(Arc::new(RelationAnalyzer::new(
                self.llm.clone(),
                self.limiter.clone(),
                AnalyzerConfig {
                    max_calls: self.config.scan.max_llm_calls,
                    concurrency: self.config.concurrency.llm,
                },
            )))
        } else {
            None
        };

        let mut graph = MarketGraph::new(markets)
            .with_thresholds(thresholds)
            .with_intervals(intervals)
            .with_clusters(clusters);
        if let Some(analyzer) = &analyzer {
            graph = graph.with_analyzer(Arc::clone(analyzer));
        }
        let graph = Arc::new(graph);

        // Fan the strategies out into the bounded candidate channel.
        let (tx, mut rx) = mpsc::channel::<Opportunity>(CANDIDATE_CHANNEL_CAPACITY);
        let mut strategies_run = Vec::new();
        let mut handles = Vec::new();
        for strat in strategies {
            let available = strat.required_inputs().iter().all(|input| match input {
                StrategyInput::Thresholds | StrategyInput::Intervals => true,
                StrategyInput::Clusters => !graph.clusters().is_empty(),
                StrategyInput::Llm => graph.analyzer().is_some(),
                StrategyInput::OrderBook => true,
            });
            if !available {
                debug!(strategy = strat.name(), "Inputs unavailable, strategy skipped");
                continue;
            }
            strategies_run.push(strat.name().to_string());
            handles.push(tokio::spawn(run_strategy(
                strat,
                Arc::clone(&graph),
                tx.clone(),
                cancel.clone(),
            )));
        }
        drop(tx);

        // Validate on the consuming side; a busy validator backpressures
        // the strategy tasks through the channel.
        let engine = ValidationEngine::new(
            ValidationConfig::from_scan(&self.config.scan),
            Arc::clone(&self.source),
            self.config.concurrency.book,
        );

        let mut seen = HashSet::new();
        let mut accepted = Vec::new();
        let mut rejections: BTreeMap<String, usize> = BTreeMap::new();
        let mut stale = 0usize;
        let mut canceled = false;

        loop {
            let candidate = tokio::select! {
                candidate = rx.recv() => candidate,
                () = cancel.canceled() => {
                    info!("Cancellation during validation, draining");
                    canceled = true;
                    break;
                }
            };
            let Some(candidate) = candidate else { break };

            if !seen.insert(candidate.dedup_key()) {
                debug!(id = %candidate.id, "Duplicate candidate dropped");
                continue;
            }

            let validated = engine.validate(candidate, &graph).await;
            match &validated.status {
                OpportunityStatus::Accepted => accepted.push(validated),
                OpportunityStatus::Rejected { layer, .. } => {
                    *rejections.entry(layer.name().to_string()).or_insert(0) += 1;
                }
                OpportunityStatus::Stale => stale += 1,
                other => {
                    warn!(status = ?other, "Candidate left validation in a non-terminal state");
                }
            }
        }

        // Closing the receiver first unblocks any producer still waiting
        // on a full channel after a cancel.
        drop(rx);
        for handle in handles {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warnings.push(format!("strategy failed: {err}")),
                Err(err) => warnings.push(format!("strategy panicked: {err}")),
            }
        }

        if stale > 0 {
            warnings.push(format!("{stale} plans went stale before emission"));
        }
        let llm_calls_used = analyzer.as_ref().map_or(0, |a| a.calls_used());
        if let Some(analyzer) = &analyzer {
            let skipped = analyzer.skipped_pairs();
            if skipped > 0 {
                warnings.push(format!(
                    "analyzer budget exhausted, {skipped} pairs skipped"
                ));
            }
        }
        if canceled {
            warnings.push("scan canceled; accepted opportunities remain valid".into());
        }

        let report = ScanReport {
            scan_id,
            started_at,
            finished_at: Utc::now(),
            strategies_run,
            markets_considered: graph.markets().len(),
            llm_calls_used,
            opportunities: accepted,
            rejections_summary: rejections,
            warnings,
        };
        info!(
            accepted = report.opportunities.len(),
            llm_calls = report.llm_calls_used,
            "Scan finished"
        );
        Ok(report)
    }
}

/// Runs one strategy, forwarding its candidates into the channel until
/// done or canceled.
async fn run_strategy(
    strat: Box<dyn Strategy>,
    graph: Arc<MarketGraph>,
    tx: mpsc::Sender<Opportunity>,
    cancel: CancelToken,
) -> Result<()> {
    if cancel.is_canceled() {
        return Ok(());
    }
    let found = strat.scan(&graph).await?;
    debug!(strategy = strat.name(), candidates = found.len(), "Strategy complete");
    for opp in found {
        if cancel.is_canceled() {
            break;
        }
        if tx.send(opp).await.is_err() {
            break;
        }
    }
    Ok(())
}
