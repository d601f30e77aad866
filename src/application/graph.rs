//! Read-only market graph handed to strategies.
//!
//! Identifier-indexed tables over the snapshot: markets, parsed threshold
//! and interval tables, semantic clusters, event groups, and a memoized
//! analyzer handle. Strategies consume this view and never touch the
//! market source directly.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::analyzer::RelationAnalyzer;
use crate::domain::id::{EventId, MarketId};
use crate::domain::interval::IntervalInfo;
use crate::domain::market::Market;
use crate::domain::threshold::ThresholdInfo;

/// Read-only view of one scan's derived state.
pub struct MarketGraph {
    markets: Vec<Market>,
    by_id: HashMap<MarketId, usize>,
    /// Event groups in deterministic (event id) order.
    events: BTreeMap<EventId, Vec<MarketId>>,
    thresholds: Vec<ThresholdInfo>,
    threshold_by_market: HashMap<MarketId, usize>,
    intervals: Vec<IntervalInfo>,
    interval_by_market: HashMap<MarketId, usize>,
    clusters: Vec<Vec<MarketId>>,
    analyzer: Option<Arc<RelationAnalyzer>>,
}

impl MarketGraph {
    /// Builds the graph over a market snapshot.
    #[must_use]
    pub fn new(markets: Vec<Market>) -> Self {
        let by_id = markets
            .iter()
            .enumerate()
            .map(|(i, m)| (m.id.clone(), i))
            .collect();
        let mut events: BTreeMap<EventId, Vec<MarketId>> = BTreeMap::new();
        for market in &markets {
            events
                .entry(market.event_id.clone())
                .or_default()
                .push(market.id.clone());
        }
        Self {
            markets,
            by_id,
            events,
            thresholds: Vec::new(),
            threshold_by_market: HashMap::new(),
            intervals: Vec::new(),
            interval_by_market: HashMap::new(),
            clusters: Vec::new(),
            analyzer: None,
        }
    }

    /// Attaches the parsed threshold table.
    #[must_use]
    pub fn with_thresholds(mut self, thresholds: Vec<ThresholdInfo>) -> Self {
        self.threshold_by_market = thresholds
            .iter()
            .enumerate()
            .map(|(i, t)| (t.market_id.clone(), i))
            .collect();
        self.thresholds = thresholds;
        self
    }

    /// Attaches the parsed interval table.
    #[must_use]
    pub fn with_intervals(mut self, intervals: Vec<IntervalInfo>) -> Self {
        self.interval_by_market = intervals
            .iter()
            .enumerate()
            .map(|(i, v)| (v.market_id.clone(), i))
            .collect();
        self.intervals = intervals;
        self
    }

    /// Attaches semantic clusters.
    #[must_use]
    pub fn with_clusters(mut self, clusters: Vec<Vec<MarketId>>) -> Self {
        self.clusters = clusters;
        self
    }

    /// Attaches the analyzer handle.
    #[must_use]
    pub fn with_analyzer(mut self, analyzer: Arc<RelationAnalyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    /// All markets in snapshot order.
    #[must_use]
    pub fn markets(&self) -> &[Market] {
        &self.markets
    }

    /// Looks up a market by id.
    #[must_use]
    pub fn market(&self, id: &MarketId) -> Option<&Market> {
        self.by_id.get(id).map(|&i| &self.markets[i])
    }

    /// Event groups in event-id order.
    #[must_use]
    pub fn events(&self) -> &BTreeMap<EventId, Vec<MarketId>> {
        &self.events
    }

    /// The parsed threshold table.
    #[must_use]
    pub fn thresholds(&self) -> &[ThresholdInfo] {
        &self.thresholds
    }

    /// Threshold parse for one market, if it is a threshold market.
    #[must_use]
    pub fn threshold_for(&self, id: &MarketId) -> Option<&ThresholdInfo> {
        self.threshold_by_market
            .get(id)
            .map(|&i| &self.thresholds[i])
    }

    /// The parsed interval table.
    #[must_use]
    pub fn intervals(&self) -> &[IntervalInfo] {
        &self.intervals
    }

    /// Interval parse for one market, if it is an interval market.
    #[must_use]
    pub fn interval_for(&self, id: &MarketId) -> Option<&IntervalInfo> {
        self.interval_by_market.get(id).map(|&i| &self.intervals[i])
    }

    /// Semantic clusters (market-id sets, each of size >= 2).
    #[must_use]
    pub fn clusters(&self) -> &[Vec<MarketId>] {
        &self.clusters
    }

    /// The memoized analyzer, when LLM input was computed for this scan.
    #[must_use]
    pub fn analyzer(&self) -> Option<&Arc<RelationAnalyzer>> {
        self.analyzer.as_ref()
    }
}
