//! Pluggable detection strategies.
//!
//! A strategy is a pure producer: it walks the read-only
//! [`MarketGraph`](crate::application::graph::MarketGraph) and emits zero
//! or more candidate opportunities. Strategies declare the derived inputs
//! they need; the orchestrator computes each input at most once per scan
//! and only runs strategies whose inputs are available.

pub mod equivalent;
pub mod exhaustive;
pub mod implication;
pub mod interval;
pub mod monotonicity;
pub mod temporal;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use super::graph::MarketGraph;
use crate::domain::market::Market;
use crate::domain::opportunity::{Leg, Opportunity, StrategyKind};
use crate::error::Result;
use crate::infrastructure::config::{ScanConfig, StrategiesConfig, ThresholdsConfig};

/// Derived inputs a strategy can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyInput {
    /// Parsed threshold table.
    Thresholds,
    /// Parsed interval table.
    Intervals,
    /// Semantic clusters.
    Clusters,
    /// Relation analyzer.
    Llm,
    /// Order-book depth (validation-time only; no strategy reads books).
    OrderBook,
}

/// A detection strategy.
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Which strategy this is.
    fn kind(&self) -> StrategyKind;

    /// Stable name, used in config and the scan report.
    fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Inputs this strategy needs before it can run.
    fn required_inputs(&self) -> &'static [StrategyInput];

    /// Scans the graph and returns candidates in deterministic order.
    ///
    /// # Errors
    ///
    /// Strategies absorb analyzer budget exhaustion (returning what they
    /// have); other errors abort the strategy, not the scan.
    async fn scan(&self, graph: &MarketGraph) -> Result<Vec<Opportunity>>;
}

/// Builds the enabled strategies in registry order.
#[must_use]
pub fn registry(
    enabled: &StrategiesConfig,
    thresholds: &ThresholdsConfig,
    scan: &ScanConfig,
) -> Vec<Box<dyn Strategy>> {
    let all: Vec<Box<dyn Strategy>> = vec![
        Box::new(monotonicity::MonotonicityStrategy::new(
            thresholds.mono,
            scan.min_profit_pct,
            scan.time_tolerance(),
        )),
        Box::new(interval::IntervalStrategy::new(
            scan.min_profit_pct,
            scan.time_tolerance(),
        )),
        Box::new(exhaustive::ExhaustiveStrategy::new(
            thresholds.exhaustive,
            thresholds.exhaustive_price_gap,
        )),
        Box::new(implication::ImplicationStrategy::new(
            thresholds.r#impl,
            thresholds.impl_price_gap,
            scan.time_tolerance(),
        )),
        Box::new(equivalent::EquivalentStrategy::new(
            thresholds.equiv,
            thresholds.equiv_price_gap,
        )),
        Box::new(temporal::TemporalStrategy::new(
            thresholds.impl_price_gap,
            scan.time_tolerance(),
        )),
    ];

    all.into_iter()
        .filter(|s| enabled.enabled.contains(s.name()))
        .collect()
}

/// Fills in the graph-derived fields of a fresh candidate: mid-price
/// profit, the weakest leg's liquidity, and days to the earliest leg
/// deadline.
pub(crate) fn build_opportunity(
    kind: StrategyKind,
    legs: Vec<Leg>,
    guaranteed_return: Decimal,
    graph: &MarketGraph,
) -> Opportunity {
    let mut opp = Opportunity::new(kind, legs, guaranteed_return);

    let markets: Vec<&Market> = opp
        .legs
        .iter()
        .filter_map(|leg| graph.market(&leg.market_id))
        .collect();

    let mid_sum: Decimal = opp
        .legs
        .iter()
        .filter_map(|leg| graph.market(&leg.market_id).map(|m| m.mid(leg.side)))
        .sum();
    opp.mid_profit = Decimal::ONE - mid_sum;

    opp.min_leg_liquidity_usd = markets
        .iter()
        .map(|m| m.liquidity_usd)
        .min()
        .unwrap_or_default();

    let now = Utc::now();
    opp.days_to_resolution = markets
        .iter()
        .filter_map(|m| m.end_time)
        .map(|end| {
            let seconds = (end - now).num_seconds().max(0);
            Decimal::from(seconds) / Decimal::from(86_400)
        })
        .min()
        .unwrap_or_default();

    opp
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::id::{EventId, MarketId, TokenId};
    use crate::domain::market::Side;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn market(id: &str, yes_mid: Decimal, liquidity: Decimal, days_out: i64) -> Market {
        Market {
            id: MarketId::new(id),
            condition_id: String::new(),
            token_yes: TokenId::new(format!("{id}-y")),
            token_no: TokenId::new(format!("{id}-n")),
            question: String::new(),
            market_description: String::new(),
            event_description: String::new(),
            event_id: EventId::new("e"),
            event_title: String::new(),
            tags: Default::default(),
            yes_mid,
            no_mid: Decimal::ONE - yes_mid,
            best_bid_yes: None,
            best_ask_yes: None,
            best_bid_no: None,
            best_ask_no: None,
            liquidity_usd: liquidity,
            volume_usd: dec!(0),
            end_time: Some(Utc::now() + Duration::days(days_out)),
            created_at: None,
            resolution_source: String::new(),
            neg_risk: false,
        }
    }

    #[test]
    fn build_opportunity_derives_context_fields() {
        let graph = MarketGraph::new(vec![
            market("a", dec!(0.30), dec!(50000), 30),
            market("b", dec!(0.60), dec!(20000), 10),
        ]);
        let legs = vec![
            Leg::new(MarketId::new("a"), Side::Yes, dec!(0.31)),
            Leg::new(MarketId::new("b"), Side::No, dec!(0.41)),
        ];
        let opp = build_opportunity(StrategyKind::Monotonicity, legs, Decimal::ONE, &graph);

        // mids: 0.30 (a YES) + 0.40 (b NO) -> mid_profit 0.30
        assert_eq!(opp.mid_profit, dec!(0.30));
        assert_eq!(opp.min_leg_liquidity_usd, dec!(20000));
        // Earliest leg resolves in ~10 days.
        assert!(opp.days_to_resolution > dec!(9.9) && opp.days_to_resolution <= dec!(10));
    }

    #[test]
    fn registry_respects_enabled_set() {
        let thresholds = ThresholdsConfig::default();
        let scan = ScanConfig::default();

        let all = registry(&StrategiesConfig::default(), &thresholds, &scan);
        assert_eq!(all.len(), 6);

        let one = registry(
            &StrategiesConfig {
                enabled: ["monotonicity".to_string()].into(),
            },
            &thresholds,
            &scan,
        );
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].name(), "monotonicity");
    }
}
