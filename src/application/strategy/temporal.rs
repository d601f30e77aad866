//! Temporal-nesting strategy.
//!
//! Touch questions on the same asset and level nest across deadlines:
//! anything that hits $100k by March has hit it by June, so the longer
//! window must not trade below the shorter one. Semantics are the
//! implication trade after verifying the nesting syntactically; no
//! analyzer call is needed.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Duration;
use rust_decimal::Decimal;
use tracing::debug;

use super::{build_opportunity, Strategy, StrategyInput};
use crate::application::graph::MarketGraph;
use crate::domain::market::Side;
use crate::domain::opportunity::{Leg, Opportunity, StrategyKind};
use crate::domain::threshold::{ThresholdDirection, ThresholdInfo};
use crate::error::Result;

/// Detects nested time windows priced backwards.
pub struct TemporalStrategy {
    /// Price gap the violation must exceed.
    min_gap: Decimal,
    /// Deadlines closer than this are one window, not a nesting.
    deadline_tolerance: Duration,
}

impl TemporalStrategy {
    /// Creates the strategy.
    #[must_use]
    pub fn new(min_gap: Decimal, deadline_tolerance: Duration) -> Self {
        Self {
            min_gap,
            deadline_tolerance,
        }
    }
}

#[async_trait]
impl Strategy for TemporalStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Temporal
    }

    fn required_inputs(&self) -> &'static [StrategyInput] {
        &[StrategyInput::Thresholds]
    }

    async fn scan(&self, graph: &MarketGraph) -> Result<Vec<Opportunity>> {
        // Only touch-style questions accumulate over time; a terminal
        // price on date X says nothing about date Y.
        let mut groups: BTreeMap<(String, ThresholdDirection, Decimal), Vec<&ThresholdInfo>> =
            BTreeMap::new();
        for info in graph.thresholds().iter().filter(|t| t.touch) {
            groups
                .entry((info.asset.clone(), info.direction, info.level))
                .or_default()
                .push(info);
        }

        let mut opportunities = Vec::new();
        for mut windows in groups.into_values() {
            if windows.len() < 2 {
                continue;
            }
            windows.sort_by_key(|w| w.deadline);

            for i in 0..windows.len() {
                for j in (i + 1)..windows.len() {
                    let earlier = windows[i];
                    let later = windows[j];
                    // Same window within tolerance is a duplicate
                    // listing, not a nesting.
                    if later.deadline - earlier.deadline <= self.deadline_tolerance {
                        continue;
                    }
                    let (Some(short), Some(long)) = (
                        graph.market(&earlier.market_id),
                        graph.market(&later.market_id),
                    ) else {
                        continue;
                    };

                    // The longer window dominates; a cheaper long window
                    // is the violation.
                    if long.yes_mid >= short.yes_mid - self.min_gap {
                        continue;
                    }

                    debug!(
                        asset = %earlier.asset,
                        level = %earlier.level,
                        "Nested window priced backwards"
                    );
                    let legs = vec![
                        Leg::new(
                            long.id.clone(),
                            Side::Yes,
                            long.effective_buy_price(Side::Yes),
                        ),
                        Leg::new(
                            short.id.clone(),
                            Side::No,
                            short.effective_buy_price(Side::No),
                        ),
                    ];
                    opportunities.push(build_opportunity(
                        StrategyKind::Temporal,
                        legs,
                        Decimal::ONE,
                        graph,
                    ));
                }
            }
        }
        Ok(opportunities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::parser::ThresholdParser;
    use crate::domain::id::{EventId, MarketId, TokenId};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn market(id: &str, question: &str, yes_mid: Decimal, days_out: i64) -> crate::domain::market::Market {
        crate::domain::market::Market {
            id: MarketId::new(id),
            condition_id: String::new(),
            token_yes: TokenId::new(format!("{id}-y")),
            token_no: TokenId::new(format!("{id}-n")),
            question: question.into(),
            market_description: String::new(),
            event_description: String::new(),
            event_id: EventId::new(format!("event-{id}")),
            event_title: String::new(),
            tags: Default::default(),
            yes_mid,
            no_mid: Decimal::ONE - yes_mid,
            best_bid_yes: None,
            best_ask_yes: Some(yes_mid + dec!(0.01)),
            best_bid_no: None,
            best_ask_no: Some(Decimal::ONE - yes_mid + dec!(0.01)),
            liquidity_usd: dec!(50000),
            volume_usd: dec!(0),
            end_time: Some(Utc::now() + Duration::days(days_out)),
            created_at: None,
            resolution_source: "Coinbase".into(),
            neg_risk: false,
        }
    }

    fn graph_of(markets: Vec<crate::domain::market::Market>) -> MarketGraph {
        let parser = ThresholdParser::new();
        let thresholds = markets.iter().filter_map(|m| parser.parse_market(m)).collect();
        MarketGraph::new(markets).with_thresholds(thresholds)
    }

    fn strategy() -> TemporalStrategy {
        TemporalStrategy::new(dec!(0.01), Duration::hours(24))
    }

    #[tokio::test]
    async fn cheaper_long_window_is_bought() {
        // Hit $100k by ~March at 0.30; by ~June at 0.22. The June
        // window must dominate: violation.
        let graph = graph_of(vec![
            market("short", "Will Bitcoin hit $100k by March?", dec!(0.30), 30),
            market("long", "Will Bitcoin hit $100k by June?", dec!(0.22), 120),
        ]);
        let opps = strategy().scan(&graph).await.unwrap();

        assert_eq!(opps.len(), 1);
        let opp = &opps[0];
        assert_eq!(opp.strategy, StrategyKind::Temporal);
        assert_eq!(opp.legs[0].market_id, MarketId::new("long"));
        assert_eq!(opp.legs[0].side, Side::Yes);
        assert_eq!(opp.legs[1].market_id, MarketId::new("short"));
        assert_eq!(opp.legs[1].side, Side::No);
    }

    #[tokio::test]
    async fn dominating_long_window_is_silent() {
        let graph = graph_of(vec![
            market("short", "Will Bitcoin hit $100k by March?", dec!(0.22), 30),
            market("long", "Will Bitcoin hit $100k by June?", dec!(0.30), 120),
        ]);
        assert!(strategy().scan(&graph).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn different_levels_do_not_nest() {
        let graph = graph_of(vec![
            market("short", "Will Bitcoin hit $100k by March?", dec!(0.30), 30),
            market("long", "Will Bitcoin hit $120k by June?", dec!(0.22), 120),
        ]);
        assert!(strategy().scan(&graph).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn terminal_questions_do_not_nest() {
        // Terminal closes on two dates are separate distributions.
        let graph = graph_of(vec![
            market("short", "Will BTC be above $100k on March 31?", dec!(0.30), 30),
            market("long", "Will BTC be above $100k on June 30?", dec!(0.22), 120),
        ]);
        assert!(strategy().scan(&graph).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn same_window_duplicates_are_not_nested() {
        let graph = graph_of(vec![
            market("a", "Will Bitcoin hit $100k by June 29?", dec!(0.30), 119),
            market("b", "Will Bitcoin hit $100k by June 30?", dec!(0.22), 120),
        ]);
        // Deadlines a day apart fall inside the tolerance window.
        assert!(strategy().scan(&graph).await.unwrap().is_empty());
    }
}
