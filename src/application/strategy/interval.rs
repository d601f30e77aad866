//! Interval-partition strategy.
//!
//! Adjacent, mutually exclusive intervals that jointly cover the whole
//! line form a partition: exactly one resolves YES, so their YES prices
//! must sum to one. A partition trading below that is bought outright.
//! Threshold markets join as half-lines, so "below $130" + "$130 or
//! more" is a two-leg partition.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::Duration;
use rust_decimal::Decimal;
use tracing::debug;

use super::{build_opportunity, Strategy, StrategyInput};
use crate::application::graph::MarketGraph;
use crate::domain::interval::IntervalInfo;
use crate::domain::market::Side;
use crate::domain::opportunity::{Leg, Opportunity, StrategyKind};
use crate::domain::threshold::{ThresholdDirection, ThresholdInfo};
use crate::error::Result;

/// Detects underpriced interval partitions.
pub struct IntervalStrategy {
    /// Required discount below $1 on the partition cost.
    min_profit: Decimal,
    /// Deadline grouping tolerance.
    deadline_tolerance: Duration,
}

impl IntervalStrategy {
    /// Creates the strategy.
    #[must_use]
    pub fn new(min_profit: Decimal, deadline_tolerance: Duration) -> Self {
        Self {
            min_profit,
            deadline_tolerance,
        }
    }

    /// Terminal threshold markets enter the interval table as half-lines.
    /// "above l" is `(l, +inf)`, "below l" is `(-inf, l)`; touch
    /// questions have different resolution semantics and stay out.
    fn half_line(info: &ThresholdInfo) -> Option<IntervalInfo> {
        if info.touch {
            return None;
        }
        let (lower, upper) = match info.direction {
            ThresholdDirection::Above => (Some(info.level), None),
            ThresholdDirection::Below => (None, Some(info.level)),
        };
        Some(IntervalInfo {
            market_id: info.market_id.clone(),
            asset: info.asset.clone(),
            lower,
            upper,
            lower_inclusive: false,
            upper_inclusive: false,
            unit: info.unit.clone(),
            deadline: info.deadline,
        })
    }

    /// Extends a chain of adjacent intervals; a chain reaching `+inf`
    /// covers the line and is recorded as a partition.
    fn grow_chains<'a>(
        chain: &mut Vec<&'a IntervalInfo>,
        pool: &[&'a IntervalInfo],
        partitions: &mut Vec<Vec<&'a IntervalInfo>>,
    ) {
        let tail: &'a IntervalInfo = *chain.last().expect("chain never empty");
        if tail.upper.is_none() {
            if chain.len() >= 2 {
                partitions.push(chain.clone());
            }
            return;
        }
        for &candidate in pool {
            if tail.is_adjacent_below(candidate) {
                chain.push(candidate);
                Self::grow_chains(chain, pool, partitions);
                chain.pop();
            }
        }
    }

    fn scan_group(&self, group: &[&IntervalInfo], graph: &MarketGraph) -> Vec<Opportunity> {
        // Chains start from lower-unbounded intervals and must end
        // upper-unbounded to cover every outcome.
        let mut partitions = Vec::new();
        for start in group.iter().filter(|i| i.lower.is_none()) {
            let mut chain = vec![*start];
            Self::grow_chains(&mut chain, group, &mut partitions);
        }

        let mut seen: HashSet<Vec<&str>> = HashSet::new();
        let mut opportunities = Vec::new();
        for partition in partitions {
            let mut key: Vec<&str> = partition.iter().map(|i| i.market_id.as_str()).collect();
            key.sort_unstable();
            if !seen.insert(key) {
                continue;
            }

            let legs: Vec<Leg> = partition
                .iter()
                .filter_map(|interval| {
                    graph.market(&interval.market_id).map(|m| {
                        Leg::new(m.id.clone(), Side::Yes, m.effective_buy_price(Side::Yes))
                    })
                })
                .collect();
            if legs.len() != partition.len() {
                continue;
            }

            let cost: Decimal = legs.iter().map(|l| l.buy_price).sum();
            if cost >= Decimal::ONE - self.min_profit {
                continue;
            }
            debug!(
                asset = %partition[0].asset,
                legs = legs.len(),
                cost = %cost,
                "Underpriced interval partition"
            );
            opportunities.push(build_opportunity(
                StrategyKind::Interval,
                legs,
                Decimal::ONE,
                graph,
            ));
        }
        opportunities
    }
}

#[async_trait]
impl Strategy for IntervalStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Interval
    }

    fn required_inputs(&self) -> &'static [StrategyInput] {
        &[StrategyInput::Intervals]
    }

    async fn scan(&self, graph: &MarketGraph) -> Result<Vec<Opportunity>> {
        // Bounded intervals plus threshold half-lines, grouped by asset
        // and deadline bucket.
        let half_lines: Vec<IntervalInfo> = graph
            .thresholds()
            .iter()
            .filter_map(Self::half_line)
            .collect();
        let mut all: Vec<&IntervalInfo> = graph.intervals().iter().chain(&half_lines).collect();
        all.sort_by(|a, b| {
            a.asset
                .cmp(&b.asset)
                .then_with(|| a.deadline.cmp(&b.deadline))
                .then_with(|| a.market_id.cmp(&b.market_id))
        });

        let mut groups: BTreeMap<(String, i64), Vec<&IntervalInfo>> = BTreeMap::new();
        for interval in all {
            // Deadline buckets by tolerance window; within-bucket pairs
            // are re-checked against the tolerance in Layer 2.
            let bucket = interval.deadline.timestamp() / self.deadline_tolerance.num_seconds().max(1);
            groups
                .entry((interval.asset.clone(), bucket))
                .or_default()
                .push(interval);
        }

        let mut opportunities = Vec::new();
        for group in groups.values() {
            if group.len() >= 2 {
                opportunities.extend(self.scan_group(group, graph));
            }
        }
        Ok(opportunities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::id::{EventId, MarketId, TokenId};
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn market(id: &str, yes_mid: Decimal) -> crate::domain::market::Market {
        crate::domain::market::Market {
            id: MarketId::new(id),
            condition_id: String::new(),
            token_yes: TokenId::new(format!("{id}-y")),
            token_no: TokenId::new(format!("{id}-n")),
            question: String::new(),
            market_description: String::new(),
            event_description: String::new(),
            event_id: EventId::new(format!("event-{id}")),
            event_title: String::new(),
            tags: Default::default(),
            yes_mid,
            no_mid: Decimal::ONE - yes_mid,
            best_bid_yes: None,
            best_ask_yes: Some(yes_mid + dec!(0.005)),
            best_bid_no: None,
            best_ask_no: None,
            liquidity_usd: dec!(50000),
            volume_usd: dec!(0),
            end_time: Some(Utc.with_ymd_and_hms(2026, 1, 4, 12, 0, 0).unwrap()),
            created_at: None,
            resolution_source: String::new(),
            neg_risk: false,
        }
    }

    fn interval(
        id: &str,
        lower: Option<Decimal>,
        upper: Option<Decimal>,
        lower_inclusive: bool,
        upper_inclusive: bool,
    ) -> IntervalInfo {
        IntervalInfo {
            market_id: MarketId::new(id),
            asset: "sol".into(),
            lower,
            upper,
            lower_inclusive,
            upper_inclusive,
            unit: "USD".into(),
            deadline: Utc.with_ymd_and_hms(2026, 1, 4, 12, 0, 0).unwrap(),
        }
    }

    fn strategy() -> IntervalStrategy {
        IntervalStrategy::new(dec!(0.005), Duration::hours(24))
    }

    #[tokio::test]
    async fn three_piece_partition_priced_below_one_is_bought() {
        // (-inf,130) + [130,140] + (140,+inf) with YES mids 0.04 + 0.50
        // + 0.40 = 0.94; asks add half a cent each.
        let graph = MarketGraph::new(vec![
            market("below", dec!(0.04)),
            market("mid", dec!(0.50)),
            market("above", dec!(0.40)),
        ])
        .with_intervals(vec![
            interval("below", None, Some(dec!(130)), false, false),
            interval("mid", Some(dec!(130)), Some(dec!(140)), true, true),
            interval("above", Some(dec!(140)), None, false, false),
        ]);

        let opps = strategy().scan(&graph).await.unwrap();
        assert_eq!(opps.len(), 1);
        let opp = &opps[0];
        assert_eq!(opp.legs.len(), 3);
        assert!(opp.legs.iter().all(|l| l.side == Side::Yes));
        assert_eq!(opp.cost(), dec!(0.955));
        assert_eq!(opp.guaranteed_return, Decimal::ONE);
    }

    #[tokio::test]
    async fn gap_in_coverage_is_no_partition() {
        // (-inf,130) then (135, +inf): 130-135 is uncovered.
        let graph = MarketGraph::new(vec![market("below", dec!(0.30)), market("above", dec!(0.30))])
            .with_intervals(vec![
                interval("below", None, Some(dec!(130)), false, false),
                interval("above", Some(dec!(135)), None, false, false),
            ]);
        assert!(strategy().scan(&graph).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn double_counted_boundary_is_no_partition() {
        // [.,130] + [130,.]: both pay on exactly 130, not exclusive.
        let graph = MarketGraph::new(vec![market("below", dec!(0.30)), market("above", dec!(0.30))])
            .with_intervals(vec![
                interval("below", None, Some(dec!(130)), false, true),
                interval("above", Some(dec!(130)), None, true, false),
            ]);
        assert!(strategy().scan(&graph).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn fairly_priced_partition_is_silent() {
        let graph = MarketGraph::new(vec![market("below", dec!(0.50)), market("above", dec!(0.50))])
            .with_intervals(vec![
                interval("below", None, Some(dec!(130)), false, true),
                interval("above", Some(dec!(130)), None, false, false),
            ]);
        assert!(strategy().scan(&graph).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn threshold_half_lines_complete_a_partition() {
        use crate::domain::threshold::{ThresholdDirection, ThresholdInfo};
        // Interval market "below 130" (exclusive upper) plus threshold
        // market "above 130"... leaves 130 itself uncovered, so use the
        // inclusive interval side.
        let graph = MarketGraph::new(vec![market("range", dec!(0.05)), market("thresh", dec!(0.90))])
            .with_intervals(vec![interval("range", None, Some(dec!(130)), false, true)])
            .with_thresholds(vec![ThresholdInfo {
                market_id: MarketId::new("thresh"),
                asset: "sol".into(),
                direction: ThresholdDirection::Above,
                level: dec!(130),
                unit: "USD".into(),
                deadline: Utc.with_ymd_and_hms(2026, 1, 4, 12, 0, 0).unwrap(),
                touch: false,
            }]);

        let opps = strategy().scan(&graph).await.unwrap();
        assert_eq!(opps.len(), 1);
        assert_eq!(opps[0].legs.len(), 2);
        // 0.055 + 0.905 = 0.96 < 1 - 0.005
        assert_eq!(opps[0].cost(), dec!(0.96));
    }
}
