//! Monotonicity-violation strategy.
//!
//! For a scalar underlying the implied CDF is monotone: with thresholds
//! l1 < l2, `P(X > l2) <= P(X > l1)`. A ladder rung priced against that
//! ordering is a price inversion, and buying the cheap side of both
//! markets locks in at least one winning leg. Every ladder pair is
//! examined, not just adjacent rungs, so the widest inversion in a
//! broken ladder surfaces too.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Duration;
use rust_decimal::Decimal;
use tracing::debug;

use super::{build_opportunity, Strategy, StrategyInput};
use crate::application::graph::MarketGraph;
use crate::domain::market::Side;
use crate::domain::opportunity::{Leg, Opportunity, StrategyKind};
use crate::domain::threshold::{Ladder, ThresholdDirection, ThresholdInfo};
use crate::error::Result;

/// Detects price inversions on threshold ladders.
pub struct MonotonicityStrategy {
    /// Minimum inversion before a pair is a candidate.
    inversion_tolerance: Decimal,
    /// Minimum mid-implied profit fraction worth emitting.
    min_profit: Decimal,
    /// Deadline grouping tolerance.
    deadline_tolerance: Duration,
}

impl MonotonicityStrategy {
    /// Creates the strategy.
    #[must_use]
    pub fn new(inversion_tolerance: Decimal, min_profit: Decimal, deadline_tolerance: Duration) -> Self {
        Self {
            inversion_tolerance,
            min_profit,
            deadline_tolerance,
        }
    }

    /// Groups thresholds into ladders: same asset, direction, and touch
    /// style, deadlines within tolerance of the group's first rung.
    /// Duplicate levels collapse to the most liquid market. Rungs come
    /// back sorted by level.
    fn build_ladders(&self, graph: &MarketGraph) -> Vec<Ladder> {
        let mut groups: BTreeMap<(String, ThresholdDirection, bool), Vec<ThresholdInfo>> =
            BTreeMap::new();
        for info in graph.thresholds() {
            groups
                .entry((info.asset.clone(), info.direction, info.touch))
                .or_default()
                .push(info.clone());
        }

        let mut ladders = Vec::new();
        for ((asset, direction, _touch), mut infos) in groups {
            infos.sort_by_key(|i| i.deadline);
            let mut start = 0;
            while start < infos.len() {
                let anchor = infos[start].deadline;
                let mut end = start;
                while end < infos.len() && infos[end].deadline - anchor <= self.deadline_tolerance {
                    end += 1;
                }

                let mut rungs: Vec<ThresholdInfo> = infos[start..end].to_vec();
                // Same level listed twice: keep the most liquid market.
                rungs.sort_by(|a, b| a.level.cmp(&b.level));
                rungs.dedup_by(|next, kept| {
                    if next.level != kept.level {
                        return false;
                    }
                    let liq = |info: &ThresholdInfo| {
                        graph
                            .market(&info.market_id)
                            .map(|m| m.liquidity_usd)
                            .unwrap_or_default()
                    };
                    if liq(next) > liq(kept) {
                        *kept = next.clone();
                    }
                    true
                });

                if rungs.len() >= 2 {
                    ladders.push(Ladder {
                        asset: asset.clone(),
                        direction,
                        deadline: anchor,
                        rungs,
                    });
                }
                start = end;
            }
        }
        ladders
    }

    fn scan_ladder(&self, ladder: &Ladder, graph: &MarketGraph) -> Vec<Opportunity> {
        let mut found = Vec::new();

        for i in 0..ladder.rungs.len() {
            for j in (i + 1)..ladder.rungs.len() {
                let low = &ladder.rungs[i];
                let high = &ladder.rungs[j];
                let (Some(low_market), Some(high_market)) =
                    (graph.market(&low.market_id), graph.market(&high.market_id))
                else {
                    continue;
                };

                // ABOVE: yes must not increase with the level.
                // BELOW: yes must not decrease with the level.
                let (inversion, cheap, dear) = match ladder.direction {
                    ThresholdDirection::Above => (
                        high_market.yes_mid - low_market.yes_mid,
                        low_market,
                        high_market,
                    ),
                    ThresholdDirection::Below => (
                        low_market.yes_mid - high_market.yes_mid,
                        high_market,
                        low_market,
                    ),
                };
                if inversion < self.inversion_tolerance {
                    continue;
                }

                // Buy YES on the rung that must dominate, NO on the rung
                // priced above it. Worst case exactly one pays out; in
                // the middle band both do.
                let legs = vec![
                    Leg::new(
                        cheap.id.clone(),
                        Side::Yes,
                        cheap.effective_buy_price(Side::Yes),
                    ),
                    Leg::new(
                        dear.id.clone(),
                        Side::No,
                        dear.effective_buy_price(Side::No),
                    ),
                ];
                let opp =
                    build_opportunity(StrategyKind::Monotonicity, legs, Decimal::ONE, graph);
                if opp.mid_profit < self.min_profit {
                    continue;
                }
                debug!(
                    asset = %ladder.asset,
                    low_level = %low.level,
                    high_level = %high.level,
                    inversion = %inversion,
                    "Ladder inversion found"
                );
                found.push((inversion, opp));
            }
        }

        // Widest inversion first; market ids break ties so the order is
        // stable for a fixed snapshot.
        found.sort_by(|(ia, a), (ib, b)| {
            ib.cmp(ia)
                .then_with(|| a.legs[0].market_id.cmp(&b.legs[0].market_id))
                .then_with(|| a.legs[1].market_id.cmp(&b.legs[1].market_id))
        });
        found.into_iter().map(|(_, opp)| opp).collect()
    }
}

#[async_trait]
impl Strategy for MonotonicityStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Monotonicity
    }

    fn required_inputs(&self) -> &'static [StrategyInput] {
        &[StrategyInput::Thresholds]
    }

    async fn scan(&self, graph: &MarketGraph) -> Result<Vec<Opportunity>> {
        let ladders = self.build_ladders(graph);
        debug!(ladders = ladders.len(), "Threshold ladders built");

        let mut opportunities = Vec::new();
        for ladder in &ladders {
            opportunities.extend(self.scan_ladder(ladder, graph));
        }
        Ok(opportunities)
    }
}
