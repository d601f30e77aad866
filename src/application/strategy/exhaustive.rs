//! Exhaustive-set strategy.
//!
//! A mutually exclusive, collectively exhaustive outcome set pays out
//! exactly one dollar; buying every YES for less locks the difference.
//! Exclusivity comes from the venue's winner-take-all flag or, failing
//! that, from the analyzer's exhaustive-set verification.

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::{debug, info};

use super::{build_opportunity, Strategy, StrategyInput};
use crate::application::graph::MarketGraph;
use crate::domain::market::{Market, Side};
use crate::domain::opportunity::{Leg, Opportunity, StrategyKind};
use crate::error::{Error, Result};

/// Detects underpriced exhaustive sets within single events.
pub struct ExhaustiveStrategy {
    /// Analyzer confidence floor for `is_complete`.
    min_confidence: Decimal,
    /// Required discount below $1 on the set cost.
    min_discount: Decimal,
}

impl ExhaustiveStrategy {
    /// Creates the strategy.
    #[must_use]
    pub fn new(min_confidence: Decimal, min_discount: Decimal) -> Self {
        Self {
            min_confidence,
            min_discount,
        }
    }

    fn emit(&self, members: &[&Market], graph: &MarketGraph) -> Option<Opportunity> {
        let legs: Vec<Leg> = members
            .iter()
            .map(|m| Leg::new(m.id.clone(), Side::Yes, m.effective_buy_price(Side::Yes)))
            .collect();
        let cost: Decimal = legs.iter().map(|l| l.buy_price).sum();
        if cost >= Decimal::ONE - self.min_discount {
            return None;
        }
        debug!(event = %members[0].event_id, cost = %cost, "Underpriced exhaustive set");
        Some(build_opportunity(
            StrategyKind::Exhaustive,
            legs,
            Decimal::ONE,
            graph,
        ))
    }
}

#[async_trait]
impl Strategy for ExhaustiveStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Exhaustive
    }

    fn required_inputs(&self) -> &'static [StrategyInput] {
        // Event grouping is always available; the analyzer is optional
        // but unlocks sets the venue has not flagged.
        &[]
    }

    async fn scan(&self, graph: &MarketGraph) -> Result<Vec<Opportunity>> {
        let mut opportunities = Vec::new();

        for (event_id, member_ids) in graph.events() {
            if member_ids.len() < 2 {
                continue;
            }
            let members: Vec<&Market> = member_ids
                .iter()
                .filter_map(|id| graph.market(id))
                .collect();
            if members.len() != member_ids.len() {
                continue;
            }

            let venue_flagged = members.iter().all(|m| m.neg_risk);
            let verified = if venue_flagged {
                true
            } else if let Some(analyzer) = graph.analyzer() {
                match analyzer.verify_exhaustive_set(&members).await {
                    Ok(verdict) => {
                        let confidence = Decimal::try_from(verdict.confidence)
                            .unwrap_or_default();
                        verdict.is_complete && confidence >= self.min_confidence
                    }
                    Err(Error::AnalyzerBudgetExhausted) => {
                        info!(event = %event_id, "Analyzer budget spent, remaining events unverified");
                        break;
                    }
                    Err(err) => return Err(err),
                }
            } else {
                false
            };

            if !verified {
                continue;
            }
            opportunities.extend(self.emit(&members, graph));
        }

        Ok(opportunities)
    }
}
