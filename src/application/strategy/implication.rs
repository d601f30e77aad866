//! Implication strategy.
//!
//! When A resolving YES forces B to resolve YES, `P(B) >= P(A)`. A
//! cluster pair the analyzer classifies as an implication but whose
//! prices violate that ordering is bought: YES on the consequent, NO on
//! the antecedent, which pays at least one dollar in every outcome.

use async_trait::async_trait;
use chrono::Duration;
use rust_decimal::Decimal;
use tracing::{debug, info};

use super::{build_opportunity, Strategy, StrategyInput};
use crate::application::graph::MarketGraph;
use crate::domain::market::{Market, Side};
use crate::domain::opportunity::{Leg, Opportunity, StrategyKind};
use crate::domain::relation::RelationType;
use crate::error::{Error, Result};

/// Detects implication pairs priced backwards.
pub struct ImplicationStrategy {
    /// Analyzer confidence floor.
    min_confidence: Decimal,
    /// Price gap the violation must exceed.
    min_gap: Decimal,
    /// Deadline slack allowed for the consequent.
    deadline_tolerance: Duration,
}

impl ImplicationStrategy {
    /// Creates the strategy.
    #[must_use]
    pub fn new(min_confidence: Decimal, min_gap: Decimal, deadline_tolerance: Duration) -> Self {
        Self {
            min_confidence,
            min_gap,
            deadline_tolerance,
        }
    }

    /// Checks a directed implication `antecedent => consequent` and
    /// builds the candidate when prices violate it.
    fn check_pair(
        &self,
        antecedent: &Market,
        consequent: &Market,
        graph: &MarketGraph,
    ) -> Option<Opportunity> {
        // Consequent must remain open long enough for the implication to
        // bind at the antecedent's resolution.
        if let (Some(end_a), Some(end_b)) = (antecedent.end_time, consequent.end_time) {
            if end_b < end_a - self.deadline_tolerance {
                return None;
            }
        }

        // Threshold-direction auto-check: when both legs parse as
        // thresholds on one asset, the claimed direction must match the
        // parsed level ordering regardless of analyzer confidence.
        if let (Some(ta), Some(tb)) = (
            graph.threshold_for(&antecedent.id),
            graph.threshold_for(&consequent.id),
        ) {
            if ta.asset == tb.asset && !ta.implies(tb) {
                info!(
                    antecedent = %antecedent.id,
                    consequent = %consequent.id,
                    "Claimed implication contradicts parsed threshold ordering"
                );
                return None;
            }
        }

        // Violation: the consequent trades below the antecedent.
        if consequent.yes_mid >= antecedent.yes_mid - self.min_gap {
            return None;
        }

        let legs = vec![
            Leg::new(
                consequent.id.clone(),
                Side::Yes,
                consequent.effective_buy_price(Side::Yes),
            ),
            Leg::new(
                antecedent.id.clone(),
                Side::No,
                antecedent.effective_buy_price(Side::No),
            ),
        ];
        debug!(
            antecedent = %antecedent.id,
            consequent = %consequent.id,
            "Implication priced backwards"
        );
        Some(build_opportunity(
            StrategyKind::Implication,
            legs,
            Decimal::ONE,
            graph,
        ))
    }
}

#[async_trait]
impl Strategy for ImplicationStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Implication
    }

    fn required_inputs(&self) -> &'static [StrategyInput] {
        &[StrategyInput::Clusters, StrategyInput::Llm]
    }

    async fn scan(&self, graph: &MarketGraph) -> Result<Vec<Opportunity>> {
        let Some(analyzer) = graph.analyzer() else {
            return Ok(Vec::new());
        };

        let mut opportunities = Vec::new();
        'clusters: for cluster in graph.clusters() {
            for i in 0..cluster.len() {
                for j in (i + 1)..cluster.len() {
                    let (Some(a), Some(b)) =
                        (graph.market(&cluster[i]), graph.market(&cluster[j]))
                    else {
                        continue;
                    };
                    // Same-event outcomes are the exhaustive strategy's
                    // territory.
                    if a.event_id == b.event_id {
                        continue;
                    }

                    let analysis = match analyzer.analyze(a, b).await {
                        Ok(analysis) => analysis,
                        Err(Error::AnalyzerBudgetExhausted) => {
                            info!("Analyzer budget spent, stopping implication scan");
                            break 'clusters;
                        }
                        Err(err) => return Err(err),
                    };

                    let confidence =
                        Decimal::try_from(analysis.confidence).unwrap_or_default();
                    if confidence < self.min_confidence {
                        continue;
                    }

                    let candidate = match analysis.relation {
                        RelationType::ImpliesAb => self.check_pair(a, b, graph),
                        RelationType::ImpliesBa => self.check_pair(b, a, graph),
                        _ => None,
                    };
                    if let Some(mut opp) = candidate {
                        opp.relationship_analysis = Some(analysis);
                        opportunities.push(opp);
                    }
                }
            }
        }
        Ok(opportunities)
    }
}
