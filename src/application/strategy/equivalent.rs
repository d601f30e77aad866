//! Equivalent-markets strategy.
//!
//! Two markets asking the same question must trade at the same price;
//! a wide enough gap is bought as YES on the cheap listing and NO on the
//! expensive one. Before the analyzer is even consulted, a negation
//! filter kills pairs whose texts differ only by a negation word: "X
//! happens" and "X does not happen" are opposites no matter what the
//! model says.

use std::collections::BTreeSet;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use tracing::{debug, info};

use super::{build_opportunity, Strategy, StrategyInput};
use crate::application::graph::MarketGraph;
use crate::application::parser::AssetRegistry;
use crate::domain::market::{Market, Side};
use crate::domain::opportunity::{Leg, Opportunity, StrategyKind};
use crate::domain::relation::RelationType;
use crate::error::{Error, Result};

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z0-9$%]+").expect("static pattern"));

static STOPWORDS: &[&str] = &[
    "will", "the", "a", "an", "in", "on", "at", "to", "for", "of", "by", "be", "is", "are",
    "this", "that", "it", "its",
];

static NEGATIONS: &[&str] = &["not", "never", "no", "fail", "fails", "without"];

/// Tokenizes question text into a canonical bag of words: lowercased,
/// contractions expanded, currency symbols mapped to "usd", asset
/// aliases collapsed to their symbol, stopwords dropped.
fn normalized_tokens(text: &str, assets: &AssetRegistry) -> BTreeSet<String> {
    let lowered = text
        .to_ascii_lowercase()
        .replace("won't", "will not")
        .replace("n't", " not")
        .replace('$', " usd ");
    WORD.find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|w| !STOPWORDS.contains(w))
        .map(|w| assets.canonicalize(w).unwrap_or(w).to_string())
        .collect()
}

/// True when the two texts differ only by negation words, in either
/// direction. Such a pair is never equivalent.
#[must_use]
pub fn negation_mismatch(a: &str, b: &str, assets: &AssetRegistry) -> bool {
    let ta = normalized_tokens(a, assets);
    let tb = normalized_tokens(b, assets);
    let diff: BTreeSet<&String> = ta.symmetric_difference(&tb).collect();
    !diff.is_empty() && diff.iter().all(|w| NEGATIONS.contains(&w.as_str()))
}

/// Detects equivalent markets trading apart.
pub struct EquivalentStrategy {
    /// Analyzer confidence floor.
    min_confidence: Decimal,
    /// Price gap the pair must exceed.
    min_gap: Decimal,
    assets: AssetRegistry,
}

impl EquivalentStrategy {
    /// Creates the strategy.
    #[must_use]
    pub fn new(min_confidence: Decimal, min_gap: Decimal) -> Self {
        Self {
            min_confidence,
            min_gap,
            assets: AssetRegistry::new(),
        }
    }

    fn build_candidate(&self, a: &Market, b: &Market, graph: &MarketGraph) -> Opportunity {
        let (cheap, dear) = if a.yes_mid <= b.yes_mid { (a, b) } else { (b, a) };
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
        build_opportunity(StrategyKind::Equivalent, legs, Decimal::ONE, graph)
    }
}

#[async_trait]
impl Strategy for EquivalentStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Equivalent
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
                    if a.event_id == b.event_id {
                        continue;
                    }

                    let gap = (a.yes_mid - b.yes_mid).abs();
                    if gap <= self.min_gap {
                        continue;
                    }

                    // The negation filter runs before any analyzer call:
                    // a faulty EQUIVALENT verdict must never survive it.
                    if negation_mismatch(&a.question, &b.question, &self.assets) {
                        info!(a = %a.id, b = %b.id, "Negated pair rejected before analysis");
                        continue;
                    }

                    let analysis = match analyzer.analyze(a, b).await {
                        Ok(analysis) => analysis,
                        Err(Error::AnalyzerBudgetExhausted) => {
                            info!("Analyzer budget spent, stopping equivalence scan");
                            break 'clusters;
                        }
                        Err(err) => return Err(err),
                    };

                    let confidence =
                        Decimal::try_from(analysis.confidence).unwrap_or_default();
                    if analysis.relation != RelationType::Equivalent
                        || confidence < self.min_confidence
                    {
                        continue;
                    }

                    debug!(a = %a.id, b = %b.id, gap = %gap, "Equivalent markets priced apart");
                    let mut opp = self.build_candidate(a, b, graph);
                    opp.relationship_analysis = Some(analysis);
                    opportunities.push(opp);
                }
            }
        }
        Ok(opportunities)
    }
}
