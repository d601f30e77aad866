//! Relation analyzer: LLM-backed classification with a call budget, a
//! memoization cache, robust JSON recovery, and a deterministic rule
//! fallback when no model is configured.
//!
//! The memo cache is the only shared-mutable structure in the scan. It is
//! keyed by the ordered market-id pair plus the analyzer version and
//! follows a single-writer discipline: check under the lock, compute
//! outside it, insert if still vacant.

pub mod prompt;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Deserialize;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::domain::id::MarketId;
use crate::domain::market::Market;
use crate::domain::relation::{ExhaustiveVerdict, RelationType, RelationshipAnalysis};
use crate::error::{Error, Result};
use crate::infrastructure::rate_limit::TokenBucket;
use crate::port::outbound::Llm;

/// Bumped when prompts or parsing change; part of the memo key contract.
const ANALYZER_VERSION: &str = "v2";

/// Analyzer pool and budget parameters.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Per-scan completion call budget.
    pub max_calls: usize,
    /// Concurrent completion calls.
    pub concurrency: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_calls: 30,
            concurrency: 3,
        }
    }
}

#[derive(Deserialize)]
struct PairDto {
    #[serde(default)]
    relationship: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    edge_cases: Vec<String>,
    #[serde(default)]
    resolution_compatible: Option<bool>,
}

#[derive(Deserialize)]
struct ExhaustiveDto {
    #[serde(default)]
    is_complete: bool,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    missing_cases: Vec<String>,
}

/// Pulls the JSON object out of a completion that may wrap it in prose
/// or markdown fences.
#[must_use]
pub fn recover_json(text: &str) -> Option<&str> {
    let fenced = text
        .split_once("```json")
        .or_else(|| text.split_once("```"))
        .map(|(_, rest)| rest.split("```").next().unwrap_or(rest));
    let candidate = fenced.unwrap_or(text);

    let start = candidate.find('{')?;
    let end = candidate.rfind('}')?;
    (end > start).then(|| candidate[start..=end].trim())
}

fn swap_direction(relation: RelationType) -> RelationType {
    match relation {
        RelationType::ImpliesAb => RelationType::ImpliesBa,
        RelationType::ImpliesBa => RelationType::ImpliesAb,
        other => other,
    }
}

fn swap_analysis(mut analysis: RelationshipAnalysis) -> RelationshipAnalysis {
    analysis.relation = swap_direction(analysis.relation);
    analysis
}

type PairKey = (MarketId, MarketId, &'static str);

/// LLM-backed relation analyzer with memoization and a call budget.
pub struct RelationAnalyzer {
    llm: Option<Arc<dyn Llm>>,
    limiter: Option<Arc<TokenBucket>>,
    semaphore: Semaphore,
    max_calls: usize,
    calls_used: AtomicUsize,
    skipped: AtomicUsize,
    cache: Mutex<HashMap<PairKey, RelationshipAnalysis>>,
}

impl RelationAnalyzer {
    /// Creates an analyzer. `llm = None` enables the rule fallback only.
    #[must_use]
    pub fn new(
        llm: Option<Arc<dyn Llm>>,
        limiter: Option<Arc<TokenBucket>>,
        config: AnalyzerConfig,
    ) -> Self {
        Self {
            llm,
            limiter,
            semaphore: Semaphore::new(config.concurrency.max(1)),
            max_calls: config.max_calls,
            calls_used: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Completion calls consumed so far.
    #[must_use]
    pub fn calls_used(&self) -> usize {
        self.calls_used.load(Ordering::SeqCst)
    }

    /// Pairs skipped because the budget ran out.
    #[must_use]
    pub fn skipped_pairs(&self) -> usize {
        self.skipped.load(Ordering::SeqCst)
    }

    /// Reserves one completion call against the budget.
    fn charge_call(&self) -> Result<()> {
        let mut used = self.calls_used.load(Ordering::SeqCst);
        loop {
            if used >= self.max_calls {
                return Err(Error::AnalyzerBudgetExhausted);
            }
            match self.calls_used.compare_exchange(
                used,
                used + 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return Ok(()),
                Err(actual) => used = actual,
            }
        }
    }

    async fn complete(&self, llm: &Arc<dyn Llm>, prompt: &str) -> Result<String> {
        self.charge_call()?;
        let _permit = self
            .semaphore
            .acquire()
            .await
            .expect("semaphore never closed");
        if let Some(limiter) = &self.limiter {
            limiter.acquire().await;
        }
        llm.complete(prompt).await
    }

    /// Classifies the relation between two markets.
    ///
    /// Memoized per ordered pair; the cached record is direction-
    /// normalized and flipped back for reversed argument order. When the
    /// LLM output cannot be parsed after one retry, the pair degrades to
    /// `(INDEPENDENT, 0.0)` rather than failing the scan.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AnalyzerBudgetExhausted`] when the call budget is
    /// spent; callers skip the remaining pairs and record the skip.
    pub async fn analyze(&self, a: &Market, b: &Market) -> Result<RelationshipAnalysis> {
        let reversed = a.id > b.id;
        let key: PairKey = if reversed {
            (b.id.clone(), a.id.clone(), ANALYZER_VERSION)
        } else {
            (a.id.clone(), b.id.clone(), ANALYZER_VERSION)
        };

        if let Some(hit) = self.cache.lock().get(&key).cloned() {
            debug!(a = %a.id, b = %b.id, "Analyzer cache hit");
            return Ok(if reversed { swap_analysis(hit) } else { hit });
        }

        // Normalize to key order so the cached direction is canonical.
        let (first, second) = if reversed { (b, a) } else { (a, b) };
        let analysis = match &self.llm {
            Some(llm) => {
                let result = self.analyze_with_llm(llm, first, second).await;
                match result {
                    Ok(analysis) => analysis,
                    Err(Error::AnalyzerBudgetExhausted) => {
                        self.skipped.fetch_add(1, Ordering::SeqCst);
                        return Err(Error::AnalyzerBudgetExhausted);
                    }
                    Err(err) => {
                        warn!(error = %err, "Analyzer transport failure, downgrading pair");
                        RelationshipAnalysis::independent("analyzer_error")
                    }
                }
            }
            None => rule_fallback(first, second),
        };
        let analysis = analysis.enforce_consistency();

        // Single-writer discipline: first insert wins, both callers see
        // one canonical record.
        let canonical = {
            let mut cache = self.cache.lock();
            cache.entry(key).or_insert(analysis).clone()
        };

        Ok(if reversed {
            swap_analysis(canonical)
        } else {
            canonical
        })
    }

    async fn analyze_with_llm(
        &self,
        llm: &Arc<dyn Llm>,
        a: &Market,
        b: &Market,
    ) -> Result<RelationshipAnalysis> {
        let prompt = prompt::pair_prompt(a, b);

        for attempt in 0..2 {
            let raw = match self.complete(llm, &prompt).await {
                Ok(raw) => raw,
                Err(Error::AnalyzerBudgetExhausted) => return Err(Error::AnalyzerBudgetExhausted),
                Err(err) if attempt == 0 => {
                    warn!(error = %err, "Analyzer call failed, retrying once");
                    continue;
                }
                Err(err) => return Err(err),
            };

            match recover_json(&raw).and_then(|json| serde_json::from_str::<PairDto>(json).ok()) {
                Some(dto) => {
                    return Ok(RelationshipAnalysis {
                        relation: RelationType::from_label(&dto.relationship),
                        confidence: dto.confidence.clamp(0.0, 1.0),
                        reasoning: dto.reasoning,
                        edge_cases: dto.edge_cases,
                        resolution_compatible: dto.resolution_compatible.unwrap_or(false),
                    });
                }
                None if attempt == 0 => {
                    warn!(a = %a.id, b = %b.id, "Unparseable analyzer output, retrying once");
                }
                None => break,
            }
        }

        Ok(RelationshipAnalysis::independent("parse_failure"))
    }

    /// Asks whether a market set is mutually exclusive and collectively
    /// exhaustive.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AnalyzerBudgetExhausted`] when the budget is
    /// spent.
    pub async fn verify_exhaustive_set(&self, markets: &[&Market]) -> Result<ExhaustiveVerdict> {
        let Some(llm) = &self.llm else {
            return Ok(ExhaustiveVerdict {
                is_complete: false,
                confidence: 0.0,
                missing_cases: vec!["analyzer unavailable".into()],
            });
        };

        let prompt = prompt::exhaustive_prompt(markets);
        for attempt in 0..2 {
            let raw = match self.complete(llm, &prompt).await {
                Ok(raw) => raw,
                Err(Error::AnalyzerBudgetExhausted) => {
                    self.skipped.fetch_add(1, Ordering::SeqCst);
                    return Err(Error::AnalyzerBudgetExhausted);
                }
                Err(err) if attempt == 0 => {
                    warn!(error = %err, "Exhaustive verification failed, retrying once");
                    continue;
                }
                Err(err) => return Err(err),
            };

            if let Some(dto) =
                recover_json(&raw).and_then(|json| serde_json::from_str::<ExhaustiveDto>(json).ok())
            {
                return Ok(ExhaustiveVerdict {
                    is_complete: dto.is_complete,
                    confidence: dto.confidence.clamp(0.0, 1.0),
                    missing_cases: dto.missing_cases,
                });
            }
        }

        Ok(ExhaustiveVerdict {
            is_complete: false,
            confidence: 0.0,
            missing_cases: vec!["parse_failure".into()],
        })
    }
}

/// Deterministic keyword rules used when no LLM is configured, carried
/// over from the scanner's pre-LLM era.
fn rule_fallback(a: &Market, b: &Market) -> RelationshipAnalysis {
    let qa = a.question.to_ascii_lowercase();
    let qb = b.question.to_ascii_lowercase();

    const REPUBLICANS: &[&str] = &["trump", "desantis", "haley", "vance"];
    const DEMOCRATS: &[&str] = &["biden", "harris", "newsom"];
    let names = |q: &str, list: &[&str]| list.iter().any(|n| q.contains(n));

    // A named candidate winning implies the party winning.
    let candidate_implies_party = |qa: &str, qb: &str| {
        (qb.contains("republican") && names(qa, REPUBLICANS) && !qa.contains("republican"))
            || (qb.contains("democrat") && names(qa, DEMOCRATS) && !qa.contains("democrat"))
    };
    if candidate_implies_party(&qa, &qb) {
        return RelationshipAnalysis {
            relation: RelationType::ImpliesAb,
            confidence: 0.9,
            reasoning: "A candidate winning implies their party winning".into(),
            edge_cases: vec!["candidate could run as an independent".into()],
            resolution_compatible: true,
        };
    }
    if candidate_implies_party(&qb, &qa) {
        return RelationshipAnalysis {
            relation: RelationType::ImpliesBa,
            confidence: 0.9,
            reasoning: "A candidate winning implies their party winning".into(),
            edge_cases: vec!["candidate could run as an independent".into()],
            resolution_compatible: true,
        };
    }

    // Winning the title implies making the playoffs.
    if qa.contains("champion") && qb.contains("playoff") {
        return RelationshipAnalysis {
            relation: RelationType::ImpliesAb,
            confidence: 0.99,
            reasoning: "Winning the championship requires reaching the playoffs".into(),
            edge_cases: vec![],
            resolution_compatible: true,
        };
    }
    if qa.contains("playoff") && qb.contains("champion") {
        return RelationshipAnalysis {
            relation: RelationType::ImpliesBa,
            confidence: 0.99,
            reasoning: "Winning the championship requires reaching the playoffs".into(),
            edge_cases: vec![],
            resolution_compatible: true,
        };
    }

    if a.event_id == b.event_id {
        return RelationshipAnalysis {
            relation: RelationType::MutualExclusive,
            confidence: 0.8,
            reasoning: "Outcomes of one event are typically mutually exclusive".into(),
            edge_cases: vec!["set may not be exhaustive".into()],
            resolution_compatible: true,
        };
    }

    RelationshipAnalysis::independent("no rule matched")
}
