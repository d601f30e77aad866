//! Six-layer validation engine.
//!
//! Candidates pass through the layers strictly in order; the first
//! failing layer rejects the candidate and ends its pipeline. Every
//! layer reached leaves a trail entry, so an accepted opportunity
//! carries a complete audit of how it survived:
//!
//! 1. **Semantic** - the relation analysis a strategy relied on exists,
//!    is self-consistent, and is not `INDEPENDENT`.
//! 2. **Rules** - deadline windows line up, resolution oracles align,
//!    and threshold-ladder implications match the parsed levels.
//! 3. **Math** - executable cost from live order books beats the
//!    worst-case payoff with room for VWAP slippage, and every leg has
//!    real depth near the touch.
//! 4. **APY** - capital locked until resolution must clear the
//!    annualized floor.
//! 5. **Checklist** - attaches the human-review checklist; never
//!    rejects.
//! 6. **Pre-flight** - re-fetches books immediately before emission and
//!    re-runs the execution math; degraded plans go stale instead of
//!    being emitted.

pub mod oracle;

pub use oracle::OracleDirectory;

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::application::graph::MarketGraph;
use crate::domain::market::{Market, Side};
use crate::domain::opportunity::{
    ApyRating, Opportunity, OpportunityStatus, OracleAlignment, StrategyKind, ValidationLayer,
};
use crate::infrastructure::config::ScanConfig;
use crate::port::outbound::MarketSource;

/// Validation thresholds, all sliced from the scan configuration.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Minimum edge of payoff over cost (Layer 3).
    pub min_profit: Decimal,
    /// Minimum edge after slippage (Layers 3 and 6).
    pub min_exec_profit: Decimal,
    /// Notional priced by the VWAP walk.
    pub target_notional: Decimal,
    /// Minimum banded ask depth per leg.
    pub min_depth_usd: Decimal,
    /// Band above best ask for the depth measure.
    pub depth_price_band: Decimal,
    /// Annualized return floor (Layer 4).
    pub min_apy: Decimal,
    /// EXCELLENT rating floor.
    pub apy_excellent: Decimal,
    /// GOOD rating floor.
    pub apy_good: Decimal,
    /// Unaccepted plans older than this go stale.
    pub plan_max_age: chrono::Duration,
    /// Deadline window tolerance (Layer 2).
    pub time_tolerance: chrono::Duration,
}

impl ValidationConfig {
    /// Builds the validation slice of the scan configuration.
    #[must_use]
    pub fn from_scan(scan: &ScanConfig) -> Self {
        Self {
            min_profit: scan.min_profit_pct,
            min_exec_profit: scan.min_exec_profit,
            target_notional: scan.target_notional_usd,
            min_depth_usd: scan.min_depth_usd,
            depth_price_band: scan.depth_price_band,
            min_apy: scan.min_apy,
            apy_excellent: scan.apy_excellent,
            apy_good: scan.apy_good,
            plan_max_age: scan.plan_max_age(),
            time_tolerance: scan.time_tolerance(),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self::from_scan(&ScanConfig::default())
    }
}

/// Outcome of pricing every leg against live books.
struct ExecutionCheck {
    /// Total cost at live best asks.
    cost: Decimal,
    /// Total VWAP slippage over best asks for the target notional.
    slippage: Decimal,
    /// First leg that failed the depth floor, with the measured depth.
    illiquid: Option<(String, Decimal)>,
}

/// The validation engine. Holds the only handle through which order
/// books are fetched; strategies never see them.
pub struct ValidationEngine {
    config: ValidationConfig,
    source: Arc<dyn MarketSource>,
    book_pool: Arc<Semaphore>,
    oracle: OracleDirectory,
}

impl ValidationEngine {
    /// Creates an engine with a book-fetch pool of the given size.
    #[must_use]
    pub fn new(
        config: ValidationConfig,
        source: Arc<dyn MarketSource>,
        book_concurrency: usize,
    ) -> Self {
        Self {
            config,
            source,
            book_pool: Arc::new(Semaphore::new(book_concurrency.max(1))),
            oracle: OracleDirectory::new(),
        }
    }

    /// Runs a candidate through all six layers.
    pub async fn validate(&self, mut opp: Opportunity, graph: &MarketGraph) -> Opportunity {
        opp.status = OpportunityStatus::Validating;

        if !self.layer_semantic(&mut opp) {
            return opp;
        }
        if !self.layer_rules(&mut opp, graph) {
            return opp;
        }
        if !self.layer_math(&mut opp, graph).await {
            return opp;
        }
        if !self.layer_apy(&mut opp, graph) {
            return opp;
        }
        self.layer_checklist(&mut opp, graph);
        self.layer_preflight(&mut opp, graph).await;
        opp
    }

    // ----- Layer 1: semantic -------------------------------------------------

    fn layer_semantic(&self, opp: &mut Opportunity) -> bool {
        let needs_analysis = matches!(
            opp.strategy,
            StrategyKind::Implication | StrategyKind::Equivalent
        );
        if !needs_analysis {
            opp.record(ValidationLayer::Semantic, true, "no relation analysis required");
            return true;
        }

        let Some(analysis) = opp.relationship_analysis.clone() else {
            opp.reject(ValidationLayer::Semantic, "missing relation analysis");
            return false;
        };
        if !analysis.is_self_consistent() {
            opp.reject(
                ValidationLayer::Semantic,
                "relation analysis contradicts its own reasoning",
            );
            return false;
        }
        if analysis.relation == crate::domain::relation::RelationType::Independent
            || analysis.confidence <= 0.0
        {
            opp.reject(ValidationLayer::Semantic, "relation analysis is independent");
            return false;
        }

        opp.record(
            ValidationLayer::Semantic,
            true,
            format!(
                "relation {:?} at confidence {:.2}",
                analysis.relation, analysis.confidence
            ),
        );
        true
    }

    // ----- Layer 2: rules & oracle alignment ---------------------------------

    fn layer_rules(&self, opp: &mut Opportunity, graph: &MarketGraph) -> bool {
        let markets: Vec<&Market> = opp
            .legs
            .iter()
            .filter_map(|leg| graph.market(&leg.market_id))
            .collect();
        if markets.len() != opp.legs.len() {
            opp.reject(ValidationLayer::Rules, "leg references unknown market");
            return false;
        }

        // Time windows.
        match opp.strategy {
            StrategyKind::Implication | StrategyKind::Temporal => {
                // Legs are (consequent YES, antecedent NO) by
                // construction; the consequent must outlive the
                // antecedent within tolerance.
                if let (Some(end_consequent), Some(end_antecedent)) =
                    (markets[0].end_time, markets[1].end_time)
                {
                    if end_consequent < end_antecedent - self.config.time_tolerance {
                        opp.reject(
                            ValidationLayer::Rules,
                            "consequent resolves before antecedent",
                        );
                        return false;
                    }
                }
            }
            _ => {
                let ends: Vec<_> = markets.iter().filter_map(|m| m.end_time).collect();
                if let (Some(min), Some(max)) = (ends.iter().min(), ends.iter().max()) {
                    if *max - *min > self.config.time_tolerance {
                        opp.reject(
                            ValidationLayer::Rules,
                            format!(
                                "leg deadlines spread over {}h exceeds tolerance",
                                (*max - *min).num_hours()
                            ),
                        );
                        return false;
                    }
                }
            }
        }

        // Threshold-direction check: the NO leg's market must logically
        // imply the YES leg's market.
        if matches!(
            opp.strategy,
            StrategyKind::Monotonicity | StrategyKind::Implication | StrategyKind::Temporal
        ) && opp.legs.len() == 2
        {
            let yes_leg = opp.legs.iter().position(|l| l.side == Side::Yes);
            let no_leg = opp.legs.iter().position(|l| l.side == Side::No);
            if let (Some(yi), Some(ni)) = (yes_leg, no_leg) {
                let t_yes = graph.threshold_for(&opp.legs[yi].market_id);
                let t_no = graph.threshold_for(&opp.legs[ni].market_id);
                if let (Some(t_yes), Some(t_no)) = (t_yes, t_no) {
                    if t_yes.asset == t_no.asset
                        && t_yes.direction == t_no.direction
                        && !t_no.implies(t_yes)
                    {
                        opp.reject(
                            ValidationLayer::Rules,
                            "implication direction contradicts parsed threshold levels",
                        );
                        return false;
                    }
                }
            }
        }

        // Oracle alignment.
        let alignment = self.oracle.classify_all(&markets);
        opp.oracle_alignment = Some(alignment);
        if alignment == OracleAlignment::Misaligned {
            opp.reject(ValidationLayer::Rules, "resolution oracles misaligned");
            return false;
        }

        opp.record(
            ValidationLayer::Rules,
            true,
            format!("time windows consistent; oracle {alignment:?}"),
        );
        true
    }

    // ----- Layer 3: math & execution -----------------------------------------

    async fn execution_check(
        &self,
        opp: &mut Opportunity,
        graph: &MarketGraph,
    ) -> ExecutionCheck {
        let mut cost = Decimal::ZERO;
        let mut slippage = Decimal::ZERO;
        let mut illiquid = None;

        // Books are fetched through the bounded pool, one permit per
        // leg; order books are never cached across the plan lifetime.
        for leg in &mut opp.legs {
            let Some(market) = graph.market(&leg.market_id) else {
                illiquid = illiquid.or(Some((leg.market_id.to_string(), Decimal::ZERO)));
                continue;
            };
            let token = market.token(leg.side).clone();

            let book = {
                let _permit = self
                    .book_pool
                    .acquire()
                    .await
                    .expect("semaphore never closed");
                self.source.fetch_order_book(&token).await
            };
            let book = match book {
                Ok(book) => book,
                Err(err) => {
                    debug!(token = %token, error = %err, "Book fetch failed during validation");
                    crate::domain::book::Book::empty(token.clone())
                }
            };

            let depth = book.ask_depth_within(self.config.depth_price_band);
            if depth < self.config.min_depth_usd {
                illiquid = illiquid.or(Some((leg.market_id.to_string(), depth)));
            }

            match (book.best_ask(), book.vwap_buy(self.config.target_notional)) {
                (Some(best), Some(fill)) => {
                    leg.buy_price = best.price;
                    cost += best.price;
                    slippage += fill.vwap - best.price;
                }
                (Some(best), None) => {
                    // Asks exist but cannot cover the target notional.
                    leg.buy_price = best.price;
                    cost += best.price;
                    illiquid = illiquid.or(Some((leg.market_id.to_string(), depth)));
                }
                (None, _) => {
                    leg.buy_price = market.effective_buy_price(leg.side);
                    cost += leg.buy_price;
                    illiquid = illiquid.or(Some((leg.market_id.to_string(), Decimal::ZERO)));
                }
            }
        }

        ExecutionCheck {
            cost,
            slippage,
            illiquid,
        }
    }

    async fn layer_math(&self, opp: &mut Opportunity, graph: &MarketGraph) -> bool {
        let check = self.execution_check(opp, graph).await;

        if let Some((market_id, depth)) = check.illiquid {
            opp.reject(
                ValidationLayer::Math,
                format!("INSUFFICIENT_LIQUIDITY: leg {market_id} depth ${depth} below floor"),
            );
            return false;
        }

        if check.cost >= opp.guaranteed_return - self.config.min_profit {
            opp.reject(
                ValidationLayer::Math,
                format!(
                    "cost {} leaves no edge against guaranteed return {}",
                    check.cost, opp.guaranteed_return
                ),
            );
            return false;
        }

        let net = opp.guaranteed_return - check.cost - check.slippage;
        if net < self.config.min_exec_profit {
            opp.reject(
                ValidationLayer::Math,
                format!(
                    "slippage {} erodes edge to {} below executable floor",
                    check.slippage, net
                ),
            );
            return false;
        }

        opp.slippage_cost = check.slippage;
        opp.record(
            ValidationLayer::Math,
            true,
            format!(
                "cost {} + slippage {} against payoff {}",
                check.cost, check.slippage, opp.guaranteed_return
            ),
        );
        true
    }

    // ----- Layer 4: APY ------------------------------------------------------

    fn rate(&self, apy: Decimal) -> ApyRating {
        if apy >= self.config.apy_excellent {
            ApyRating::Excellent
        } else if apy >= self.config.apy_good {
            ApyRating::Good
        } else if apy >= self.config.min_apy {
            ApyRating::Acceptable
        } else {
            ApyRating::Reject
        }
    }

    fn layer_apy(&self, opp: &mut Opportunity, graph: &MarketGraph) -> bool {
        let now = Utc::now();
        let days = opp
            .legs
            .iter()
            .filter_map(|leg| graph.market(&leg.market_id).and_then(|m| m.end_time))
            .map(|end| {
                Decimal::from((end - now).num_seconds().max(0)) / Decimal::from(86_400)
            })
            .min();

        let Some(days) = days else {
            opp.apy_rating = Some(ApyRating::Reject);
            opp.reject(ValidationLayer::Apy, "no leg carries a resolution deadline");
            return false;
        };
        opp.days_to_resolution = days;

        if days.is_zero() {
            // Already resolved or resolving now: annualization is
            // undefined, so the rating is a hard reject.
            opp.apy = Some(opp.annualized(Decimal::ONE));
            opp.apy_rating = Some(ApyRating::Reject);
            opp.reject(ValidationLayer::Apy, "deadline already passed");
            return false;
        }

        let apy = opp.annualized(days);
        let rating = self.rate(apy);
        opp.apy = Some(apy);
        opp.apy_rating = Some(rating);

        if apy < self.config.min_apy {
            opp.reject(
                ValidationLayer::Apy,
                format!("apy {apy:.4} below floor {}", self.config.min_apy),
            );
            return false;
        }

        opp.record(
            ValidationLayer::Apy,
            true,
            format!("apy {apy:.4} over {days:.1} days rated {rating:?}"),
        );
        true
    }

    // ----- Layer 5: checklist ------------------------------------------------

    fn layer_checklist(&self, opp: &mut Opportunity, graph: &MarketGraph) {
        let mut items = Vec::new();

        items.push(format!(
            "[ ] Logic: {} basket with {} legs holds in every outcome",
            opp.strategy.name(),
            opp.legs.len()
        ));
        if let Some(analysis) = &opp.relationship_analysis {
            items.push(format!(
                "[ ] Analyzer reasoning reviewed: {}",
                analysis.reasoning
            ));
            for edge_case in &analysis.edge_cases {
                items.push(format!("[ ] Edge case considered: {edge_case}"));
            }
        }

        let sources: Vec<String> = opp
            .legs
            .iter()
            .filter_map(|leg| graph.market(&leg.market_id))
            .map(|m| {
                self.oracle
                    .extract(m)
                    .map_or_else(|| "unknown".to_string(), |a| a.name.to_string())
            })
            .collect();
        items.push(format!(
            "[ ] Rules: oracle {} across sources [{}]",
            opp.oracle_alignment
                .map_or_else(|| "unchecked".to_string(), |a| format!("{a:?}")),
            sources.join(", ")
        ));
        if sources.iter().any(|s| s == "unknown") {
            items.push("[ ] Read resolution rules by hand: no recognized authority".into());
        }

        items.push(format!(
            "[ ] Time: all legs resolve within tolerance; earliest in {:.1} days",
            opp.days_to_resolution
        ));

        let touch_legs: Vec<&str> = opp
            .legs
            .iter()
            .filter(|leg| {
                graph
                    .threshold_for(&leg.market_id)
                    .is_some_and(|t| t.touch)
            })
            .map(|leg| leg.market_id.as_str())
            .collect();
        if !touch_legs.is_empty() {
            items.push(format!(
                "[ ] Touch-style legs resolve on any touch, not the terminal price: [{}]",
                touch_legs.join(", ")
            ));
        }

        items.push(format!(
            "[ ] Liquidity: min leg liquidity ${}, slippage cost {} on ${} notional",
            opp.min_leg_liquidity_usd, opp.slippage_cost, self.config.target_notional
        ));
        items.push(format!(
            "[ ] APY {} rated {:?} clears the {} floor",
            opp.apy.unwrap_or_default(),
            opp.apy_rating.unwrap_or(ApyRating::Reject),
            self.config.min_apy
        ));
        items.push("[ ] Execute a small test basket before full size".into());

        opp.checklist = items;
        opp.record(
            ValidationLayer::Checklist,
            true,
            format!("{} checklist items attached", opp.checklist.len()),
        );
    }

    // ----- Layer 6: pre-flight -----------------------------------------------

    async fn layer_preflight(&self, opp: &mut Opportunity, graph: &MarketGraph) {
        let age = Utc::now() - opp.discovered_at;
        if age > self.config.plan_max_age {
            opp.record(
                ValidationLayer::Preflight,
                false,
                format!("plan aged {}s beyond maximum", age.num_seconds()),
            );
            opp.status = OpportunityStatus::Stale;
            return;
        }

        // Fresh books, same math as Layer 3.
        let check = self.execution_check(opp, graph).await;
        let net = opp.guaranteed_return - check.cost - check.slippage;
        let degraded = check.illiquid.is_some() || net < self.config.min_exec_profit;
        if degraded {
            info!(
                opportunity = %opp.id,
                net = %net,
                "Executable profit degraded at pre-flight, plan is stale"
            );
            opp.record(
                ValidationLayer::Preflight,
                false,
                format!("executable profit degraded to {net} on fresh books"),
            );
            opp.status = OpportunityStatus::Stale;
            return;
        }

        opp.slippage_cost = check.slippage;
        opp.plan_snapshot_at = Some(Utc::now());
        opp.record(
            ValidationLayer::Preflight,
            true,
            format!("re-priced on fresh books, net edge {net}"),
        );
        opp.status = OpportunityStatus::Accepted;
    }
}

/// A convenience wrapper asserting the universal invariant on accepted
/// opportunities; used by tests and debug assertions.
#[must_use]
pub fn holds_acceptance_invariant(opp: &Opportunity, min_profit: Decimal) -> bool {
    !opp.is_accepted() || opp.effective_profit() > min_profit - dec!(0.0000001)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;
    use parking_lot::Mutex;
    use rust_decimal_macros::dec;
    use std::collections::BTreeSet;
    use std::collections::HashMap;
    use tokio::sync::mpsc;

    use crate::domain::book::{Book, PriceLevel};
    use crate::domain::id::{EventId, MarketId, TokenId};
    use crate::domain::market::{Market, TagInfo};
    use crate::domain::opportunity::Leg;
    use crate::error::Result;

    /// Market source serving scripted books; counts fetches.
    struct ScriptedBooks {
        books: Mutex<HashMap<TokenId, Book>>,
        fetches: Mutex<Vec<TokenId>>,
    }

    impl ScriptedBooks {
        fn new() -> Self {
            Self {
                books: Mutex::new(HashMap::new()),
                fetches: Mutex::new(Vec::new()),
            }
        }

        fn put(&self, token: &str, ask: Decimal, size: Decimal) {
            self.books.lock().insert(
                TokenId::new(token),
                Book::with_levels(
                    TokenId::new(token),
                    vec![],
                    vec![PriceLevel::new(ask, size)],
                ),
            );
        }

        fn fetch_count(&self) -> usize {
            self.fetches.lock().len()
        }
    }

    #[async_trait]
    impl MarketSource for ScriptedBooks {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn list_markets(
            &self,
            _tags: &BTreeSet<String>,
            _active: bool,
            _limit: Option<usize>,
        ) -> Result<mpsc::Receiver<Result<Market>>> {
            let (_tx, rx) = mpsc::channel(1);
            Ok(rx)
        }

        async fn fetch_order_book(&self, token_id: &TokenId) -> Result<Book> {
            self.fetches.lock().push(token_id.clone());
            Ok(self
                .books
                .lock()
                .get(token_id)
                .cloned()
                .unwrap_or_else(|| Book::empty(token_id.clone())))
        }

        async fn fetch_tags(&self) -> Result<Vec<TagInfo>> {
            Ok(vec![])
        }
    }

    fn market(id: &str, yes_mid: Decimal, days_out: i64) -> Market {
        Market {
            id: MarketId::new(id),
            condition_id: String::new(),
            token_yes: TokenId::new(format!("{id}-y")),
            token_no: TokenId::new(format!("{id}-n")),
            question: format!("Question {id}?"),
            market_description: String::new(),
            event_description: "Resolves per Coinbase.".into(),
            event_id: EventId::new(format!("event-{id}")),
            event_title: String::new(),
            tags: Default::default(),
            yes_mid,
            no_mid: Decimal::ONE - yes_mid,
            best_bid_yes: None,
            best_ask_yes: None,
            best_bid_no: None,
            best_ask_no: None,
            liquidity_usd: dec!(50000),
            volume_usd: dec!(0),
            end_time: Some(Utc::now() + Duration::days(days_out)),
            created_at: None,
            resolution_source: "Coinbase".into(),
            neg_risk: false,
        }
    }

    fn two_leg_opp(graph: &MarketGraph) -> Opportunity {
        let legs = vec![
            Leg::new(MarketId::new("a"), Side::Yes, dec!(0.31)),
            Leg::new(MarketId::new("b"), Side::No, dec!(0.61)),
        ];
        crate::application::strategy::build_opportunity(
            StrategyKind::Monotonicity,
            legs,
            Decimal::ONE,
            graph,
        )
    }

    fn engine(source: Arc<ScriptedBooks>) -> ValidationEngine {
        ValidationEngine::new(ValidationConfig::default(), source, 8)
    }

    fn deep(source: &ScriptedBooks, token: &str, ask: Decimal) {
        source.put(token, ask, dec!(100000));
    }

    #[tokio::test]
    async fn profitable_candidate_passes_all_layers() {
        let source = Arc::new(ScriptedBooks::new());
        deep(&source, "a-y", dec!(0.31));
        deep(&source, "b-n", dec!(0.61));

        let graph = MarketGraph::new(vec![market("a", dec!(0.30), 30), market("b", dec!(0.40), 30)]);
        let opp = engine(source.clone())
            .validate(two_leg_opp(&graph), &graph)
            .await;

        assert!(opp.is_accepted(), "status: {:?}", opp.status);
        assert_eq!(opp.validation_trail.len(), 6);
        assert!(opp.validation_trail.iter().all(|t| t.passed));
        assert!(opp.plan_snapshot_at.is_some());
        assert!(!opp.checklist.is_empty());
        // Layers 3 and 6 each fetched both legs.
        assert_eq!(source.fetch_count(), 4);
        assert!(holds_acceptance_invariant(&opp, dec!(0.005)));
    }

    #[tokio::test]
    async fn cost_above_payoff_rejects_at_math() {
        let source = Arc::new(ScriptedBooks::new());
        deep(&source, "a-y", dec!(0.31));
        deep(&source, "b-n", dec!(0.70));

        let graph = MarketGraph::new(vec![market("a", dec!(0.30), 30), market("b", dec!(0.31), 30)]);
        let opp = engine(source).validate(two_leg_opp(&graph), &graph).await;

        match &opp.status {
            OpportunityStatus::Rejected { layer, .. } => {
                assert_eq!(*layer, ValidationLayer::Math);
            }
            other => panic!("expected math rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn shallow_book_rejects_as_insufficient_liquidity() {
        let source = Arc::new(ScriptedBooks::new());
        source.put("a-y", dec!(0.31), dec!(100)); // $31 of depth
        deep(&source, "b-n", dec!(0.61));

        let graph = MarketGraph::new(vec![market("a", dec!(0.30), 30), market("b", dec!(0.40), 30)]);
        let opp = engine(source).validate(two_leg_opp(&graph), &graph).await;

        match &opp.status {
            OpportunityStatus::Rejected { layer, reason } => {
                assert_eq!(*layer, ValidationLayer::Math);
                assert!(reason.contains("INSUFFICIENT_LIQUIDITY"));
            }
            other => panic!("expected liquidity rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn low_apy_rejects_at_layer_four() {
        let source = Arc::new(ScriptedBooks::new());
        deep(&source, "a-y", dec!(0.495));
        deep(&source, "b-n", dec!(0.495));

        // Thin edge over a full year annualizes below the floor.
        let graph = MarketGraph::new(vec![market("a", dec!(0.49), 365), market("b", dec!(0.51), 365)]);
        let opp = engine(source).validate(two_leg_opp(&graph), &graph).await;

        match &opp.status {
            OpportunityStatus::Rejected { layer, .. } => {
                assert_eq!(*layer, ValidationLayer::Apy);
            }
            other => panic!("expected apy rejection, got {other:?}"),
        }
        assert_eq!(opp.apy_rating, Some(ApyRating::Reject));
    }

    #[tokio::test]
    async fn expired_market_rejects_with_reject_rating() {
        let source = Arc::new(ScriptedBooks::new());
        deep(&source, "a-y", dec!(0.31));
        deep(&source, "b-n", dec!(0.61));

        let graph = MarketGraph::new(vec![market("a", dec!(0.30), 0), market("b", dec!(0.40), 0)]);
        let opp = engine(source).validate(two_leg_opp(&graph), &graph).await;

        match &opp.status {
            OpportunityStatus::Rejected { layer, reason } => {
                assert_eq!(*layer, ValidationLayer::Apy);
                assert!(reason.contains("passed"));
            }
            other => panic!("expected apy rejection, got {other:?}"),
        }
        assert_eq!(opp.apy_rating, Some(ApyRating::Reject));
    }

    #[tokio::test]
    async fn misaligned_oracles_reject_at_rules() {
        let source = Arc::new(ScriptedBooks::new());
        deep(&source, "a-y", dec!(0.31));
        deep(&source, "b-n", dec!(0.61));

        let mut a = market("a", dec!(0.30), 30);
        let mut b = market("b", dec!(0.40), 30);
        a.resolution_source = "Coinbase".into();
        a.event_description = "Resolves per Coinbase.".into();
        b.resolution_source = "Associated Press".into();
        b.event_description = "Resolves per the Associated Press.".into();

        let graph = MarketGraph::new(vec![a, b]);
        let opp = engine(source).validate(two_leg_opp(&graph), &graph).await;

        match &opp.status {
            OpportunityStatus::Rejected { layer, reason } => {
                assert_eq!(*layer, ValidationLayer::Rules);
                assert!(reason.contains("misaligned"));
            }
            other => panic!("expected rules rejection, got {other:?}"),
        }
        assert_eq!(opp.oracle_alignment, Some(OracleAlignment::Misaligned));
    }

    #[tokio::test]
    async fn deadline_spread_rejects_at_rules() {
        let source = Arc::new(ScriptedBooks::new());
        deep(&source, "a-y", dec!(0.31));
        deep(&source, "b-n", dec!(0.61));

        let graph = MarketGraph::new(vec![market("a", dec!(0.30), 10), market("b", dec!(0.40), 40)]);
        let opp = engine(source).validate(two_leg_opp(&graph), &graph).await;

        match &opp.status {
            OpportunityStatus::Rejected { layer, .. } => {
                assert_eq!(*layer, ValidationLayer::Rules);
            }
            other => panic!("expected rules rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_analysis_rejects_implication_at_semantic() {
        let source = Arc::new(ScriptedBooks::new());
        let graph = MarketGraph::new(vec![market("a", dec!(0.30), 30), market("b", dec!(0.40), 30)]);

        let legs = vec![
            Leg::new(MarketId::new("b"), Side::Yes, dec!(0.41)),
            Leg::new(MarketId::new("a"), Side::No, dec!(0.71)),
        ];
        let opp = crate::application::strategy::build_opportunity(
            StrategyKind::Implication,
            legs,
            Decimal::ONE,
            &graph,
        );
        let opp = engine(source).validate(opp, &graph).await;

        match &opp.status {
            OpportunityStatus::Rejected { layer, .. } => {
                assert_eq!(*layer, ValidationLayer::Semantic);
            }
            other => panic!("expected semantic rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn widened_preflight_books_go_stale() {
        // Layer 3 sees a healthy book; before Layer 6 the ask widens so
        // the edge evaporates.
        struct WideningBooks {
            inner: ScriptedBooks,
            calls: Mutex<usize>,
        }

        #[async_trait]
        impl MarketSource for WideningBooks {
            fn name(&self) -> &'static str {
                "widening"
            }

            async fn list_markets(
                &self,
                tags: &BTreeSet<String>,
                active: bool,
                limit: Option<usize>,
            ) -> Result<mpsc::Receiver<Result<Market>>> {
                self.inner.list_markets(tags, active, limit).await
            }

            async fn fetch_order_book(&self, token_id: &TokenId) -> Result<Book> {
                let call = {
                    let mut calls = self.calls.lock();
                    *calls += 1;
                    *calls
                };
                // First two fetches are Layer 3; later fetches return a
                // book 3 cents wider.
                let widened = call > 2;
                let ask = if token_id.as_str() == "a-y" {
                    dec!(0.31)
                } else {
                    dec!(0.66)
                };
                let ask = if widened { ask + dec!(0.03) } else { ask };
                Ok(Book::with_levels(
                    token_id.clone(),
                    vec![],
                    vec![PriceLevel::new(ask, dec!(100000))],
                ))
            }

            async fn fetch_tags(&self) -> Result<Vec<TagInfo>> {
                Ok(vec![])
            }
        }

        let source = Arc::new(WideningBooks {
            inner: ScriptedBooks::new(),
            calls: Mutex::new(0),
        });
        let graph = MarketGraph::new(vec![market("a", dec!(0.30), 30), market("b", dec!(0.40), 30)]);
        let opp = ValidationEngine::new(ValidationConfig::default(), source, 8)
            .validate(two_leg_opp(&graph), &graph)
            .await;

        assert_eq!(opp.status, OpportunityStatus::Stale);
        let last = opp.validation_trail.last().unwrap();
        assert_eq!(last.layer, ValidationLayer::Preflight);
        assert!(!last.passed);
    }

    #[tokio::test]
    async fn old_plan_goes_stale_without_refetch() {
        let source = Arc::new(ScriptedBooks::new());
        deep(&source, "a-y", dec!(0.31));
        deep(&source, "b-n", dec!(0.61));

        let graph = MarketGraph::new(vec![market("a", dec!(0.30), 30), market("b", dec!(0.40), 30)]);
        let mut opp = two_leg_opp(&graph);
        opp.discovered_at = Utc::now() - Duration::seconds(120);

        let opp = engine(source).validate(opp, &graph).await;
        assert_eq!(opp.status, OpportunityStatus::Stale);
    }

    #[tokio::test]
    async fn validation_layers_one_to_five_are_idempotent() {
        let source = Arc::new(ScriptedBooks::new());
        deep(&source, "a-y", dec!(0.31));
        deep(&source, "b-n", dec!(0.61));

        let graph = MarketGraph::new(vec![market("a", dec!(0.30), 30), market("b", dec!(0.40), 30)]);
        let engine = engine(source);

        let first = engine.validate(two_leg_opp(&graph), &graph).await;
        let second = engine.validate(two_leg_opp(&graph), &graph).await;

        let trail = |o: &Opportunity| -> Vec<(ValidationLayer, bool)> {
            o.validation_trail
                .iter()
                .take(5)
                .map(|t| (t.layer, t.passed))
                .collect()
        };
        assert_eq!(trail(&first), trail(&second));
    }
}
