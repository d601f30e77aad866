//! Arbitrage opportunity types: legs, economics, audit trail, lifecycle.
//!
//! An [`Opportunity`] is a plan to buy one unit of each leg. The economics
//! are all derived from the legs and the worst-case payoff: cost is the
//! sum of effective buy prices, profit is `guaranteed_return - cost`, and
//! APY annualizes the profit over the earliest leg deadline. The
//! validation engine annotates the opportunity with one trail entry per
//! layer reached; rejected opportunities carry the layer and reason.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::id::{MarketId, OpportunityId};
use super::market::Side;
use super::money::Price;
use super::relation::RelationshipAnalysis;

/// Which detection strategy produced an opportunity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyKind {
    /// Threshold-ladder price inversion.
    Monotonicity,
    /// Interval partition priced below one.
    Interval,
    /// Mutually exclusive exhaustive set priced below one.
    Exhaustive,
    /// Implication priced backwards.
    Implication,
    /// Equivalent markets priced apart.
    Equivalent,
    /// Nested time windows priced backwards.
    Temporal,
}

impl StrategyKind {
    /// Stable lowercase name used in configuration and logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Monotonicity => "monotonicity",
            Self::Interval => "interval",
            Self::Exhaustive => "exhaustive",
            Self::Implication => "implication",
            Self::Equivalent => "equivalent",
            Self::Temporal => "temporal",
        }
    }
}

/// One purchase in the plan: one unit of one outcome token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    /// Market to trade.
    pub market_id: MarketId,
    /// Outcome side to buy.
    pub side: Side,
    /// Effective buy price at discovery (re-priced from books in Layer 3).
    pub buy_price: Price,
}

impl Leg {
    /// Creates a new leg.
    #[must_use]
    pub fn new(market_id: MarketId, side: Side, buy_price: Price) -> Self {
        Self {
            market_id,
            side,
            buy_price,
        }
    }
}

/// Qualitative APY band assigned in Layer 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApyRating {
    /// Exceptional annualized return.
    Excellent,
    /// Solid annualized return.
    Good,
    /// Above the floor but unremarkable.
    Acceptable,
    /// Below the floor, or the market has already expired.
    Reject,
}

/// Resolution-source compatibility of the legs, assigned in Layer 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OracleAlignment {
    /// Identical resolution sources.
    Aligned,
    /// Same authority class (e.g. both major crypto exchanges).
    Compatible,
    /// Different authority classes; historically the dominant failure
    /// mode of naive combinatorial arbitrage.
    Misaligned,
}

/// The six validation layers, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationLayer {
    /// Layer 1: relation analysis present and self-consistent.
    Semantic,
    /// Layer 2: time windows, oracle alignment, threshold direction.
    Rules,
    /// Layer 3: executable cost, slippage, depth.
    Math,
    /// Layer 4: annualized return floor.
    Apy,
    /// Layer 5: human-review checklist (never rejects).
    Checklist,
    /// Layer 6: pre-flight re-pricing on fresh books.
    Preflight,
}

impl ValidationLayer {
    /// Stable name used in rejection summaries.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Semantic => "semantic",
            Self::Rules => "rules",
            Self::Math => "math",
            Self::Apy => "apy",
            Self::Checklist => "checklist",
            Self::Preflight => "preflight",
        }
    }
}

/// One validation-layer decision on the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailEntry {
    /// Layer that produced the entry.
    pub layer: ValidationLayer,
    /// Whether the candidate passed the layer.
    pub passed: bool,
    /// Human-readable reason populated with the decision's numbers.
    pub reason: String,
}

/// Lifecycle state of an opportunity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OpportunityStatus {
    /// Discovered, not yet validated.
    Pending,
    /// Currently owned by the validation pipeline.
    Validating,
    /// Passed all six layers.
    Accepted,
    /// Rejected by a validation layer.
    Rejected {
        /// Layer that rejected.
        layer: ValidationLayer,
        /// Reason recorded by the layer.
        reason: String,
    },
    /// Plan went stale before Layer 6 acceptance.
    Stale,
}

/// A candidate arbitrage: buy one unit of each leg.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opportunity {
    /// Unique id.
    pub id: OpportunityId,
    /// Strategy that produced the candidate.
    pub strategy: StrategyKind,
    /// Ordered legs of the plan.
    pub legs: Vec<Leg>,
    /// Worst-case payoff across outcomes when holding all legs.
    pub guaranteed_return: Decimal,
    /// Profit implied by catalog mids, `1 - sum(mid)`; diagnostic only.
    pub mid_profit: Decimal,
    /// Smallest leg liquidity in USD.
    pub min_leg_liquidity_usd: Decimal,
    /// Days until the earliest leg deadline, >= 0.
    pub days_to_resolution: Decimal,
    /// Annualized return, set in Layer 4.
    pub apy: Option<Decimal>,
    /// APY band, set in Layer 4.
    pub apy_rating: Option<ApyRating>,
    /// Oracle alignment, set in Layer 2.
    pub oracle_alignment: Option<OracleAlignment>,
    /// Total VWAP slippage over best asks for the target notional.
    pub slippage_cost: Decimal,
    /// Per-layer decisions, in the order the layers ran.
    pub validation_trail: Vec<TrailEntry>,
    /// Analyzer verdict, when the strategy used one.
    pub relationship_analysis: Option<RelationshipAnalysis>,
    /// Human-review checklist, populated in Layer 5.
    pub checklist: Vec<String>,
    /// Lifecycle state.
    pub status: OpportunityStatus,
    /// When the strategy emitted the candidate.
    pub discovered_at: DateTime<Utc>,
    /// When Layer 6 snapshotted fresh books, set on acceptance.
    pub plan_snapshot_at: Option<DateTime<Utc>>,
}

impl Opportunity {
    /// Creates a pending opportunity.
    #[must_use]
    pub fn new(strategy: StrategyKind, legs: Vec<Leg>, guaranteed_return: Decimal) -> Self {
        Self {
            id: OpportunityId::new(),
            strategy,
            legs,
            guaranteed_return,
            mid_profit: Decimal::ZERO,
            min_leg_liquidity_usd: Decimal::ZERO,
            days_to_resolution: Decimal::ZERO,
            apy: None,
            apy_rating: None,
            oracle_alignment: None,
            slippage_cost: Decimal::ZERO,
            validation_trail: Vec::new(),
            relationship_analysis: None,
            checklist: Vec::new(),
            status: OpportunityStatus::Pending,
            discovered_at: Utc::now(),
            plan_snapshot_at: None,
        }
    }

    /// Total cost: sum of leg buy prices.
    #[must_use]
    pub fn cost(&self) -> Decimal {
        self.legs.iter().map(|leg| leg.buy_price).sum()
    }

    /// Worst-case profit: `guaranteed_return - cost`.
    #[must_use]
    pub fn effective_profit(&self) -> Decimal {
        self.guaranteed_return - self.cost()
    }

    /// Profit as a fraction of cost; zero when cost is zero.
    #[must_use]
    pub fn profit_pct(&self) -> Decimal {
        let cost = self.cost();
        if cost.is_zero() {
            Decimal::ZERO
        } else {
            self.effective_profit() / cost
        }
    }

    /// Annualizes the profit over `days` (clamped to at least one day).
    #[must_use]
    pub fn annualized(&self, days: Decimal) -> Decimal {
        let days = days.max(Decimal::ONE);
        self.profit_pct() * (dec!(365) / days)
    }

    /// Canonical deduplication key: strategy plus the sorted
    /// `(market_id, side)` tuples of the legs. Two candidates with the
    /// same key are the same trade regardless of leg order or pricing.
    #[must_use]
    pub fn dedup_key(&self) -> (StrategyKind, Vec<(MarketId, Side)>) {
        let mut legs: Vec<(MarketId, Side)> = self
            .legs
            .iter()
            .map(|leg| (leg.market_id.clone(), leg.side))
            .collect();
        legs.sort();
        (self.strategy, legs)
    }

    /// Records a layer decision on the trail.
    pub fn record(&mut self, layer: ValidationLayer, passed: bool, reason: impl Into<String>) {
        self.validation_trail.push(TrailEntry {
            layer,
            passed,
            reason: reason.into(),
        });
    }

    /// Rejects the opportunity at a layer, recording the trail entry.
    pub fn reject(&mut self, layer: ValidationLayer, reason: impl Into<String>) {
        let reason = reason.into();
        self.record(layer, false, reason.clone());
        self.status = OpportunityStatus::Rejected { layer, reason };
    }

    /// True once the opportunity has been accepted.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        self.status == OpportunityStatus::Accepted
    }
}
