//! Interval market structures.
//!
//! An interval market asserts that an underlying falls within a range
//! ("Will SOL be between $100 and $150 on January 4?"). Bounds may be
//! open-ended; inclusivity follows the question text. Chains of adjacent,
//! mutually exclusive intervals that cover the whole line form a partition
//! whose YES prices must sum to one.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::MarketId;

/// Parsed structure of an interval question.
///
/// `lower = None` means unbounded below, `upper = None` unbounded above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalInfo {
    /// Market the parse came from.
    pub market_id: MarketId,
    /// Canonical asset symbol.
    pub asset: String,
    /// Lower bound, `None` for -inf.
    pub lower: Option<Decimal>,
    /// Upper bound, `None` for +inf.
    pub upper: Option<Decimal>,
    /// Whether the lower bound itself is inside the interval.
    pub lower_inclusive: bool,
    /// Whether the upper bound itself is inside the interval.
    pub upper_inclusive: bool,
    /// Unit of the bounds ("USD", "%", or empty).
    pub unit: String,
    /// Resolution deadline, taken from the market.
    pub deadline: DateTime<Utc>,
}

impl IntervalInfo {
    /// True when the interval covers the whole line.
    #[must_use]
    pub fn is_unbounded(&self) -> bool {
        self.lower.is_none() && self.upper.is_none()
    }

    /// True when a point value falls inside the interval.
    #[must_use]
    pub fn contains(&self, value: Decimal) -> bool {
        let above_lower = match self.lower {
            None => true,
            Some(l) if self.lower_inclusive => value >= l,
            Some(l) => value > l,
        };
        let below_upper = match self.upper {
            None => true,
            Some(u) if self.upper_inclusive => value <= u,
            Some(u) => value < u,
        };
        above_lower && below_upper
    }

    /// True when `self` is fully contained in `other` (self YES forces
    /// other YES).
    #[must_use]
    pub fn is_subset_of(&self, other: &Self) -> bool {
        let lower_ok = match (self.lower, other.lower) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(a), Some(b)) => a > b || (a == b && (other.lower_inclusive || !self.lower_inclusive)),
        };
        let upper_ok = match (self.upper, other.upper) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(a), Some(b)) => a < b || (a == b && (other.upper_inclusive || !self.upper_inclusive)),
        };
        lower_ok && upper_ok
    }

    /// True when the two intervals cannot both contain the underlying.
    #[must_use]
    pub fn is_disjoint_with(&self, other: &Self) -> bool {
        let below = |a: &Self, b: &Self| match (a.upper, b.lower) {
            (Some(u), Some(l)) => u < l || (u == l && !(a.upper_inclusive && b.lower_inclusive)),
            _ => false,
        };
        below(self, other) || below(other, self)
    }

    /// True when `other` starts exactly where `self` ends, with no gap and
    /// no overlap: the shared boundary belongs to exactly one side.
    #[must_use]
    pub fn is_adjacent_below(&self, other: &Self) -> bool {
        match (self.upper, other.lower) {
            (Some(u), Some(l)) => u == l && (self.upper_inclusive ^ other.lower_inclusive),
            _ => false,
        }
    }
}
