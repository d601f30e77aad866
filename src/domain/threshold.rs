//! Threshold market structures.
//!
//! A threshold market asserts a numeric inequality on an underlying asset
//! by a deadline ("Will BTC be above $110k by June 30?"). For a scalar
//! underlying the implied CDF must be monotone, which makes ladders of
//! threshold markets on the same `(asset, deadline)` mechanically
//! checkable: for ABOVE questions the YES price must be non-increasing in
//! the level, for BELOW non-decreasing.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::MarketId;

/// Direction of the inequality a threshold question asserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ThresholdDirection {
    /// Underlying above the level.
    Above,
    /// Underlying below the level.
    Below,
}

/// Parsed structure of a threshold question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdInfo {
    /// Market the parse came from.
    pub market_id: MarketId,
    /// Canonical asset symbol (e.g. "btc").
    pub asset: String,
    /// Inequality direction.
    pub direction: ThresholdDirection,
    /// Threshold level after unit expansion ($110k -> 110000).
    pub level: Decimal,
    /// Unit of the level ("USD", "%", or empty).
    pub unit: String,
    /// Resolution deadline, taken from the market.
    pub deadline: DateTime<Utc>,
    /// Touch-style phrasing ("hit"/"reach"/"dip to"): resolves on any
    /// touch before the deadline rather than on the terminal price.
    /// Touch questions are flagged for human review downstream.
    pub touch: bool,
}

impl ThresholdInfo {
    /// Renders the parse back into a canonical question string.
    ///
    /// `parse(render(t), deadline) == t` holds for every well-formed info;
    /// the round trip is exercised by the parser tests.
    #[must_use]
    pub fn render(&self) -> String {
        let verb = match (self.direction, self.touch) {
            (ThresholdDirection::Above, false) => "be above",
            (ThresholdDirection::Above, true) => "hit",
            (ThresholdDirection::Below, false) => "be below",
            (ThresholdDirection::Below, true) => "dip to",
        };
        let level = match self.unit.as_str() {
            "USD" => format!("${}", self.level.normalize()),
            "%" => format!("{}%", self.level.normalize()),
            _ => format!("{}", self.level.normalize()),
        };
        format!(
            "Will {} {} {} by {}?",
            self.asset.to_uppercase(),
            verb,
            level,
            self.deadline.format("%B %-d, %Y"),
        )
    }

    /// True when `self` logically implies `other`: resolution of this
    /// market as YES forces the other to YES.
    ///
    /// Only defined within one asset and direction: for ABOVE a higher
    /// level implies every lower level; for BELOW a lower level implies
    /// every higher level.
    #[must_use]
    pub fn implies(&self, other: &Self) -> bool {
        if self.asset != other.asset || self.direction != other.direction {
            return false;
        }
        match self.direction {
            ThresholdDirection::Above => self.level >= other.level,
            ThresholdDirection::Below => self.level <= other.level,
        }
    }
}

/// A sorted ladder of thresholds sharing `(asset, direction, deadline)`.
///
/// Rungs are sorted by level ascending; level duplicates have already
/// been collapsed to the most liquid market.
#[derive(Debug, Clone)]
pub struct Ladder {
    /// Asset the ladder is built on.
    pub asset: String,
    /// Shared direction.
    pub direction: ThresholdDirection,
    /// Representative deadline of the group (rungs lie within tolerance).
    pub deadline: DateTime<Utc>,
    /// Rungs sorted by level ascending.
    pub rungs: Vec<ThresholdInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn info(level: Decimal, direction: ThresholdDirection) -> ThresholdInfo {
        ThresholdInfo {
            market_id: MarketId::new("m"),
            asset: "btc".into(),
            direction,
            level,
            unit: "USD".into(),
            deadline: Utc.with_ymd_and_hms(2026, 6, 30, 12, 0, 0).unwrap(),
            touch: false,
        }
    }

    #[test]
    fn above_higher_level_implies_lower() {
        let high = info(dec!(110000), ThresholdDirection::Above);
        let low = info(dec!(100000), ThresholdDirection::Above);
        assert!(high.implies(&low));
        assert!(!low.implies(&high));
    }

    #[test]
    fn below_lower_level_implies_higher() {
        let low = info(dec!(90000), ThresholdDirection::Below);
        let high = info(dec!(100000), ThresholdDirection::Below);
        assert!(low.implies(&high));
        assert!(!high.implies(&low));
    }

    #[test]
    fn implication_never_crosses_direction() {
        let above = info(dec!(100000), ThresholdDirection::Above);
        let below = info(dec!(100000), ThresholdDirection::Below);
        assert!(!above.implies(&below));
        assert!(!below.implies(&above));
    }

    #[test]
    fn render_is_canonical() {
        let t = info(dec!(110000), ThresholdDirection::Above);
        assert_eq!(t.render(), "Will BTC be above $110000 by June 30, 2026?");
    }

    #[test]
    fn render_touch_uses_touch_verbs() {
        let mut t = info(dec!(110000), ThresholdDirection::Above);
        t.touch = true;
        assert!(t.render().contains("hit $110000"));
        t.direction = ThresholdDirection::Below;
        assert!(t.render().contains("dip to $110000"));
    }
}
