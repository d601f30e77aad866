//! Order book types and execution-depth arithmetic.
//!
//! An order book has two sides: bids sorted by price descending (best bid
//! first) and asks sorted by price ascending (best ask first). The
//! validation engine walks the ask side to price a target notional (VWAP)
//! and to measure depth near the touch.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::TokenId;
use super::money::{Price, Size};

/// A single aggregated price level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    /// The price at this level.
    pub price: Price,
    /// Total shares available at this price.
    pub size: Size,
}

impl PriceLevel {
    /// Creates a new price level.
    #[must_use]
    pub const fn new(price: Price, size: Size) -> Self {
        Self { price, size }
    }

    /// Notional value of the level (`price * size`).
    #[must_use]
    pub fn notional(&self) -> Decimal {
        self.price * self.size
    }
}

/// Result of walking the ask side for a target notional.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VwapFill {
    /// Volume-weighted average execution price.
    pub vwap: Price,
    /// Shares acquired.
    pub shares: Size,
    /// Notional spent.
    pub spent: Decimal,
}

/// Order book for a single outcome token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    /// Token this book belongs to.
    pub token_id: TokenId,
    /// Bid levels, price descending.
    pub bids: Vec<PriceLevel>,
    /// Ask levels, price ascending.
    pub asks: Vec<PriceLevel>,
}

impl Book {
    /// Creates a book with the given levels.
    ///
    /// Bids must be sorted by price descending, asks ascending.
    #[must_use]
    pub const fn with_levels(token_id: TokenId, bids: Vec<PriceLevel>, asks: Vec<PriceLevel>) -> Self {
        Self {
            token_id,
            bids,
            asks,
        }
    }

    /// Creates an empty book. Returned by the market source when a book
    /// fetch exhausts its retries; empty depth fails the liquidity check
    /// rather than the whole scan.
    #[must_use]
    pub const fn empty(token_id: TokenId) -> Self {
        Self {
            token_id,
            bids: Vec::new(),
            asks: Vec::new(),
        }
    }

    /// True when both sides are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Best bid (highest buy price).
    #[must_use]
    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.first()
    }

    /// Best ask (lowest sell price).
    #[must_use]
    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.first()
    }

    /// Walks the ask side consuming up to `target_notional` and returns
    /// the volume-weighted average price of the fill.
    ///
    /// Returns `None` when the book has no asks or cumulative depth cannot
    /// cover the target.
    #[must_use]
    pub fn vwap_buy(&self, target_notional: Decimal) -> Option<VwapFill> {
        if target_notional <= Decimal::ZERO {
            return None;
        }

        let mut remaining = target_notional;
        let mut spent = Decimal::ZERO;
        let mut shares = Decimal::ZERO;

        for level in &self.asks {
            let available = level.notional();
            if available >= remaining {
                let take = remaining / level.price;
                shares += take;
                spent += remaining;
                remaining = Decimal::ZERO;
                break;
            }
            shares += level.size;
            spent += available;
            remaining -= available;
        }

        if remaining > Decimal::ZERO || shares.is_zero() {
            return None;
        }

        Some(VwapFill {
            vwap: spent / shares,
            shares,
            spent,
        })
    }

    /// Cumulative ask notional within `band` above the best ask.
    ///
    /// This is the depth measure the liquidity floor is checked against.
    #[must_use]
    pub fn ask_depth_within(&self, band: Price) -> Decimal {
        let Some(best) = self.best_ask() else {
            return Decimal::ZERO;
        };
        let ceiling = best.price + band;
        self.asks
            .iter()
            .take_while(|level| level.price <= ceiling)
            .map(PriceLevel::notional)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn book(asks: &[(Decimal, Decimal)]) -> Book {
        Book::with_levels(
            TokenId::new("tok"),
            vec![],
            asks.iter().map(|(p, s)| PriceLevel::new(*p, *s)).collect(),
        )
    }

    #[test]
    fn empty_book_has_no_quotes() {
        let b = Book::empty(TokenId::new("tok"));
        assert!(b.is_empty());
        assert!(b.best_ask().is_none());
        assert!(b.vwap_buy(dec!(100)).is_none());
        assert_eq!(b.ask_depth_within(dec!(0.10)), dec!(0));
    }

    #[test]
    fn vwap_single_level_equals_ask() {
        let b = book(&[(dec!(0.40), dec!(10000))]);
        let fill = b.vwap_buy(dec!(500)).unwrap();
        assert_eq!(fill.vwap, dec!(0.40));
        assert_eq!(fill.shares, dec!(1250));
        assert_eq!(fill.spent, dec!(500));
    }

    #[test]
    fn vwap_walks_multiple_levels() {
        // $40 of depth at 0.40, rest filled at 0.50.
        let b = book(&[(dec!(0.40), dec!(100)), (dec!(0.50), dec!(10000))]);
        let fill = b.vwap_buy(dec!(90)).unwrap();
        // 100 shares @0.40 = $40 spent; $50 remaining buys 100 @0.50.
        assert_eq!(fill.shares, dec!(200));
        assert_eq!(fill.spent, dec!(90));
        assert_eq!(fill.vwap, dec!(0.45));
        assert!(fill.vwap > b.best_ask().unwrap().price);
    }

    #[test]
    fn vwap_none_when_depth_short() {
        let b = book(&[(dec!(0.40), dec!(10))]);
        assert!(b.vwap_buy(dec!(500)).is_none());
    }

    #[test]
    fn depth_band_excludes_far_levels() {
        let b = book(&[
            (dec!(0.40), dec!(1000)),
            (dec!(0.45), dec!(1000)),
            (dec!(0.80), dec!(1000)),
        ]);
        // Band of 0.10 over best ask 0.40 admits 0.40 and 0.45 only.
        assert_eq!(b.ask_depth_within(dec!(0.10)), dec!(400) + dec!(450));
    }
}
