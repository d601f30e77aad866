//! Market and event types.
//!
//! A [`Market`] is one binary question with a YES/NO token pair. Markets
//! are materialized once per scan by the market source and shared
//! read-only by every later stage; derived tables hold only market ids.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{EventId, MarketId, TokenId};
use super::money::Price;

/// Which outcome token of a binary market a leg buys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// The YES outcome token.
    Yes,
    /// The NO outcome token.
    No,
}

impl Side {
    /// The opposite side.
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Yes => Self::No,
            Self::No => Self::Yes,
        }
    }
}

/// A binary prediction market.
///
/// Prices come in two tiers: catalog mids (`yes_mid`/`no_mid`, always
/// present) and order-book quotes (`best_bid_yes`/`best_ask_yes` and the
/// NO equivalents, present once a book has been fetched). Executable
/// computations must go through [`Market::effective_buy_price`], never the
/// mids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    /// Venue market id.
    pub id: MarketId,
    /// On-chain condition id.
    pub condition_id: String,
    /// YES outcome token id.
    pub token_yes: TokenId,
    /// NO outcome token id.
    pub token_no: TokenId,
    /// The market question.
    pub question: String,
    /// Market-level description text.
    pub market_description: String,
    /// Event-level rules text (resolution criteria).
    pub event_description: String,
    /// Event this market belongs to.
    pub event_id: EventId,
    /// Display title of the event.
    pub event_title: String,
    /// Venue tags on the event.
    pub tags: BTreeSet<String>,
    /// Catalog mid for YES.
    pub yes_mid: Price,
    /// Catalog mid for NO.
    pub no_mid: Price,
    /// Best bid for YES, when an order book has been seen.
    pub best_bid_yes: Option<Price>,
    /// Best ask for YES, when an order book has been seen.
    pub best_ask_yes: Option<Price>,
    /// Best bid for NO.
    pub best_bid_no: Option<Price>,
    /// Best ask for NO.
    pub best_ask_no: Option<Price>,
    /// Venue-reported liquidity in USD.
    pub liquidity_usd: Decimal,
    /// Venue-reported lifetime volume in USD.
    pub volume_usd: Decimal,
    /// Resolution deadline.
    pub end_time: Option<DateTime<Utc>>,
    /// When the market was created on the venue.
    pub created_at: Option<DateTime<Utc>>,
    /// Resolution source extracted from the rules text.
    pub resolution_source: String,
    /// Venue flag: event outcomes are mutually exclusive (winner-take-all).
    pub neg_risk: bool,
}

impl Market {
    /// Catalog mid price for a side.
    #[must_use]
    pub fn mid(&self, side: Side) -> Price {
        match side {
            Side::Yes => self.yes_mid,
            Side::No => self.no_mid,
        }
    }

    /// The price actually paid when buying one unit at market: the best
    /// ask when an order book is present, the catalog mid otherwise.
    #[must_use]
    pub fn effective_buy_price(&self, side: Side) -> Price {
        match side {
            Side::Yes => self.best_ask_yes.unwrap_or(self.yes_mid),
            Side::No => self.best_ask_no.unwrap_or(self.no_mid),
        }
    }

    /// YES bid/ask spread, when both quotes are present.
    #[must_use]
    pub fn spread_yes(&self) -> Option<Price> {
        match (self.best_bid_yes, self.best_ask_yes) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Token id for a side.
    #[must_use]
    pub fn token(&self, side: Side) -> &TokenId {
        match side {
            Side::Yes => &self.token_yes,
            Side::No => &self.token_no,
        }
    }

    /// Combined question + rules text used for semantic embedding.
    #[must_use]
    pub fn embedding_text(&self) -> String {
        let rules: String = self.event_description.chars().take(500).collect();
        format!("{}\n\nRules: {}", self.question, rules)
    }
}

/// An event: a group of markets sharing resolution rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Event id, referenced by member markets.
    pub id: EventId,
    /// Display title.
    pub title: String,
    /// Shared rules text.
    pub description: String,
    /// Member market ids.
    pub markets: Vec<MarketId>,
}

/// A venue tag usable as a scan scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagInfo {
    /// Venue tag id.
    pub id: String,
    /// Human-readable label.
    pub label: String,
    /// URL slug, the form used in configuration.
    pub slug: String,
}
