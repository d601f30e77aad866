//! Gamma and CLOB wire types.
//!
//! The Gamma API has two idiosyncrasies the decoder must tolerate:
//! numerics may arrive as strings (`"volume": "12345.6"`) and arrays may
//! arrive embedded in JSON strings (`"outcomePrices": "[\"0.3\",\"0.7\"]"`).
//! Invalid embedded JSON decodes to an empty list rather than failing the
//! page; the record is then skipped as a format warning upstream.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::book::{Book, PriceLevel};
use crate::domain::id::{EventId, MarketId, TokenId};
use crate::domain::market::{Market, TagInfo};
use crate::error::{Error, Result};

/// A numeric field that may arrive as a JSON number or a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FlexDecimal {
    /// Proper JSON number.
    Num(f64),
    /// String-encoded number.
    Text(String),
}

impl FlexDecimal {
    /// Decodes to a Decimal, `None` when unparseable.
    #[must_use]
    pub fn decode(&self) -> Option<Decimal> {
        match self {
            Self::Num(n) => Decimal::try_from(*n).ok(),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

fn decode_or_zero(field: Option<&FlexDecimal>) -> Decimal {
    field.and_then(FlexDecimal::decode).unwrap_or_default()
}

/// Decodes a JSON-array-in-a-string field; empty on invalid JSON.
#[must_use]
pub fn embedded_array(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    serde_json::from_str::<Vec<serde_json::Value>>(raw)
        .map(|values| {
            values
                .into_iter()
                .map(|v| match v {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Gamma market record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GammaMarket {
    pub id: String,
    pub condition_id: String,
    pub question: Option<String>,
    pub description: Option<String>,
    /// JSON array in a string: `["Yes","No"]`.
    pub outcomes: Option<String>,
    /// JSON array in a string: `["0.31","0.69"]`.
    pub outcome_prices: Option<String>,
    /// JSON array in a string: the two CLOB token ids.
    pub clob_token_ids: Option<String>,
    pub volume: Option<FlexDecimal>,
    pub liquidity: Option<FlexDecimal>,
    pub best_bid: Option<FlexDecimal>,
    pub best_ask: Option<FlexDecimal>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub event_slug: Option<String>,
    pub group_item_title: Option<String>,
    pub resolution_source: Option<String>,
    pub active: bool,
    pub closed: bool,
    pub neg_risk: bool,
}

/// Gamma event record with its member markets.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GammaEvent {
    pub id: String,
    pub slug: Option<String>,
    pub title: Option<String>,
    /// Event-level rules text, authoritative for resolution.
    pub description: Option<String>,
    pub neg_risk: bool,
    pub markets: Vec<GammaMarket>,
    pub tags: Vec<GammaTag>,
}

/// Gamma tag record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GammaTag {
    pub id: String,
    pub label: Option<String>,
    pub slug: Option<String>,
}

impl From<GammaTag> for TagInfo {
    fn from(t: GammaTag) -> Self {
        Self {
            id: t.id,
            label: t.label.unwrap_or_default(),
            slug: t.slug.unwrap_or_default(),
        }
    }
}

impl GammaEvent {
    /// Converts the event's member markets into domain markets, skipping
    /// non-binary or undecodable records.
    ///
    /// Returns `(markets, skipped)` where each skip carries a
    /// [`Error::SourceFormat`] describing the offending record.
    #[must_use]
    pub fn into_markets(self) -> (Vec<Market>, Vec<Error>) {
        let event_id = EventId::new(self.slug.clone().unwrap_or(self.id.clone()));
        let event_title = self.title.clone().unwrap_or_default();
        let event_description = self.description.clone().unwrap_or_default();
        let tags: BTreeSet<String> = self
            .tags
            .iter()
            .filter_map(|t| t.slug.clone())
            .collect();
        let event_neg_risk = self.neg_risk;

        let mut markets = Vec::new();
        let mut skipped = Vec::new();
        for raw in self.markets {
            match raw.into_market(
                &event_id,
                &event_title,
                &event_description,
                &tags,
                event_neg_risk,
            ) {
                Ok(market) => markets.push(market),
                Err(err) => skipped.push(err),
            }
        }
        (markets, skipped)
    }
}

impl GammaMarket {
    /// Converts one Gamma record into a domain market.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SourceFormat`] when the record is not a decodable
    /// binary market (missing token pair or prices).
    pub fn into_market(
        self,
        event_id: &EventId,
        event_title: &str,
        event_description: &str,
        tags: &BTreeSet<String>,
        event_neg_risk: bool,
    ) -> Result<Market> {
        let label = self.question.clone().unwrap_or_else(|| self.id.clone());

        let token_ids = embedded_array(self.clob_token_ids.as_deref());
        if token_ids.len() != 2 {
            return Err(Error::SourceFormat(format!(
                "market '{label}': expected 2 clobTokenIds, got {}",
                token_ids.len()
            )));
        }

        let prices: Vec<Decimal> = embedded_array(self.outcome_prices.as_deref())
            .iter()
            .filter_map(|p| p.parse().ok())
            .collect();
        if prices.len() != 2 {
            return Err(Error::SourceFormat(format!(
                "market '{label}': expected 2 outcomePrices"
            )));
        }
        let (yes_mid, no_mid) = (prices[0], prices[1]);
        if yes_mid < Decimal::ZERO || no_mid < Decimal::ZERO {
            return Err(Error::SourceFormat(format!(
                "market '{label}': negative price"
            )));
        }

        let best_bid_yes = self.best_bid.as_ref().and_then(FlexDecimal::decode);
        let best_ask_yes = self.best_ask.as_ref().and_then(FlexDecimal::decode);

        Ok(Market {
            id: MarketId::new(self.id),
            condition_id: self.condition_id,
            token_yes: TokenId::new(token_ids[0].clone()),
            token_no: TokenId::new(token_ids[1].clone()),
            question: self.question.unwrap_or_default(),
            market_description: self.description.unwrap_or_default(),
            event_description: event_description.to_string(),
            event_id: event_id.clone(),
            event_title: event_title.to_string(),
            tags: tags.clone(),
            yes_mid,
            no_mid,
            best_bid_yes,
            best_ask_yes,
            // The catalog carries YES quotes only; NO quotes come from
            // the book in Layer 3.
            best_bid_no: best_ask_yes.map(|ask| Decimal::ONE - ask),
            best_ask_no: best_bid_yes.map(|bid| Decimal::ONE - bid),
            liquidity_usd: decode_or_zero(self.liquidity.as_ref()),
            volume_usd: decode_or_zero(self.volume.as_ref()),
            end_time: self.end_date,
            created_at: self.created_at,
            resolution_source: self.resolution_source.unwrap_or_default(),
            neg_risk: self.neg_risk || event_neg_risk,
        })
    }
}

/// CLOB order book payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClobBook {
    pub bids: Vec<ClobLevel>,
    pub asks: Vec<ClobLevel>,
}

/// One CLOB book level; price and size arrive as strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClobLevel {
    pub price: String,
    pub size: String,
}

impl ClobBook {
    /// Converts to a domain book, sorting bids descending and asks
    /// ascending regardless of wire order. Unparseable levels are dropped.
    #[must_use]
    pub fn into_book(self, token_id: TokenId) -> Book {
        let parse = |levels: Vec<ClobLevel>| -> Vec<PriceLevel> {
            levels
                .into_iter()
                .filter_map(|l| {
                    let price: Decimal = l.price.trim().parse().ok()?;
                    let size: Decimal = l.size.trim().parse().ok()?;
                    (size > Decimal::ZERO).then_some(PriceLevel::new(price, size))
                })
                .collect()
        };

        let mut bids = parse(self.bids);
        let mut asks = parse(self.asks);
        bids.sort_by(|a, b| b.price.cmp(&a.price));
        asks.sort_by(|a, b| a.price.cmp(&b.price));

        Book::with_levels(token_id, bids, asks)
    }
}
