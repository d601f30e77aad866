//! Shared builders and fakes for integration tests.

#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::mpsc;

use dutchbook::domain::book::{Book, PriceLevel};
use dutchbook::domain::id::{EventId, MarketId, TokenId};
use dutchbook::domain::market::{Market, TagInfo};
use dutchbook::error::Result;
use dutchbook::port::outbound::MarketSource;

/// Fluent market builder for test fixtures.
pub struct MarketBuilder {
    market: Market,
}

impl MarketBuilder {
    pub fn new(id: &str, question: &str) -> Self {
        let yes_mid = dec!(0.50);
        Self {
            market: Market {
                id: MarketId::new(id),
                condition_id: format!("cond-{id}"),
                token_yes: TokenId::new(format!("{id}-y")),
                token_no: TokenId::new(format!("{id}-n")),
                question: question.into(),
                market_description: String::new(),
                event_description: "Resolves per Coinbase.".into(),
                event_id: EventId::new(format!("event-{id}")),
                event_title: String::new(),
                tags: BTreeSet::new(),
                yes_mid,
                no_mid: Decimal::ONE - yes_mid,
                best_bid_yes: None,
                best_ask_yes: None,
                best_bid_no: None,
                best_ask_no: None,
                liquidity_usd: dec!(50000),
                volume_usd: dec!(100000),
                end_time: Some(Utc::now() + Duration::days(30)),
                created_at: None,
                resolution_source: "Coinbase".into(),
                neg_risk: false,
            },
        }
    }

    pub fn yes_mid(mut self, mid: Decimal) -> Self {
        self.market.yes_mid = mid;
        self.market.no_mid = Decimal::ONE - mid;
        self
    }

    pub fn event(mut self, event_id: &str) -> Self {
        self.market.event_id = EventId::new(event_id);
        self
    }

    pub fn rules(mut self, rules: &str) -> Self {
        self.market.event_description = rules.into();
        self
    }

    pub fn resolution_source(mut self, source: &str) -> Self {
        self.market.resolution_source = source.into();
        self
    }

    pub fn liquidity(mut self, liquidity: Decimal) -> Self {
        self.market.liquidity_usd = liquidity;
        self
    }

    pub fn days_out(mut self, days: i64) -> Self {
        self.market.end_time = Some(Utc::now() + Duration::days(days));
        self
    }

    pub fn end_time(mut self, end: DateTime<Utc>) -> Self {
        self.market.end_time = Some(end);
        self
    }

    pub fn neg_risk(mut self) -> Self {
        self.market.neg_risk = true;
        self
    }

    pub fn build(self) -> Market {
        self.market
    }
}

/// In-memory venue: serves a market list and scripted order books.
///
/// By default every token gets a deep book asking half a cent over its
/// catalog mid; individual books can be overridden or removed.
pub struct FakeVenue {
    markets: Vec<Market>,
    books: Mutex<HashMap<TokenId, Book>>,
    book_fetches: Mutex<usize>,
}

impl FakeVenue {
    pub fn new(markets: Vec<Market>) -> Self {
        let mut books = HashMap::new();
        for market in &markets {
            books.insert(
                market.token_yes.clone(),
                deep_book(&market.token_yes, market.yes_mid + dec!(0.005)),
            );
            books.insert(
                market.token_no.clone(),
                deep_book(&market.token_no, market.no_mid + dec!(0.005)),
            );
        }
        Self {
            markets,
            books: Mutex::new(books),
            book_fetches: Mutex::new(0),
        }
    }

    /// Overrides one token's book.
    pub fn set_book(&self, token: &str, book: Book) {
        self.books.lock().insert(TokenId::new(token), book);
    }

    /// Overrides one token's best ask, keeping the book deep.
    pub fn set_ask(&self, token: &str, ask: Decimal) {
        let token_id = TokenId::new(token);
        self.books
            .lock()
            .insert(token_id.clone(), deep_book(&token_id, ask));
    }

    pub fn book_fetches(&self) -> usize {
        *self.book_fetches.lock()
    }
}

pub fn deep_book(token: &TokenId, ask: Decimal) -> Book {
    Book::with_levels(
        token.clone(),
        vec![PriceLevel::new(ask - dec!(0.02), dec!(100000))],
        vec![PriceLevel::new(ask, dec!(100000))],
    )
}

#[async_trait]
impl MarketSource for FakeVenue {
    fn name(&self) -> &'static str {
        "fake-venue"
    }

    async fn list_markets(
        &self,
        _tags: &BTreeSet<String>,
        _active: bool,
        limit: Option<usize>,
    ) -> Result<mpsc::Receiver<Result<Market>>> {
        let (tx, rx) = mpsc::channel(16);
        let markets = self.markets.clone();
        tokio::spawn(async move {
            for market in markets.into_iter().take(limit.unwrap_or(usize::MAX)) {
                if tx.send(Ok(market)).await.is_err() {
                    break;
                }
            }
        });
        Ok(rx)
    }

    async fn fetch_order_book(&self, token_id: &TokenId) -> Result<Book> {
        *self.book_fetches.lock() += 1;
        Ok(self
            .books
            .lock()
            .get(token_id)
            .cloned()
            .unwrap_or_else(|| Book::empty(token_id.clone())))
    }

    async fn fetch_tags(&self) -> Result<Vec<TagInfo>> {
        Ok(vec![TagInfo {
            id: "21".into(),
            label: "Crypto".into(),
            slug: "crypto".into(),
        }])
    }
}

/// Canned analyzer JSON payloads.
pub fn relation_json(relation: &str, confidence: f64) -> String {
    format!(
        r#"{{"relationship": "{relation}", "confidence": {confidence},
            "reasoning": "analysis grounded in the resolution rules",
            "edge_cases": [], "resolution_compatible": true}}"#
    )
}

pub fn exhaustive_json(is_complete: bool, confidence: f64) -> String {
    format!(
        r#"{{"is_complete": {is_complete}, "confidence": {confidence}, "missing_cases": []}}"#
    )
}
