//! Market data port.

use std::collections::BTreeSet;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::book::Book;
use crate::domain::id::TokenId;
use crate::domain::market::{Market, TagInfo};
use crate::error::Result;

/// Source of venue market data.
///
/// Implementations own pagination, throttling, and retry; the application
/// layer sees a lazy market stream and on-demand order books.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the orchestrator shares one
/// source across validation workers.
#[async_trait]
pub trait MarketSource: Send + Sync {
    /// Venue name for logging.
    fn name(&self) -> &'static str;

    /// Streams the market catalog bounded to a tag set.
    ///
    /// Markets arrive as pages are decoded; the channel is bounded, so a
    /// slow consumer applies backpressure to pagination. Per-record decode
    /// failures arrive as `Err(Error::SourceFormat)` items and the stream
    /// continues; a dead venue ends the stream with
    /// `Err(Error::SourceUnavailable)`.
    ///
    /// `limit = None` means unlimited: pagination stops at the venue's
    /// last page.
    ///
    /// # Errors
    ///
    /// Returns an error only when the stream cannot be started at all.
    async fn list_markets(
        &self,
        tags: &BTreeSet<String>,
        active: bool,
        limit: Option<usize>,
    ) -> Result<mpsc::Receiver<Result<Market>>>;

    /// Fetches the current order book for a token.
    ///
    /// Retries transient failures; returns `Book::empty` after exhaustion
    /// (an empty book fails the liquidity floor, not the scan). Books must
    /// never be served from a cache: a stale book is a correctness bug.
    ///
    /// # Errors
    ///
    /// Returns an error only for non-transient decode failures.
    async fn fetch_order_book(&self, token_id: &TokenId) -> Result<Book>;

    /// Fetches the venue's tag catalog.
    ///
    /// # Errors
    ///
    /// Returns an error when the venue is unreachable.
    async fn fetch_tags(&self) -> Result<Vec<TagInfo>>;
}
