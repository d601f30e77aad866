//! Polymarket REST client.
//!
//! Market discovery pages the Gamma `/events` endpoint (the event record
//! carries the authoritative rules text its markets resolve under); order
//! books come from the CLOB `/book` endpoint on demand. Every outbound
//! call passes the process-wide token bucket and retries transient
//! failures under jittered backoff.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::cache::SnapshotCache;
use super::dto::{ClobBook, GammaEvent, GammaTag};
use crate::domain::book::Book;
use crate::domain::id::TokenId;
use crate::domain::market::{Market, TagInfo};
use crate::error::{Error, Result};
use crate::infrastructure::config::PolymarketConfig;
use crate::infrastructure::rate_limit::TokenBucket;
use crate::infrastructure::retry::{retry, RetryPolicy};
use crate::port::outbound::MarketSource;

/// Capacity of the lazy market channel; a slow consumer backpressures
/// pagination through it.
const MARKET_CHANNEL_CAPACITY: usize = 256;

/// HTTP client for the Polymarket Gamma and CLOB APIs.
pub struct PolymarketClient {
    catalog_http: HttpClient,
    book_http: HttpClient,
    gamma_url: String,
    clob_url: String,
    limiter: Arc<TokenBucket>,
    retry: RetryPolicy,
    page_size: usize,
    page_concurrency: usize,
    cache: Option<SnapshotCache>,
}

impl PolymarketClient {
    /// Creates a client from configuration.
    ///
    /// `page_concurrency` bounds in-flight catalog page requests.
    #[must_use]
    pub fn from_config(
        config: &PolymarketConfig,
        limiter: Arc<TokenBucket>,
        page_concurrency: usize,
    ) -> Self {
        let build = |timeout_ms: u64| {
            HttpClient::builder()
                .timeout(Duration::from_millis(timeout_ms))
                .build()
                .unwrap_or_else(|err| {
                    warn!(error = %err, "Failed to build HTTP client, using defaults");
                    HttpClient::new()
                })
        };

        Self {
            catalog_http: build(config.catalog_timeout_ms),
            book_http: build(config.book_timeout_ms),
            gamma_url: config.gamma_url.clone(),
            clob_url: config.clob_url.clone(),
            limiter,
            retry: RetryPolicy::new(
                config.retry_max_attempts,
                Duration::from_millis(config.retry_backoff_ms),
            ),
            page_size: config.page_size.max(1),
            page_concurrency: page_concurrency.max(1),
            cache: None,
        }
    }

    /// Attaches a snapshot cache for catalog fetches.
    #[must_use]
    pub fn with_cache(mut self, cache: SnapshotCache) -> Self {
        self.cache = Some(cache);
        self
    }

    async fn get_json<T>(&self, http: &HttpClient, url: &str, what: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        retry(self.retry, what, || async move {
            self.limiter.acquire().await;
            let response = http.get(url).send().await?.error_for_status()?;
            Ok(response.json::<T>().await?)
        })
        .await
    }

    async fn fetch_event_page(&self, tag: &str, offset: usize) -> Result<Vec<GammaEvent>> {
        let url = format!(
            "{}/events?tag_slug={tag}&active=true&closed=false&limit={}&offset={offset}",
            self.gamma_url, self.page_size,
        );
        debug!(url = %url, "Fetching event page");
        self.get_json(&self.catalog_http, &url, "event page").await
    }

    /// Pages one tag, forwarding markets into the channel. Returns the
    /// number of markets emitted, or `None` when the consumer went away.
    async fn stream_tag(
        &self,
        tag: &str,
        limit: Option<usize>,
        emitted_so_far: usize,
        tx: &mpsc::Sender<Result<Market>>,
        collected: &mut Vec<Market>,
    ) -> Result<Option<usize>> {
        let mut emitted = 0usize;
        let mut offset = 0usize;

        loop {
            // One window of page futures, bounded by the pool size. Pages
            // are processed in offset order so the venue's event grouping
            // survives the fan-out.
            let offsets: Vec<usize> = (0..self.page_concurrency)
                .map(|i| offset + i * self.page_size)
                .collect();
            let window =
                futures::future::join_all(offsets.iter().map(|o| self.fetch_event_page(tag, *o)))
                    .await;

            let mut last_page_len = self.page_size;
            for page in window {
                let events = page?;
                last_page_len = events.len();
                for event in events {
                    let (markets, skipped) = event.into_markets();
                    for err in skipped {
                        if tx.send(Err(err)).await.is_err() {
                            return Ok(None);
                        }
                    }
                    for market in markets {
                        if let Some(cap) = limit {
                            if emitted_so_far + emitted >= cap {
                                return Ok(Some(emitted));
                            }
                        }
                        collected.push(market.clone());
                        if tx.send(Ok(market)).await.is_err() {
                            return Ok(None);
                        }
                        emitted += 1;
                    }
                }
                if last_page_len < self.page_size {
                    // Short page: the venue ran out of events for this tag.
                    return Ok(Some(emitted));
                }
            }
            offset += self.page_concurrency * self.page_size;
        }
    }
}

#[async_trait]
impl MarketSource for PolymarketClient {
    fn name(&self) -> &'static str {
        "polymarket"
    }

    async fn list_markets(
        &self,
        tags: &BTreeSet<String>,
        _active: bool,
        limit: Option<usize>,
    ) -> Result<mpsc::Receiver<Result<Market>>> {
        let (tx, rx) = mpsc::channel(MARKET_CHANNEL_CAPACITY);

        if let Some(cache) = &self.cache {
            if let Some(markets) = cache.load(tags) {
                info!(count = markets.len(), "Serving market snapshot from cache");
                tokio::spawn(async move {
                    for market in markets {
                        if tx.send(Ok(market)).await.is_err() {
                            break;
                        }
                    }
                });
                return Ok(rx);
            }
        }

        let tags = tags.clone();
        // The client is shared behind Arc by the orchestrator; cloning the
        // cheap handles here keeps the spawned task self-contained.
        let this = Arc::new(Self {
            catalog_http: self.catalog_http.clone(),
            book_http: self.book_http.clone(),
            gamma_url: self.gamma_url.clone(),
            clob_url: self.clob_url.clone(),
            limiter: Arc::clone(&self.limiter),
            retry: self.retry,
            page_size: self.page_size,
            page_concurrency: self.page_concurrency,
            cache: self.cache.clone(),
        });

        tokio::spawn(async move {
            let mut collected = Vec::new();
            let mut emitted = 0usize;
            for tag in &tags {
                match this
                    .stream_tag(tag, limit, emitted, &tx, &mut collected)
                    .await
                {
                    Ok(Some(count)) => emitted += count,
                    Ok(None) => return, // consumer dropped
                    Err(err) => {
                        let fatal = Error::SourceUnavailable {
                            attempts: this.retry.max_attempts,
                            reason: err.to_string(),
                        };
                        let _ = tx.send(Err(fatal)).await;
                        return;
                    }
                }
                if limit.is_some_and(|cap| emitted >= cap) {
                    break;
                }
            }
            info!(count = emitted, tags = tags.len(), "Market catalog streamed");
            if let Some(cache) = &this.cache {
                cache.store(&tags, &collected);
            }
        });

        Ok(rx)
    }

    async fn fetch_order_book(&self, token_id: &TokenId) -> Result<Book> {
        let url = format!("{}/book?token_id={}", self.clob_url, token_id.as_str());
        match self
            .get_json::<ClobBook>(&self.book_http, &url, "order book")
            .await
        {
            Ok(raw) => Ok(raw.into_book(token_id.clone())),
            Err(err) => {
                // A missing book is a liquidity problem, not a scan
                // failure; the empty book fails the depth floor instead.
                warn!(token = %token_id, error = %err, "Order book unavailable, returning empty");
                Ok(Book::empty(token_id.clone()))
            }
        }
    }

    async fn fetch_tags(&self) -> Result<Vec<TagInfo>> {
        let url = format!("{}/tags?limit=200", self.gamma_url);
        let tags: Vec<GammaTag> = self.get_json(&self.catalog_http, &url, "tags").await?;
        Ok(tags.into_iter().map(TagInfo::from).collect())
    }
}
