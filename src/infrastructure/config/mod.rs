//! Typed application configuration.
//!
//! Loaded from a TOML file with serde defaults for every field, so a
//! missing file or an empty table still yields a runnable configuration.
//! Secrets (API keys) never live in the file; adapters read them from the
//! environment. There are no process-global singletons: the orchestrator
//! receives a [`Config`] and hands slices to components.

pub mod logging;

pub use logging::LoggingConfig;

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// Scan scope and acceptance floors.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Venue tag slugs bounding the catalog fetch.
    pub tags: BTreeSet<String>,
    /// Maximum markets to consider; 0 means unlimited.
    pub market_limit: usize,
    /// Markets below this venue-reported liquidity are dropped up front.
    pub min_liquidity_usd: Decimal,
    /// Minimum profit edge required at Layer 3 (fraction of payoff).
    pub min_profit_pct: Decimal,
    /// Minimum executable profit after slippage at Layers 3 and 6.
    pub min_exec_profit: Decimal,
    /// Minimum annualized return accepted at Layer 4.
    pub min_apy: Decimal,
    /// APY at or above this rates EXCELLENT.
    pub apy_excellent: Decimal,
    /// APY at or above this rates GOOD.
    pub apy_good: Decimal,
    /// Cosine similarity floor for clustering.
    pub similarity_threshold: f32,
    /// Per-scan LLM call budget.
    pub max_llm_calls: usize,
    /// Seconds before an unaccepted plan goes stale.
    pub plan_max_age_seconds: u64,
    /// Notional the slippage walk prices, in USD.
    pub target_notional_usd: Decimal,
    /// Minimum banded ask depth per leg, in USD.
    pub min_depth_usd: Decimal,
    /// Price band above best ask for the depth measure.
    pub depth_price_band: Decimal,
    /// Deadline grouping tolerance in seconds.
    pub time_tolerance_seconds: i64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            tags: BTreeSet::from(["crypto".to_string()]),
            market_limit: 200,
            min_liquidity_usd: dec!(10000),
            min_profit_pct: dec!(0.005),
            min_exec_profit: dec!(0.002),
            min_apy: dec!(0.15),
            apy_excellent: dec!(1.0),
            apy_good: dec!(0.5),
            similarity_threshold: 0.75,
            max_llm_calls: 30,
            plan_max_age_seconds: 60,
            target_notional_usd: dec!(500),
            min_depth_usd: dec!(10000),
            depth_price_band: dec!(0.10),
            time_tolerance_seconds: 86_400,
        }
    }
}

impl ScanConfig {
    /// Deadline grouping tolerance as a chrono duration.
    #[must_use]
    pub fn time_tolerance(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.time_tolerance_seconds)
    }

    /// Plan staleness horizon.
    #[must_use]
    pub fn plan_max_age(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.plan_max_age_seconds as i64)
    }
}

/// Worker pool sizes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    /// Concurrent catalog page requests.
    pub source: usize,
    /// Concurrent embedding batches.
    pub embed: usize,
    /// Concurrent LLM analysis calls.
    pub llm: usize,
    /// Concurrent order-book fetches.
    pub book: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            source: 4,
            embed: 4,
            llm: 3,
            book: 8,
        }
    }
}

/// Outbound rate limiting.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateConfig {
    /// Process-wide outbound requests per second.
    pub requests_per_second: u32,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 5,
        }
    }
}

/// Strategy decision thresholds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThresholdsConfig {
    /// Price inversion tolerance for monotonicity ladders.
    pub mono: Decimal,
    /// Analyzer confidence floor for implication candidates.
    pub r#impl: Decimal,
    /// Analyzer confidence floor for equivalence candidates.
    pub equiv: Decimal,
    /// Analyzer confidence floor for exhaustive-set verification.
    pub exhaustive: Decimal,
    /// Price gap an implication violation must exceed.
    pub impl_price_gap: Decimal,
    /// Price gap an equivalence violation must exceed.
    pub equiv_price_gap: Decimal,
    /// Discount below $1 an exhaustive set must trade at.
    pub exhaustive_price_gap: Decimal,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            mono: dec!(0.01),
            r#impl: dec!(0.90),
            equiv: dec!(0.90),
            exhaustive: dec!(0.85),
            impl_price_gap: dec!(0.01),
            equiv_price_gap: dec!(0.03),
            exhaustive_price_gap: dec!(0.02),
        }
    }
}

/// Strategy selection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StrategiesConfig {
    /// Names of enabled strategies.
    pub enabled: BTreeSet<String>,
}

impl Default for StrategiesConfig {
    fn default() -> Self {
        Self {
            enabled: [
                "monotonicity",
                "interval",
                "exhaustive",
                "implication",
                "equivalent",
                "temporal",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// Polymarket endpoints and HTTP behavior.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PolymarketConfig {
    /// Gamma API base URL (market discovery).
    pub gamma_url: String,
    /// CLOB API base URL (order books).
    pub clob_url: String,
    /// Catalog request timeout in milliseconds.
    pub catalog_timeout_ms: u64,
    /// Order-book request timeout in milliseconds.
    pub book_timeout_ms: u64,
    /// Retry attempts per call.
    pub retry_max_attempts: u32,
    /// Base backoff delay in milliseconds.
    pub retry_backoff_ms: u64,
    /// Page size for catalog pagination.
    pub page_size: usize,
}

impl Default for PolymarketConfig {
    fn default() -> Self {
        Self {
            gamma_url: "https://gamma-api.polymarket.com".into(),
            clob_url: "https://clob.polymarket.com".into(),
            catalog_timeout_ms: 10_000,
            book_timeout_ms: 5_000,
            retry_max_attempts: 3,
            retry_backoff_ms: 500,
            page_size: 100,
        }
    }
}

/// LLM provider configuration. The API key comes from `LLM_API_KEY`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider: "openai" (any OpenAI-compatible endpoint) or "anthropic".
    pub provider: String,
    /// Model identifier.
    pub model: String,
    /// Override base URL for OpenAI-compatible aggregators.
    pub api_base: Option<String>,
    /// Max tokens per completion.
    pub max_tokens: usize,
    /// Sampling temperature.
    pub temperature: f64,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".into(),
            model: "gpt-4o-mini".into(),
            api_base: None,
            max_tokens: 2000,
            temperature: 0.2,
            timeout_ms: 60_000,
        }
    }
}

/// Embedding provider configuration. Key comes from `EMBEDDING_API_KEY`
/// (falls back to `LLM_API_KEY` for aggregators serving both).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Model identifier.
    pub model: String,
    /// Base URL of an OpenAI-compatible embeddings endpoint.
    pub api_base: String,
    /// Texts per embedding request.
    pub batch_size: usize,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".into(),
            api_base: "https://api.openai.com/v1".into(),
            batch_size: 16,
            timeout_ms: 30_000,
        }
    }
}

/// Snapshot cache settings. Order books are never cached.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether the snapshot cache is consulted at all.
    pub enabled: bool,
    /// Directory for snapshot files.
    pub dir: String,
    /// Snapshot freshness horizon in seconds.
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: ".dutchbook-cache".into(),
            ttl_seconds: 300,
        }
    }
}

impl CacheConfig {
    /// Snapshot TTL as a std duration.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scan scope and floors.
    pub scan: ScanConfig,
    /// Worker pool sizes.
    pub concurrency: ConcurrencyConfig,
    /// Outbound rate limit.
    pub rate: RateConfig,
    /// Strategy thresholds.
    pub thresholds: ThresholdsConfig,
    /// Strategy selection.
    pub strategies: StrategiesConfig,
    /// Venue endpoints.
    pub polymarket: PolymarketConfig,
    /// LLM provider.
    pub llm: LlmConfig,
    /// Embedding provider.
    pub embedding: EmbeddingConfig,
    /// Snapshot cache.
    pub cache: CacheConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// A missing file yields the defaults; a present-but-invalid file is
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file exists but cannot be read or
    /// parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::parse_toml(&raw)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on malformed TOML or invalid values.
    pub fn parse_toml(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).map_err(ConfigError::Toml)?;
        config.validate()?;
        Ok(config)
    }

    /// Initialize logging from the embedded logging section.
    pub fn init_logging(&self) {
        self.logging.init();
    }

    fn validate(&self) -> Result<()> {
        if self.rate.requests_per_second == 0 {
            return Err(ConfigError::Invalid("rate.requests_per_second must be > 0".into()).into());
        }
        if !(0.0..=1.0).contains(&self.scan.similarity_threshold) {
            return Err(
                ConfigError::Invalid("scan.similarity_threshold must be in [0, 1]".into()).into(),
            );
        }
        for pool in [
            ("concurrency.source", self.concurrency.source),
            ("concurrency.embed", self.concurrency.embed),
            ("concurrency.llm", self.concurrency.llm),
            ("concurrency.book", self.concurrency.book),
        ] {
            if pool.1 == 0 {
                return Err(ConfigError::Invalid(format!("{} must be > 0", pool.0)).into());
            }
        }
        Ok(())
    }
}
