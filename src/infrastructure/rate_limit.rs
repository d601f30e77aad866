//! Process-wide token-bucket rate limiter.
//!
//! One bucket throttles every outbound call (catalog pages, order books,
//! embeddings, LLM requests). A background ticker refills the bucket;
//! callers suspend on [`TokenBucket::acquire`] until a token is free.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::trace;

/// Refill granularity. Ten ticks per second keeps the one-second sliding
/// window honest without busy-waking waiters.
const TICK: Duration = Duration::from_millis(100);

/// Token bucket limiting outbound requests per second.
pub struct TokenBucket {
    /// Available tokens; fractional because refills are sub-second.
    tokens: Mutex<f64>,
    /// Bucket capacity (= sustained requests per second).
    capacity: f64,
    /// Wakes waiters after each refill.
    notify: Notify,
    /// Ticker task, aborted on drop.
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl TokenBucket {
    /// Creates a bucket allowing `requests_per_second` sustained calls and
    /// starts its refill ticker on the current runtime.
    #[must_use]
    pub fn start(requests_per_second: u32) -> Arc<Self> {
        let capacity = f64::from(requests_per_second.max(1));
        let bucket = Arc::new(Self {
            tokens: Mutex::new(capacity),
            capacity,
            notify: Notify::new(),
            ticker: Mutex::new(None),
        });

        let refill = Arc::downgrade(&bucket);
        let per_tick = capacity * TICK.as_secs_f64();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let Some(bucket) = refill.upgrade() else {
                    break;
                };
                {
                    let mut tokens = bucket.tokens.lock();
                    *tokens = (*tokens + per_tick).min(bucket.capacity);
                }
                bucket.notify.notify_waiters();
            }
        });
        *bucket.ticker.lock() = Some(handle);

        bucket
    }

    /// Takes one token, suspending until the ticker refills the bucket.
    pub async fn acquire(&self) {
        loop {
            let wait = self.notify.notified();
            {
                let mut tokens = self.tokens.lock();
                if *tokens >= 1.0 {
                    *tokens -= 1.0;
                    return;
                }
            }
            trace!("rate limiter saturated, waiting for refill");
            wait.await;
        }
    }

    /// Takes one token without waiting. Returns false when empty.
    #[must_use]
    pub fn try_acquire(&self) -> bool {
        let mut tokens = self.tokens.lock();
        if *tokens >= 1.0 {
            *tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

impl Drop for TokenBucket {
    fn drop(&mut self) {
        if let Some(handle) = self.ticker.lock().take() {
            handle.abort();
        }
    }
}
