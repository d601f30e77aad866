//! LLM completion port.

use async_trait::async_trait;

use crate::error::Result;

/// Client for large language model text completion.
///
/// Implementations wrap a specific provider and handle authentication and
/// transport; prompt construction and response recovery live in the
/// analyzer.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the analyzer issues concurrent
/// requests from its worker pool.
#[async_trait]
pub trait Llm: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &'static str;

    /// Sends a completion request and returns the generated text.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the response is
    /// malformed at the transport level.
    async fn complete(&self, prompt: &str) -> Result<String>;
}
