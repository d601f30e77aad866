//! Text embedding port.

use async_trait::async_trait;

use crate::error::Result;

/// Client for dense text embeddings.
///
/// Batch in, vectors out. The dimension is fixed by the provider and not
/// prescribed here; the clusterer compares vectors by cosine similarity
/// and is dimension-agnostic.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &'static str;

    /// Embeds a batch of texts, preserving order.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns a vector
    /// count that does not match the input.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}
