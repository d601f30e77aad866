//! OpenAI-compatible embeddings client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::infrastructure::config::EmbeddingConfig;
use crate::port::outbound::Embedder;

/// Environment variable holding the embedding API key, with a fallback to
/// the LLM key for aggregators serving both surfaces.
pub const API_KEY_ENV: &str = "EMBEDDING_API_KEY";

/// Batch embeddings client for any OpenAI-compatible `/embeddings`
/// endpoint.
#[derive(Debug)]
pub struct EmbeddingClient {
    http: HttpClient,
    api_key: String,
    api_base: String,
    model: String,
}

impl EmbeddingClient {
    /// Creates a client.
    #[must_use]
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        api_base: impl Into<String>,
        timeout_ms: u64,
    ) -> Self {
        let http = HttpClient::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .unwrap_or_default();
        Self {
            http,
            api_key: api_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    /// Builds the configured client, keyed from `EMBEDDING_API_KEY`
    /// (falling back to `LLM_API_KEY`).
    ///
    /// Returns `None` when no key is present: clustering is then skipped
    /// and cluster-dependent strategies do not run.
    #[must_use]
    pub fn from_config(config: &EmbeddingConfig) -> Option<Arc<dyn Embedder>> {
        let api_key = std::env::var(API_KEY_ENV)
            .or_else(|_| std::env::var(super::llm::API_KEY_ENV))
            .ok()?;
        Some(Arc::new(Self::new(
            api_key,
            config.model.clone(),
            config.api_base.clone(),
            config.timeout_ms,
        )))
    }
}

#[derive(Serialize)]
struct Request<'a> {
    model: &'a str,
    input: &'a [String],
    encoding_format: &'static str,
}

#[derive(Deserialize)]
struct Response {
    data: Vec<Embedding>,
}

#[derive(Deserialize)]
struct Embedding {
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for EmbeddingClient {
    fn name(&self) -> &'static str {
        "openai-embeddings"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = Request {
            model: &self.model,
            input: texts,
            encoding_format: "float",
        };

        let response = self
            .http
            .post(format!("{}/embeddings", self.api_base))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| Error::Connection(e.to_string()))?
            .json::<Response>()
            .await?;

        if response.data.len() != texts.len() {
            return Err(Error::Parse(format!(
                "embedding count mismatch: sent {}, got {}",
                texts.len(),
                response.data.len()
            )));
        }

        Ok(response.data.into_iter().map(|e| e.embedding).collect())
    }
}
