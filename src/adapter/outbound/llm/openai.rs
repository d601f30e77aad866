//! OpenAI-compatible chat completion client.
//!
//! The Chat Completions wire format is the lingua franca of LLM
//! aggregators (DeepSeek, SiliconFlow, Together, local runtimes), so this
//! client takes a configurable base URL and covers all of them.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::port::outbound::Llm;

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Chat-completions client for OpenAI and compatible providers.
#[derive(Debug)]
pub struct OpenAiCompatible {
    http: HttpClient,
    api_key: String,
    api_base: String,
    model: String,
    max_tokens: usize,
    temperature: f64,
}

impl OpenAiCompatible {
    /// Creates a client. `api_base = None` targets api.openai.com.
    #[must_use]
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        api_base: Option<String>,
        max_tokens: usize,
        temperature: f64,
        timeout_ms: u64,
    ) -> Self {
        let http = HttpClient::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .unwrap_or_default();
        Self {
            http,
            api_key: api_key.into(),
            api_base: api_base
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: model.into(),
            max_tokens,
            temperature,
        }
    }
}

#[derive(Serialize)]
struct Request {
    model: String,
    max_tokens: usize,
    temperature: f64,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct Response {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[async_trait]
impl Llm for OpenAiCompatible {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = Request {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            messages: vec![Message {
                role: "user",
                content: prompt.to_string(),
            }],
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.api_base))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| Error::Connection(e.to_string()))?
            .json::<Response>()
            .await?;

        Ok(response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default())
    }
}
