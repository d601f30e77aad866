//! LLM provider adapters.

pub mod anthropic;
#[cfg(any(test, feature = "testkit"))]
pub mod mock;
pub mod openai;

pub use anthropic::Anthropic;
pub use openai::OpenAiCompatible;

use std::sync::Arc;

use crate::error::{ConfigError, Result};
use crate::infrastructure::config::LlmConfig;
use crate::port::outbound::Llm;

/// Environment variable holding the LLM API key.
pub const API_KEY_ENV: &str = "LLM_API_KEY";

/// Builds the configured LLM client, keyed from `LLM_API_KEY`.
///
/// Returns `Ok(None)` when no key is present: the analyzer then runs its
/// deterministic rule fallback instead.
///
/// # Errors
///
/// Returns an error for an unknown provider name.
pub fn from_config(config: &LlmConfig) -> Result<Option<Arc<dyn Llm>>> {
    let Ok(api_key) = std::env::var(API_KEY_ENV) else {
        return Ok(None);
    };

    let client: Arc<dyn Llm> = match config.provider.as_str() {
        "openai" | "openai_compatible" => Arc::new(OpenAiCompatible::new(
            api_key,
            config.model.clone(),
            config.api_base.clone(),
            config.max_tokens,
            config.temperature,
            config.timeout_ms,
        )),
        "anthropic" => Arc::new(Anthropic::new(
            api_key,
            config.model.clone(),
            config.max_tokens,
            config.timeout_ms,
        )),
        other => {
            return Err(ConfigError::Invalid(format!("unknown llm.provider '{other}'")).into());
        }
    };
    Ok(Some(client))
}
