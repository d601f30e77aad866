//! Outbound adapters: venue REST, LLM providers, embeddings.

pub mod embedding;
pub mod llm;
pub mod polymarket;
