//! Outbound ports consumed by the application layer.

pub mod embedder;
pub mod llm;
pub mod market_source;

pub use embedder::Embedder;
pub use llm::Llm;
pub use market_source::MarketSource;
