//! Cross-cutting infrastructure: configuration, rate limiting, retry,
//! cancellation.

pub mod cancel;
pub mod config;
pub mod rate_limit;
pub mod retry;
