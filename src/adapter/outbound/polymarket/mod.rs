//! Polymarket REST adapters.
//!
//! Two API surfaces:
//! - **Gamma** (`gamma-api.polymarket.com`) — market and event discovery
//!   with volume, liquidity, rules text, and tags.
//! - **CLOB** (`clob.polymarket.com`) — order book queries.

pub mod cache;
pub mod client;
pub mod dto;

pub use client::PolymarketClient;
