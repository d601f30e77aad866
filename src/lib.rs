//! Dutchbook - combinatorial arbitrage scanner for prediction markets.
//!
//! A *Dutch book* is a basket of bets that guarantees a profit against
//! incoherent odds. This crate scans a prediction-market venue for exactly
//! that: sets of binary outcome markets whose prices, taken together,
//! violate a probabilistic constraint (a complete partition priced below
//! one dollar, a threshold ladder with inverted rungs, an implication
//! priced backwards), computes the buy-basket and its worst-case payoff,
//! and pushes every candidate through a six-layer validation pipeline
//! before emitting it.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── domain/          # Venue-agnostic types: markets, books, ladders,
//! │                    # intervals, relations, opportunities, reports
//! ├── application/     # Parsers, clusterer, analyzer, strategies,
//! │                    # validation engine, scan orchestrator
//! ├── port/            # Outbound traits (market source, LLM, embedder)
//! ├── adapter/         # Polymarket REST, LLM and embedding clients
//! └── infrastructure/  # Config, logging, rate limiting, retry, cancel
//! ```
//!
//! The scan is a staged, bounded-concurrency pipeline: market snapshot →
//! parsed threshold/interval tables and semantic clusters → pluggable
//! strategies → validation layers → accepted opportunities.

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

pub use error::{Error, Result};
