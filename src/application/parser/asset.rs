//! Named-asset recognition.
//!
//! Maps question text to a canonical asset symbol. Covers the major
//! crypto assets plus common equities, indices, and commodities; anything
//! unrecognized makes the question unparseable rather than guessed at.

use once_cell::sync::Lazy;
use regex::Regex;

/// `(canonical symbol, alias patterns)` table. Aliases are matched on
/// word boundaries, case-insensitive; earlier rows win.
static ASSET_TABLE: &[(&str, &[&str])] = &[
    ("btc", &[r"bitcoin", r"btc"]),
    ("eth", &[r"ethereum", r"eth"]),
    ("sol", &[r"solana", r"sol"]),
    ("xrp", &[r"ripple", r"xrp"]),
    ("doge", &[r"dogecoin", r"doge"]),
    ("ada", &[r"cardano", r"ada"]),
    ("bnb", &[r"binance\s+coin", r"bnb"]),
    ("avax", &[r"avalanche", r"avax"]),
    ("dot", &[r"polkadot", r"dot"]),
    ("matic", &[r"polygon", r"matic"]),
    ("link", &[r"chainlink", r"link"]),
    ("atom", &[r"cosmos", r"atom"]),
    ("ltc", &[r"litecoin", r"ltc"]),
    ("uni", &[r"uniswap", r"uni"]),
    ("gold", &[r"gold"]),
    ("silver", &[r"silver"]),
    ("oil", &[r"crude\s+oil", r"oil", r"wti", r"brent"]),
    ("spx", &[r"s&p\s*500", r"spx"]),
    ("ndx", &[r"nasdaq(?:\s*100)?", r"ndx"]),
    ("tsla", &[r"tesla", r"tsla"]),
    ("nvda", &[r"nvidia", r"nvda"]),
    ("aapl", &[r"apple", r"aapl"]),
];

static COMPILED: Lazy<Vec<(&'static str, Vec<Regex>)>> = Lazy::new(|| {
    ASSET_TABLE
        .iter()
        .map(|(symbol, aliases)| {
            let patterns = aliases
                .iter()
                .map(|alias| Regex::new(&format!(r"(?i)\b(?:{alias})\b")).expect("static pattern"))
                .collect();
            (*symbol, patterns)
        })
        .collect()
});

/// Registry of recognizable underlying assets.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssetRegistry;

impl AssetRegistry {
    /// Creates the default registry.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Detects the canonical asset named in `text`, if any.
    #[must_use]
    pub fn detect(&self, text: &str) -> Option<&'static str> {
        COMPILED
            .iter()
            .find(|(_, patterns)| patterns.iter().any(|p| p.is_match(text)))
            .map(|(symbol, _)| *symbol)
    }

    /// Detects the single asset named in `text`; `None` when no asset or
    /// more than one distinct asset appears. Parsers treat a multi-asset
    /// question as ambiguous rather than picking a side.
    #[must_use]
    pub fn detect_unique(&self, text: &str) -> Option<&'static str> {
        let mut found = None;
        for (symbol, patterns) in COMPILED.iter() {
            if patterns.iter().any(|p| p.is_match(text)) {
                match found {
                    None => found = Some(*symbol),
                    Some(existing) if existing == *symbol => {}
                    Some(_) => return None,
                }
            }
        }
        found
    }

    /// Canonicalizes a token for text normalization: alias -> symbol.
    #[must_use]
    pub fn canonicalize(&self, word: &str) -> Option<&'static str> {
        COMPILED
            .iter()
            .find(|(_, patterns)| {
                patterns
                    .iter()
                    .any(|p| p.find(word).is_some_and(|m| m.as_str().len() == word.len()))
            })
            .map(|(symbol, _)| *symbol)
    }

    /// Number of known assets.
    #[must_use]
    pub fn len(&self) -> usize {
        ASSET_TABLE.len()
    }

    /// Always false; the registry is statically populated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        ASSET_TABLE.is_empty()
    }
}
