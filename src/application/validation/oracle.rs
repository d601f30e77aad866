//! Oracle-alignment classification.
//!
//! Extracts the resolution authority from each market's rules text using
//! a precedence-ordered directory and classifies leg pairs as aligned
//! (identical authority), compatible (same authority class), or
//! misaligned. Misalignment is the dominant historical failure mode of
//! naive combinatorial arbitrage, so it is a hard rejection.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::market::Market;
use crate::domain::opportunity::OracleAlignment;

/// `(class, authority, patterns)` in precedence order: the first match
/// in the rules text wins.
static DIRECTORY: &[(&str, &str, &[&str])] = &[
    ("crypto_exchange", "coinbase", &[r"coinbase"]),
    ("crypto_exchange", "binance", &[r"binance"]),
    ("crypto_data", "coingecko", &[r"coingecko"]),
    ("crypto_data", "coinmarketcap", &[r"coinmarketcap"]),
    ("crypto_data", "chainlink", &[r"chainlink"]),
    ("crypto_data", "pyth", &[r"pyth"]),
    ("wire_service", "associated_press", &[r"associated\s+press", r"\bap\b"]),
    ("wire_service", "reuters", &[r"reuters"]),
    ("network_call", "fox", &[r"fox\s+news", r"\bfox\b"]),
    ("network_call", "nbc", &[r"\bnbc\b"]),
    ("network_call", "cnn", &[r"\bcnn\b"]),
    ("official", "government", &[r"official\s+(?:results?|certification|government)", r"electoral\s+college"]),
    ("official", "sec", &[r"\bsec\b"]),
    ("official", "federal_reserve", &[r"federal\s+reserve", r"\bfomc\b", r"\bfed\b"]),
    ("sports_league", "league", &[r"\bnba\b", r"\bnfl\b", r"\bmlb\b", r"\bnhl\b", r"\bfifa\b", r"\buefa\b"]),
];

static COMPILED: Lazy<Vec<(&'static str, &'static str, Vec<Regex>)>> = Lazy::new(|| {
    DIRECTORY
        .iter()
        .map(|(class, authority, patterns)| {
            let regexes = patterns
                .iter()
                .map(|p| Regex::new(&format!("(?i){p}")).expect("static pattern"))
                .collect();
            (*class, *authority, regexes)
        })
        .collect()
});

/// A recognized resolution authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Authority {
    /// Authority class (e.g. "crypto_exchange").
    pub class: &'static str,
    /// Specific authority (e.g. "coinbase").
    pub name: &'static str,
}

/// Classifies resolution sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct OracleDirectory;

impl OracleDirectory {
    /// Creates the default directory.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Best-effort authority extraction: the explicit
    /// `resolution_source` field first, then the rules text.
    #[must_use]
    pub fn extract(&self, market: &Market) -> Option<Authority> {
        let candidates = [&market.resolution_source, &market.event_description];
        for text in candidates {
            if text.is_empty() {
                continue;
            }
            for (class, name, patterns) in COMPILED.iter() {
                if patterns.iter().any(|p| p.is_match(text)) {
                    return Some(Authority { class, name });
                }
            }
        }
        None
    }

    /// Classifies one pair of markets.
    #[must_use]
    pub fn classify_pair(&self, a: &Market, b: &Market) -> OracleAlignment {
        match (self.extract(a), self.extract(b)) {
            (Some(x), Some(y)) if x.name == y.name => OracleAlignment::Aligned,
            (Some(x), Some(y)) if x.class == y.class => OracleAlignment::Compatible,
            (Some(_), Some(_)) => OracleAlignment::Misaligned,
            // Nothing extractable on either side: cannot prove
            // misalignment; the checklist flags the pair for review.
            (None, None) => OracleAlignment::Compatible,
            _ => OracleAlignment::Misaligned,
        }
    }

    /// Worst alignment over all market pairs.
    #[must_use]
    pub fn classify_all(&self, markets: &[&Market]) -> OracleAlignment {
        let mut worst = OracleAlignment::Aligned;
        for i in 0..markets.len() {
            for j in (i + 1)..markets.len() {
                match self.classify_pair(markets[i], markets[j]) {
                    OracleAlignment::Misaligned => return OracleAlignment::Misaligned,
                    OracleAlignment::Compatible => worst = OracleAlignment::Compatible,
                    OracleAlignment::Aligned => {}
                }
            }
        }
        worst
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::id::{EventId, MarketId, TokenId};
    use rust_decimal_macros::dec;

    fn market_with_rules(source: &str, rules: &str) -> Market {
        Market {
            id: MarketId::new("m"),
            condition_id: String::new(),
            token_yes: TokenId::new("y"),
            token_no: TokenId::new("n"),
            question: String::new(),
            market_description: String::new(),
            event_description: rules.into(),
            event_id: EventId::new("e"),
            event_title: String::new(),
            tags: Default::default(),
            yes_mid: dec!(0.5),
            no_mid: dec!(0.5),
            best_bid_yes: None,
            best_ask_yes: None,
            best_bid_no: None,
            best_ask_no: None,
            liquidity_usd: dec!(0),
            volume_usd: dec!(0),
            end_time: None,
            created_at: None,
            resolution_source: source.into(),
            neg_risk: false,
        }
    }

    #[test]
    fn identical_authorities_align() {
        let directory = OracleDirectory::new();
        let a = market_with_rules("", "Resolves per the Coinbase 1-minute candle close.");
        let b = market_with_rules("Coinbase", "");
        assert_eq!(directory.classify_pair(&a, &b), OracleAlignment::Aligned);
    }

    #[test]
    fn same_class_is_compatible() {
        let directory = OracleDirectory::new();
        let a = market_with_rules("", "Resolution source: Associated Press call.");
        let b = market_with_rules("", "Resolves when Reuters reports the result.");
        assert_eq!(directory.classify_pair(&a, &b), OracleAlignment::Compatible);
    }

    #[test]
    fn different_classes_are_misaligned() {
        let directory = OracleDirectory::new();
        let a = market_with_rules("", "Resolves per Coinbase price data.");
        let b = market_with_rules("", "Resolves per the Associated Press.");
        assert_eq!(directory.classify_pair(&a, &b), OracleAlignment::Misaligned);
    }

    #[test]
    fn one_known_one_unknown_is_misaligned() {
        let directory = OracleDirectory::new();
        let a = market_with_rules("", "Resolves per Coinbase price data.");
        let b = market_with_rules("", "Whatever happens happens.");
        assert_eq!(directory.classify_pair(&a, &b), OracleAlignment::Misaligned);
    }

    #[test]
    fn both_unknown_is_compatible() {
        let directory = OracleDirectory::new();
        let a = market_with_rules("", "No recognizable authority here.");
        let b = market_with_rules("", "");
        assert_eq!(directory.classify_pair(&a, &b), OracleAlignment::Compatible);
    }

    #[test]
    fn resolution_source_field_takes_precedence() {
        let directory = OracleDirectory::new();
        let m = market_with_rules("Binance", "Background mentions Coinbase too.");
        assert_eq!(directory.extract(&m).unwrap().name, "binance");
    }

    #[test]
    fn classify_all_returns_worst_pair() {
        let directory = OracleDirectory::new();
        let a = market_with_rules("Coinbase", "");
        let b = market_with_rules("Coinbase", "");
        let c = market_with_rules("", "Resolves per the Associated Press.");
        assert_eq!(directory.classify_all(&[&a, &b]), OracleAlignment::Aligned);
        assert_eq!(
            directory.classify_all(&[&a, &b, &c]),
            OracleAlignment::Misaligned
        );
    }

    #[test]
    fn ap_abbreviation_needs_word_boundary() {
        let directory = OracleDirectory::new();
        // "apply" must not read as AP.
        let m = market_with_rules("", "Standard rules apply.");
        assert!(directory.extract(&m).is_none());
    }
}
