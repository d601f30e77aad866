//! Threshold question parser.
//!
//! Extracts `(asset, direction, level, unit)` from questions like
//! "Will BTC be above $110k by June 30?". Deterministic and rule-based;
//! the deadline comes from the market record, not the text. Ambiguous
//! phrasing, a missing asset, a missing level, or a missing deadline all
//! yield `None` rather than a guess.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::asset::AssetRegistry;
use crate::domain::id::MarketId;
use crate::domain::market::Market;
use crate::domain::threshold::{ThresholdDirection, ThresholdInfo};

/// Number with optional currency sigil, thousands separators, magnitude
/// suffix, and percent sign.
const NUMBER: &str = r"(\$)?\s*([\d,]+(?:\.\d+)?)\s*([kKmMbBtT])?\s*(%)?";

struct DirectionalPattern {
    regex: Regex,
    direction: ThresholdDirection,
    touch: bool,
}

fn pattern(keywords: &str, direction: ThresholdDirection, touch: bool) -> DirectionalPattern {
    DirectionalPattern {
        regex: Regex::new(&format!(r"(?i)(?:{keywords})\s*{NUMBER}")).expect("static pattern"),
        direction,
        touch,
    }
}

static DIRECTIONAL: Lazy<Vec<DirectionalPattern>> = Lazy::new(|| {
    use ThresholdDirection::{Above, Below};
    vec![
        // Terminal-price phrasings.
        pattern(
            r"\babove\b|\bover\b|\bexceeds?\b|\bsurpass(?:es)?\b|\bbreaks?\b|\bcross(?:es)?\b|\btops?\b|\bgreater\s+than\b|\bat\s+least\b|>=|≥|>",
            Above,
            false,
        ),
        pattern(
            r"\bbelow\b|\bunder\b|\bless\s+than\b|\bat\s+most\b|\b(?:falls?|drops?)\s+(?:below|under)\b|<=|≤|<",
            Below,
            false,
        ),
        // Touch phrasings: resolve on any touch before the deadline.
        pattern(r"\bhits?\b|\breach(?:es)?\b|\btouch(?:es)?\b", Above, true),
        pattern(r"\bdips?\s+(?:to|below|under)\b|\b(?:falls?|drops?)\s+to\b", Below, true),
    ]
});

/// Digit-count phrasings mapped to levels.
static DIGIT_PHRASES: Lazy<Vec<(Regex, Decimal, ThresholdDirection)>> = Lazy::new(|| {
    use ThresholdDirection::{Above, Below};
    let compile = |p: &str| Regex::new(p).expect("static pattern");
    vec![
        (compile(r"(?i)\btriple\s+digits?\b"), dec!(100), Above),
        (compile(r"(?i)\bfour\s+digits?\b"), dec!(1000), Above),
        (compile(r"(?i)\bfive\s+digits?\b"), dec!(10000), Above),
        (compile(r"(?i)\bsingle\s+digits?\b"), dec!(10), Below),
        (compile(r"(?i)\bdouble\s+digits?\b"), dec!(100), Below),
    ]
});

/// Range phrasings disqualify a question from threshold parsing; they
/// belong to the interval parser.
static RANGE_MARKERS: Lazy<Vec<Regex>> = Lazy::new(|| {
    let compile = |p: &str| Regex::new(p).expect("static pattern");
    vec![
        compile(r"(?i)\bbetween\b.+\band\b"),
        compile(r"(?i)\bfrom\s+\$?[\d,.]+[kKmMbBtT]?\s+to\s+"),
        compile(r"\$?[\d,.]+[kKmMbBtT]?\s*[-–]\s*\$?[\d,.]+"),
    ]
});

fn magnitude(suffix: &str) -> Decimal {
    match suffix {
        "k" | "K" => dec!(1000),
        "m" | "M" => dec!(1000000),
        "b" | "B" => dec!(1000000000),
        "t" | "T" => dec!(1000000000000),
        _ => Decimal::ONE,
    }
}

struct DirectionalHit {
    direction: ThresholdDirection,
    touch: bool,
    level: Decimal,
    unit: String,
}

/// Rule-based threshold extractor.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdParser {
    assets: AssetRegistry,
}

impl ThresholdParser {
    /// Creates a parser with the default asset registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            assets: AssetRegistry::new(),
        }
    }

    /// Parses a market's question into a threshold, when it is a pure
    /// threshold statement on a recognized asset with a deadline.
    #[must_use]
    pub fn parse_market(&self, market: &Market) -> Option<ThresholdInfo> {
        self.parse(&market.question, market.id.clone(), market.end_time)
    }

    /// Parses raw question text. `deadline` must be known (markets
    /// without an end time carry no deadline context and never parse).
    #[must_use]
    pub fn parse(
        &self,
        question: &str,
        market_id: MarketId,
        deadline: Option<DateTime<Utc>>,
    ) -> Option<ThresholdInfo> {
        let deadline = deadline?;
        let asset = self.assets.detect_unique(question)?;

        if RANGE_MARKERS.iter().any(|p| p.is_match(question)) {
            return None;
        }

        let mut hits: Vec<DirectionalHit> = Vec::new();
        for pat in DIRECTIONAL.iter() {
            if let Some(caps) = pat.regex.captures(question) {
                let digits = caps.get(2)?.as_str().replace(',', "");
                let base: Decimal = digits.parse().ok()?;
                let level = base * magnitude(caps.get(3).map_or("", |m| m.as_str()));
                let unit = if caps.get(4).is_some() {
                    "%".to_string()
                } else if caps.get(1).is_some() {
                    "USD".to_string()
                } else {
                    String::new()
                };
                hits.push(DirectionalHit {
                    direction: pat.direction,
                    touch: pat.touch,
                    level,
                    unit,
                });
            }
        }

        for (regex, level, direction) in DIGIT_PHRASES.iter() {
            if regex.is_match(question) {
                hits.push(DirectionalHit {
                    direction: *direction,
                    touch: false,
                    level: *level,
                    unit: "USD".to_string(),
                });
            }
        }

        // One clear reading required. Two hits agreeing on direction and
        // level (e.g. "hit" + ">=") still count as one; conflicting
        // directions or levels are ambiguous.
        let first = hits.pop()?;
        let consistent = hits
            .iter()
            .all(|h| h.direction == first.direction && h.level == first.level);
        if !consistent {
            return None;
        }
        // Touch phrasing wins over a terminal reading of the same level.
        let touch = first.touch || hits.iter().any(|h| h.touch);

        Some(ThresholdInfo {
            market_id,
            asset: asset.to_string(),
            direction: first.direction,
            level: first.level,
            unit: first.unit,
            deadline,
            touch,
        })
    }
}
