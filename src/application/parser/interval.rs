//! Interval question parser.
//!
//! Extracts bounded ranges ("between $80k and $100k", "$130-$140",
//! "from 100 to 150", bracket notation) and or-more / or-less half-lines
//! from market questions and group titles. Inclusivity follows the text
//! literally; when unstated, boundaries are treated as inclusive (venue
//! range markets step on integer boundaries). Ambiguity yields `None`.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::asset::AssetRegistry;
use crate::domain::id::MarketId;
use crate::domain::interval::IntervalInfo;
use crate::domain::market::Market;

const NUM: &str = r"\$?\s*([\d,]+(?:\.\d+)?)\s*([kKmMbBtT])?";

static BETWEEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)\bbetween\s+{NUM}\s+and\s+{NUM}")).expect("static pattern")
});
static FROM_TO: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"(?i)\bfrom\s+{NUM}\s+to\s+{NUM}")).expect("static pattern"));
static DASH: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"{NUM}\s*[-–]\s*{NUM}")).expect("static pattern"));
/// `[a, b]` / `(a, b]` bracket notation with literal inclusivity.
static BRACKET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"([\[(])\s*{NUM}\s*,\s*{NUM}\s*([\])])")).expect("static pattern")
});
static OR_MORE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"(?i){NUM}\s+or\s+(?:more|higher|above)")).expect("static pattern"));
static OR_LESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"(?i){NUM}\s+or\s+(?:less|lower|below)")).expect("static pattern"));
/// "exclusive" / "not inclusive" wording flips the default.
static EXCLUSIVE_HINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bexclusive\b|\bnot\s+inclusive\b").expect("static pattern"));

fn magnitude(suffix: &str) -> Decimal {
    match suffix {
        "k" | "K" => dec!(1000),
        "m" | "M" => dec!(1000000),
        "b" | "B" => dec!(1000000000),
        "t" | "T" => dec!(1000000000000),
        _ => Decimal::ONE,
    }
}

fn number(caps: &regex::Captures<'_>, digit_group: usize) -> Option<Decimal> {
    let digits = caps.get(digit_group)?.as_str().replace(',', "");
    let base: Decimal = digits.parse().ok()?;
    Some(base * magnitude(caps.get(digit_group + 1).map_or("", |m| m.as_str())))
}

/// Rule-based interval extractor.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntervalParser {
    assets: AssetRegistry,
}

impl IntervalParser {
    /// Creates a parser with the default asset registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            assets: AssetRegistry::new(),
        }
    }

    /// Parses a market's question (falling back to the event title for
    /// grouped range markets whose question is just the range).
    #[must_use]
    pub fn parse_market(&self, market: &Market) -> Option<IntervalInfo> {
        let text = format!("{} {}", market.question, market.event_title);
        self.parse(&text, market.id.clone(), market.end_time)
    }

    /// Parses raw text into an interval on a recognized asset.
    #[must_use]
    pub fn parse(
        &self,
        text: &str,
        market_id: MarketId,
        deadline: Option<DateTime<Utc>>,
    ) -> Option<IntervalInfo> {
        let deadline = deadline?;
        let asset = self.assets.detect_unique(text)?;
        let exclusive_hint = EXCLUSIVE_HINT.is_match(text);

        // Bracket notation carries its own inclusivity and wins outright.
        if let Some(caps) = BRACKET.captures(text) {
            let lower = number(&caps, 2)?;
            let upper = number(&caps, 4)?;
            if lower > upper {
                return None;
            }
            return Some(IntervalInfo {
                market_id,
                asset: asset.to_string(),
                lower: Some(lower),
                upper: Some(upper),
                lower_inclusive: caps.get(1).is_some_and(|m| m.as_str() == "["),
                upper_inclusive: caps.get(6).is_some_and(|m| m.as_str() == "]"),
                unit: "USD".to_string(),
                deadline,
            });
        }

        let bounded = BETWEEN
            .captures(text)
            .or_else(|| FROM_TO.captures(text))
            .or_else(|| DASH.captures(text));
        if let Some(caps) = bounded {
            let lower = number(&caps, 1)?;
            let upper = number(&caps, 3)?;
            if lower > upper {
                return None;
            }
            return Some(IntervalInfo {
                market_id,
                asset: asset.to_string(),
                lower: Some(lower),
                upper: Some(upper),
                lower_inclusive: !exclusive_hint,
                upper_inclusive: !exclusive_hint,
                unit: "USD".to_string(),
                deadline,
            });
        }

        // Half-lines phrased as range rungs ("$150 or more", "$100 or
        // less"); matching both at once is ambiguous.
        let more = OR_MORE.captures(text);
        let less = OR_LESS.captures(text);
        match (more, less) {
            (Some(caps), None) => Some(IntervalInfo {
                market_id,
                asset: asset.to_string(),
                lower: Some(number(&caps, 1)?),
                upper: None,
                lower_inclusive: true,
                upper_inclusive: true,
                unit: "USD".to_string(),
                deadline,
            }),
            (None, Some(caps)) => Some(IntervalInfo {
                market_id,
                asset: asset.to_string(),
                lower: None,
                upper: Some(number(&caps, 1)?),
                lower_inclusive: true,
                upper_inclusive: true,
                unit: "USD".to_string(),
                deadline,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn deadline() -> Option<DateTime<Utc>> {
        Some(Utc.with_ymd_and_hms(2026, 1, 4, 12, 0, 0).unwrap())
    }

    fn parse(text: &str) -> Option<IntervalInfo> {
        IntervalParser::new().parse(text, MarketId::new("m"), deadline())
    }

    #[test]
    fn parses_between_form() {
        let i = parse("Will Solana be between $100 and $150 on January 4?").unwrap();
        assert_eq!(i.asset, "sol");
        assert_eq!(i.lower, Some(dec!(100)));
        assert_eq!(i.upper, Some(dec!(150)));
        assert!(i.lower_inclusive && i.upper_inclusive);
    }

    #[test]
    fn parses_dash_form_with_suffixes() {
        let i = parse("Bitcoin $80k-$100k by March?").unwrap();
        assert_eq!(i.lower, Some(dec!(80000)));
        assert_eq!(i.upper, Some(dec!(100000)));
    }

    #[test]
    fn parses_from_to_form() {
        let i = parse("Will ETH close from 2000 to 2500?").unwrap();
        assert_eq!(i.lower, Some(dec!(2000)));
        assert_eq!(i.upper, Some(dec!(2500)));
    }

    #[test]
    fn bracket_notation_sets_inclusivity_literally() {
        let closed = parse("SOL in [130, 140] on January 4?").unwrap();
        assert!(closed.lower_inclusive && closed.upper_inclusive);

        let half_open = parse("SOL in [130, 140) on January 4?").unwrap();
        assert!(half_open.lower_inclusive);
        assert!(!half_open.upper_inclusive);

        let open = parse("SOL in (130, 140) on January 4?").unwrap();
        assert!(!open.lower_inclusive && !open.upper_inclusive);
    }

    #[test]
    fn or_more_is_lower_half_line() {
        let i = parse("Solana $150 or more on January 4?").unwrap();
        assert_eq!(i.lower, Some(dec!(150)));
        assert_eq!(i.upper, None);
        assert!(i.lower_inclusive);
    }

    #[test]
    fn or_less_is_upper_half_line() {
        let i = parse("Solana $100 or less on January 4?").unwrap();
        assert_eq!(i.lower, None);
        assert_eq!(i.upper, Some(dec!(100)));
        assert!(i.upper_inclusive);
    }

    #[test]
    fn exclusive_hint_flips_default() {
        let i = parse("Will BTC stay between $80k and $100k (bounds exclusive)?").unwrap();
        assert!(!i.lower_inclusive && !i.upper_inclusive);
    }

    #[test]
    fn inverted_bounds_are_ambiguous() {
        assert!(parse("Will BTC be between $100k and $80k?").is_none());
    }

    #[test]
    fn plain_threshold_text_is_not_an_interval() {
        assert!(parse("Will BTC be above $100k?").is_none());
    }

    #[test]
    fn unknown_asset_returns_none() {
        assert!(parse("Will the spread be between 3 and 7 points?").is_none());
    }

    #[test]
    fn missing_deadline_returns_none() {
        assert!(IntervalParser::new()
            .parse("SOL between $100 and $150", MarketId::new("m"), None)
            .is_none());
    }
}
