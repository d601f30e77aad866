//! Prompt construction for relation analysis.
//!
//! Every prompt carries the markets' resolution rules: classification
//! that ignores the rules text produces exactly the oracle-mismatch
//! failures the validator exists to catch.

use crate::domain::market::Market;

fn rules_excerpt(market: &Market) -> String {
    let rules = if market.event_description.is_empty() {
        &market.market_description
    } else {
        &market.event_description
    };
    if rules.is_empty() {
        "unspecified".to_string()
    } else {
        rules.chars().take(500).collect()
    }
}

fn source_or_unspecified(market: &Market) -> &str {
    if market.resolution_source.is_empty() {
        "unspecified"
    } else {
        &market.resolution_source
    }
}

/// Builds the pair-classification prompt.
#[must_use]
pub fn pair_prompt(a: &Market, b: &Market) -> String {
    format!(
        r#"You are an expert at analyzing logical relationships between prediction markets.

Analyze the logical relationship between these two markets:

**Market A:**
- Question: {qa}
- Resolution rules: {ra}
- Resolution source: {sa}
- YES price: ${pa}

**Market B:**
- Question: {qb}
- Resolution rules: {rb}
- Resolution source: {sb}
- YES price: ${pb}

Classify the relationship as exactly one of:
1. IMPLIES_AB: A resolving YES forces B to resolve YES, so P(B) >= P(A)
2. IMPLIES_BA: B resolving YES forces A to resolve YES, so P(A) >= P(B)
3. EQUIVALENT: A and B always resolve identically, so P(A) = P(B)
4. MUTUAL_EXCLUSIVE: A and B cannot both resolve YES, so P(A) + P(B) <= 1
5. EXHAUSTIVE: part of a mutually exclusive and collectively exhaustive set
6. INDEPENDENT: no logical dependency

Base the classification on the resolution rules, not just the questions.

Answer with strictly this JSON and nothing else:
```json
{{
  "relationship": "<one of the six labels>",
  "confidence": <0.0-1.0>,
  "reasoning": "<why, citing the rules>",
  "edge_cases": ["<boundary scenarios that could break the relation>"],
  "resolution_compatible": <true|false>
}}
```"#,
        qa = a.question,
        ra = rules_excerpt(a),
        sa = source_or_unspecified(a),
        pa = a.yes_mid,
        qb = b.question,
        rb = rules_excerpt(b),
        sb = source_or_unspecified(b),
        pb = b.yes_mid,
    )
}

/// Builds the exhaustive-set verification prompt.
#[must_use]
pub fn exhaustive_prompt(markets: &[&Market]) -> String {
    let mut listing = String::new();
    for (i, market) in markets.iter().enumerate() {
        listing.push_str(&format!(
            "{}. {} (YES ${})\n",
            i + 1,
            market.question,
            market.yes_mid
        ));
    }
    let rules = markets.first().map_or_else(String::new, |m| rules_excerpt(m));

    format!(
        r#"These prediction markets belong to one event.

Markets:
{listing}
Resolution rules: {rules}

Are these outcomes mutually exclusive AND collectively exhaustive - does
exactly one of them always resolve YES?

Answer with strictly this JSON and nothing else:
```json
{{
  "is_complete": <true|false>,
  "confidence": <0.0-1.0>,
  "missing_cases": ["<outcomes not covered by any listed market>"]
}}
```"#,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::id::{EventId, MarketId, TokenId};
    use rust_decimal_macros::dec;

    fn market(question: &str, rules: &str) -> Market {
        Market {
            id: MarketId::new("m"),
            condition_id: String::new(),
            token_yes: TokenId::new("y"),
            token_no: TokenId::new("n"),
            question: question.into(),
            market_description: String::new(),
            event_description: rules.into(),
            event_id: EventId::new("e"),
            event_title: String::new(),
            tags: Default::default(),
            yes_mid: dec!(0.4),
            no_mid: dec!(0.6),
            best_bid_yes: None,
            best_ask_yes: None,
            best_bid_no: None,
            best_ask_no: None,
            liquidity_usd: dec!(0),
            volume_usd: dec!(0),
            end_time: None,
            created_at: None,
            resolution_source: "Coinbase".into(),
            neg_risk: false,
        }
    }

    #[test]
    fn pair_prompt_includes_rules_and_prices() {
        let a = market("Will BTC hit $100k?", "Resolves per Coinbase 1-minute candle.");
        let b = market("Will BTC hit $110k?", "Resolves per Coinbase 1-minute candle.");
        let prompt = pair_prompt(&a, &b);

        assert!(prompt.contains("Will BTC hit $100k?"));
        assert!(prompt.contains("Coinbase 1-minute candle"));
        assert!(prompt.contains("$0.4"));
        assert!(prompt.contains("IMPLIES_AB"));
        assert!(prompt.contains("resolution_compatible"));
    }

    #[test]
    fn pair_prompt_marks_missing_rules() {
        let a = market("Q1?", "");
        let b = market("Q2?", "");
        let prompt = pair_prompt(&a, &b);
        assert!(prompt.contains("Resolution rules: unspecified"));
    }

    #[test]
    fn exhaustive_prompt_lists_all_markets() {
        let a = market("Candidate A wins?", "Official certification.");
        let b = market("Candidate B wins?", "Official certification.");
        let prompt = exhaustive_prompt(&[&a, &b]);
        assert!(prompt.contains("1. Candidate A wins?"));
        assert!(prompt.contains("2. Candidate B wins?"));
        assert!(prompt.contains("is_complete"));
    }
}
