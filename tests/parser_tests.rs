//! Parser boundary behavior over a corpus of real-shaped questions.

mod support;

use chrono::{TimeZone, Utc};
use dutchbook::application::parser::{IntervalParser, ThresholdParser};
use dutchbook::domain::id::MarketId;
use dutchbook::domain::threshold::ThresholdDirection;
use rust_decimal_macros::dec;

fn deadline() -> Option<chrono::DateTime<Utc>> {
    Some(Utc.with_ymd_and_hms(2026, 6, 30, 12, 0, 0).unwrap())
}

#[test]
fn ambiguous_questions_never_parse_as_thresholds() {
    let parser = ThresholdParser::new();
    // Hand-collected phrasings that must all refuse to parse: vague
    // levels, missing assets, ranges, conflicting directions, and
    // non-price questions that merely mention an asset.
    let ambiguous = [
        "Will Bitcoin go up this week?",
        "Will Bitcoin moon?",
        "Will BTC be above its all-time high?",
        "Will BTC outperform ETH this year?",
        "Will Ethereum flip Bitcoin?",
        "Will BTC be between $80k and $100k?",
        "Will ETH trade in the $2000-$2500 range?",
        "Will SOL go from $100 to $200 this quarter?",
        "Will BTC dip to $80k before it hits $120k?",
        "Will ETH be above $3000 or below $2000 at year end?",
        "Will Bitcoin double?",
        "Will Bitcoin crash?",
        "Will something be above $100?",
        "Will the price be above the strike?",
        "Will Bitcoin volatility stay elevated?",
        "Will Solana close higher than it opened?",
        "Will BTC dominance rise?",
        "How high will Bitcoin go?",
        "Will Bitcoin hit a new high or a new low?",
        "Will gold or silver be above $3000?",
        "Will Bitcoin beat its 2021 peak before the halving?",
        "Will ETH gas fees be above average?",
    ];
    for question in ambiguous {
        assert!(
            parser.parse(question, MarketId::new("m"), deadline()).is_none(),
            "expected no threshold parse for: {question}"
        );
    }
    assert!(ambiguous.len() >= 20);
}

#[test]
fn clean_threshold_phrasings_parse() {
    let parser = ThresholdParser::new();
    let cases = [
        ("Will Bitcoin be above $110k by June 30?", ThresholdDirection::Above, dec!(110000)),
        ("Will BTC exceed $1.5M by 2030?", ThresholdDirection::Above, dec!(1500000)),
        ("Will Ethereum break $5,000 this cycle?", ThresholdDirection::Above, dec!(5000)),
        ("Will SOL be below $100 on June 30?", ThresholdDirection::Below, dec!(100)),
        ("Will XRP fall below $0.50?", ThresholdDirection::Below, dec!(0.50)),
        ("Will Dogecoin reach triple digits?", ThresholdDirection::Above, dec!(100)),
    ];
    for (question, direction, level) in cases {
        let parsed = parser
            .parse(question, MarketId::new("m"), deadline())
            .unwrap_or_else(|| panic!("expected parse for: {question}"));
        assert_eq!(parsed.direction, direction, "{question}");
        assert_eq!(parsed.level, level, "{question}");
    }
}

#[test]
fn touch_questions_carry_the_review_flag() {
    let parser = ThresholdParser::new();
    let touch = parser
        .parse("Will Bitcoin hit $150k in 2026?", MarketId::new("m"), deadline())
        .unwrap();
    assert!(touch.touch);

    let terminal = parser
        .parse("Will Bitcoin be above $150k on December 31?", MarketId::new("m"), deadline())
        .unwrap();
    assert!(!terminal.touch);
}

#[test]
fn adjacent_intervals_partition_correctly() {
    let parser = IntervalParser::new();
    let below = parser
        .parse("Solana $100 or less on January 4?", MarketId::new("below"), deadline())
        .unwrap();
    let above = parser
        .parse("Solana $150 or more on January 4?", MarketId::new("above"), deadline())
        .unwrap();
    let middle = parser
        .parse("Will Solana be between $100 and $150 on January 4?", MarketId::new("mid"), deadline())
        .unwrap();

    // The venue's rungs are all inclusive, so this trio double-counts
    // its boundaries; the adjacency predicate must say so.
    assert!(!below.is_adjacent_below(&middle));
    assert!(!middle.is_adjacent_below(&above));
    // But bracket phrasing with half-open bounds partitions cleanly.
    let half_open = parser
        .parse("SOL in [100, 150) on January 4?", MarketId::new("ho"), deadline())
        .unwrap();
    assert!(below.upper < half_open.upper);
    let upper_rung = parser
        .parse("SOL in [150, 200) on January 4?", MarketId::new("up"), deadline())
        .unwrap();
    assert!(half_open.is_adjacent_below(&upper_rung));
    assert!(half_open.is_disjoint_with(&upper_rung));
}

#[test]
fn threshold_round_trip_from_rendered_text() {
    let parser = ThresholdParser::new();
    let original = dutchbook::domain::threshold::ThresholdInfo {
        market_id: MarketId::new("m"),
        asset: "btc".into(),
        direction: ThresholdDirection::Above,
        level: dec!(110000),
        unit: "USD".into(),
        deadline: deadline().unwrap(),
        touch: false,
    };
    let reparsed = parser
        .parse(&original.render(), MarketId::new("m"), deadline())
        .expect("rendered threshold must reparse");
    assert_eq!(reparsed, original);
}
