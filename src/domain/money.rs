//! Monetary types for price and size representation.

use rust_decimal::Decimal;

/// Price represented as a Decimal for precision.
///
/// Prediction-market prices live in `[0, 1]` and are interpretable as
/// implied probabilities.
pub type Price = Decimal;

/// Share size represented as a Decimal for precision.
pub type Size = Decimal;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn price_arithmetic_is_exact() {
        let yes: Price = dec!(0.31);
        let no: Price = dec!(0.70);
        assert_eq!(yes + no, dec!(1.01));
    }
}
