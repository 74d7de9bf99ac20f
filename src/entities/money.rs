//! Fixed-scale serialization for money values.
//!
//! `Decimal` remembers the scale it was parsed with, and the SQLite
//! round-trip collapses trailing zeros, so a stored `40.50` would
//! otherwise serialize as `"40.5"`. Responses always emit exactly two
//! decimal places.

use rust_decimal::Decimal;
use serde::Serializer;

/// `value` rescaled to exactly two decimal places.
pub fn two_dp(value: Decimal) -> Decimal {
    let mut amount = value;
    amount.rescale(2);
    amount
}

/// Field serializer; pair with
/// `#[serde(serialize_with = "crate::entities::money::serialize")]`.
pub fn serialize<S>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&two_dp(*value).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn collapsed_scales_are_padded_back_to_two_places() {
        assert_eq!(two_dp(dec!(40.5)).to_string(), "40.50");
        assert_eq!(two_dp(dec!(38)).to_string(), "38.00");
        assert_eq!(two_dp(dec!(875)).to_string(), "875.00");
    }

    #[test]
    fn excess_precision_is_rounded_to_cents() {
        assert_eq!(two_dp(dec!(2.344)).to_string(), "2.34");
        assert_eq!(two_dp(dec!(2.346)).to_string(), "2.35");
    }
}
