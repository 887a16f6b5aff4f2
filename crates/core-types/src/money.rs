use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds a monetary amount to cents, half away from zero.
///
/// Applied once, at the point a value is written to the ledger. Intermediate
/// arithmetic keeps full precision so repeated operations do not accumulate
/// rounding drift.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_money(dec!(1.005)), dec!(1.01));
        assert_eq!(round_money(dec!(-1.005)), dec!(-1.01));
        assert_eq!(round_money(dec!(2.004)), dec!(2.00));
    }

    #[test]
    fn keeps_already_rounded_values() {
        assert_eq!(round_money(dec!(1500.50)), dec!(1500.50));
        assert_eq!(round_money(Decimal::ZERO), Decimal::ZERO);
    }
}
