use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Round to cents, half away from zero: 150.005 becomes 150.01.
pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Round to a whole currency unit, half away from zero.
pub fn round_whole(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Sum amounts exactly, then round the total to cents. Totals beyond the
/// representable range stick at `Decimal::MAX` or `Decimal::MIN`.
pub fn sum_cents(amounts: impl IntoIterator<Item = Decimal>) -> Decimal {
    round_cents(
        amounts
            .into_iter()
            .fold(Decimal::ZERO, Decimal::saturating_add),
    )
}

/// Lossy conversion for JSON payloads.
pub fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}
