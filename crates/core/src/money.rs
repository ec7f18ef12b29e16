//! Decimal rounding for monetary outputs.

use rust_decimal::{Decimal, RoundingStrategy};

/// Round a monetary amount to exactly 2 decimal places, half away from zero.
///
/// All monetary values written to the sheet go through this: `10.005`
/// becomes `10.01`, not `10.00`.
#[must_use]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
