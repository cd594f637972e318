use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of fraction digits kept for USD/EGP amounts.
pub const MONEY_DP: u32 = 2;

/// Rounds an amount to cents.
///
/// Uses round-half-to-even, so `0.125` becomes `0.12` and `0.135` becomes
/// `0.14`.
///
/// # Examples
///
/// ```rust
/// use engine::money::round_money;
/// use rust_decimal::Decimal;
///
/// let amount: Decimal = "607.741935".parse().unwrap();
/// assert_eq!(round_money(amount).to_string(), "607.74");
/// ```
#[must_use]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointNearestEven)
}

/// Divides `numerator` by `denominator`, returning `None` when the
/// denominator is zero.
#[must_use]
pub fn ratio(numerator: Decimal, denominator: Decimal) -> Option<Decimal> {
    if denominator.is_zero() {
        return None;
    }
    numerator.checked_div(denominator)
}

/// A USD amount formatted the way the back office reads it (`1100.00 $`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Usd(pub Decimal);

impl fmt::Display for Usd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} $", round_money(self.0))
    }
}

impl From<Decimal> for Usd {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}
