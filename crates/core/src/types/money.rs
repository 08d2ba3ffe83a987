//! Money formatting and VAT arithmetic.
//!
//! Amounts are `rust_decimal::Decimal` in euros. Prices recorded by the store
//! are VAT-inclusive.

use rust_decimal::{Decimal, RoundingStrategy};

/// Currency symbol printed after every amount.
pub const CURRENCY_SYMBOL: &str = "€";

/// Spanish general VAT (IVA) rate.
pub const VAT_RATE: Decimal = Decimal::from_parts(21, 0, 0, false, 2);

/// Format an amount with two decimals and the currency symbol.
///
/// ```
/// use orders_relay_core::format_amount;
/// use rust_decimal::Decimal;
///
/// assert_eq!(format_amount(Decimal::new(1999, 2)), "19.99 €");
/// assert_eq!(format_amount(Decimal::new(-5, 0)), "-5.00 €");
/// ```
#[must_use]
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{rounded:.2} {CURRENCY_SYMBOL}")
}

/// Split a VAT-inclusive total into `(subtotal, vat)`, both rounded to cents.
///
/// The two parts always add back up to the rounded total.
#[must_use]
pub fn split_vat(total: Decimal) -> (Decimal, Decimal) {
    let total = total.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let subtotal = (total / (Decimal::ONE + VAT_RATE))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    (subtotal, total - subtotal)
}
