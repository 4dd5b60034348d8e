use bigdecimal::{BigDecimal, RoundingMode, Zero};

/// Fraction digits carried by every monetary amount.
pub const CURRENCY_SCALE: i64 = 2;

/// Round to currency precision using half-even rounding.
pub fn to_currency(amount: BigDecimal) -> BigDecimal {
    amount.with_scale_round(CURRENCY_SCALE, RoundingMode::HalfEven)
}

/// Unit price after applying a percentage discount.
///
/// A missing discount means no discount; out-of-range values are clamped to
/// `0..=100`.
pub fn effective_unit_price(price: &BigDecimal, discount: Option<i32>) -> BigDecimal {
    let discount = discount.unwrap_or(0).clamp(0, 100);
    let factor = BigDecimal::from(100 - discount);
    to_currency(price * factor / BigDecimal::from(100))
}

pub fn line_total(unit_price: &BigDecimal, quantity: i32) -> BigDecimal {
    to_currency(unit_price * BigDecimal::from(quantity))
}

pub fn sum_totals<'a>(totals: impl IntoIterator<Item = &'a BigDecimal>) -> BigDecimal {
    let sum = totals
        .into_iter()
        .fold(BigDecimal::zero(), |acc, total| acc + total);
    to_currency(sum)
}
