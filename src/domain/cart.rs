use bigdecimal::BigDecimal;

use crate::domain::prescription::PrescriptionStatus;

/// One cart item as seen by the aggregate recompute.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub prescription_required: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CartTotals {
    pub total_amount: BigDecimal,
    pub requires_prescription: bool,
}

/// Largest amount a `NUMERIC(12, 2)` column holds, 9999999999.99.
pub fn max_amount() -> BigDecimal {
    BigDecimal::new(999_999_999_999i64.into(), 2)
}

/// Whether `amount` is storable as money: at most two decimal places and
/// no larger than [`max_amount`] in magnitude.
pub fn fits_money(amount: &BigDecimal) -> bool {
    amount.normalized().fractional_digit_count() <= 2 && amount.abs() <= max_amount()
}

pub fn line_total(quantity: i32, unit_price: &BigDecimal) -> BigDecimal {
    unit_price * BigDecimal::from(quantity)
}

/// Derives the cart-level aggregates from its items.
pub fn compute_totals(lines: &[PricedLine]) -> CartTotals {
    let total_amount = lines
        .iter()
        .map(|line| line_total(line.quantity, &line.unit_price))
        .fold(BigDecimal::from(0), |acc, x| acc + x);

    CartTotals {
        total_amount,
        requires_prescription: lines.iter().any(|line| line.prescription_required),
    }
}

/// Cart prescription state after adding an item.
///
/// A verification covers the prescription medicines that were in the cart
/// when it was reviewed. Introducing a new prescription medicine drops a
/// `Verified` state so that a fresh prescription has to be uploaded.
pub fn prescription_status_after_add(
    current: Option<PrescriptionStatus>,
    medicine_requires_prescription: bool,
    already_in_cart: bool,
) -> Option<PrescriptionStatus> {
    match current {
        Some(PrescriptionStatus::Verified) if medicine_requires_prescription && !already_in_cart => {
            None
        }
        other => other,
    }
}
