//! Subtotal/tax/total derivation shared by estimates and invoices.

use rust_decimal::Decimal;
use service_core::error::AppError;

use crate::models::NewLineItem;

/// The three derived amounts carried by every document header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentTotals {
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

/// Derive subtotal, tax amount, and total for a batch of line items.
///
/// Line item totals are summed verbatim; the per-item `quantity * unit_price`
/// product is not recomputed. The tax amount is rounded to cents. Fails when
/// `line_items` is empty.
pub fn compute_totals(
    line_items: &[NewLineItem],
    tax_rate: Decimal,
) -> Result<DocumentTotals, AppError> {
    if line_items.is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "At least one line item is required"
        )));
    }

    let subtotal: Decimal = line_items.iter().map(|item| item.total).sum();
    let tax_amount = (subtotal * tax_rate / Decimal::ONE_HUNDRED).round_dp(2);
    let total = subtotal + tax_amount;

    Ok(DocumentTotals {
        subtotal,
        tax_amount,
        total,
    })
}
