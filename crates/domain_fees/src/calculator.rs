//! Amount calculation
//!
//! Turns a fee type's unit amount, a cadence and a discount into the gross,
//! discount and net figures stored on a fee.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::Money;

use crate::cadence::Cadence;
use crate::error::FeeError;

/// Amounts of a fee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeAmounts {
    /// Unit amount times billing periods
    pub total: Money,
    pub discount: Money,
    /// Total minus discount
    pub net: Money,
}

/// Unit amount times the cadence's billing periods
pub fn gross_amount(unit_amount: Money, cadence: Cadence) -> Result<Money, FeeError> {
    if unit_amount.is_negative() {
        return Err(FeeError::InvalidAmount(format!(
            "unit amount must not be negative, got {}",
            unit_amount
        )));
    }
    Ok(unit_amount.checked_mul(Decimal::from(cadence.billing_periods()))?)
}

/// Computes total, discount and net for a fee
///
/// Fails with `InvalidDiscount` if the discount is larger than the gross amount.
pub fn calculate(unit_amount: Money, cadence: Cadence, discount: Money) -> Result<FeeAmounts, FeeError> {
    if discount.is_negative() {
        return Err(FeeError::InvalidAmount(format!(
            "discount must not be negative, got {}",
            discount
        )));
    }

    let total = gross_amount(unit_amount, cadence)?;
    if discount > total {
        return Err(FeeError::InvalidDiscount { gross: total, discount });
    }

    Ok(FeeAmounts {
        total,
        discount,
        net: total.checked_sub(&discount)?,
    })
}
