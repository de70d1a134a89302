use common::Money;

use super::{LineDraft, OrderError};

/// Subtotal and discounted total of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub total: Money,
}

impl OrderTotals {
    /// Prices a set of lines: the subtotal is the sum of line subtotals and
    /// the total is the subtotal less `discount_percent` percent, rounded to
    /// the cent.
    ///
    /// Fails with [`OrderError::AmountOverflow`] when a line subtotal or
    /// their sum leaves the money range.
    pub fn compute(lines: &[LineDraft], discount_percent: f64) -> Result<Self, OrderError> {
        let mut subtotal = Money::zero();
        for line in lines {
            subtotal = subtotal
                .checked_add(line.subtotal()?)
                .ok_or_else(|| OrderError::AmountOverflow("order subtotal".to_string()))?;
        }
        Ok(Self {
            subtotal,
            total: subtotal.apply_discount(discount_percent),
        })
    }
}

/// Checks that a discount is a finite percentage in `0..=100`.
pub fn validate_discount(percent: f64) -> Result<f64, OrderError> {
    if percent.is_finite() && (0.0..=100.0).contains(&percent) {
        Ok(percent)
    } else {
        Err(OrderError::InvalidDiscount { percent })
    }
}
