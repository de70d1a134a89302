//! Order drafts, pricing and the aggregate service.

mod drafts;
mod pricing;
mod service;

pub use drafts::{LineDraft, MAX_QUANTITY, OrderDraft};
pub use pricing::{OrderTotals, validate_discount};
pub use service::OrderService;

use common::{Money, UnknownStatus};
use thiserror::Error;

/// Input rejected by the order rules.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Invalid quantity.
    #[error("Invalid quantity: {quantity} (must be between 1 and {max})", max = MAX_QUANTITY)]
    InvalidQuantity { quantity: u32 },

    /// Invalid price.
    #[error("Invalid price: {price} (must not be negative)")]
    InvalidPrice { price: Money },

    /// Discount outside the accepted range.
    #[error("Invalid discount: {percent} (must be between 0 and 100)")]
    InvalidDiscount { percent: f64 },

    /// A line subtotal or order subtotal does not fit in the money range.
    #[error("Amount overflow: {0}")]
    AmountOverflow(String),

    /// Unrecognized status text.
    #[error(transparent)]
    UnknownStatus(#[from] UnknownStatus),
}
