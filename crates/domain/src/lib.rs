//! Domain layer for the order-processing core.
//!
//! This crate provides:
//! - Order and line drafts as submitted by callers
//! - Pricing of line subtotals, order subtotal and discounted total
//! - [`OrderService`], the only writer of orders and order lines, which
//!   runs every multi-row change inside one store transaction

pub mod error;
pub mod order;

pub use error::DomainError;
pub use order::{
    LineDraft, MAX_QUANTITY, OrderDraft, OrderError, OrderService, OrderTotals, validate_discount,
};
