//! Domain error types.

use common::OrderId;
use order_store::StoreError;
use thiserror::Error;

use crate::order::OrderError;

/// Errors that can occur during domain operations.
///
/// Absence, malformed input and storage failures are kept apart so callers
/// can report each one differently.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The referenced order does not exist.
    #[error("Order not found: {0}")]
    NotFound(OrderId),

    /// The request carried values the order rules reject.
    #[error("Invalid argument: {0}")]
    InvalidArgument(#[from] OrderError),

    /// The store failed; nothing from the failed call was committed.
    #[error("Storage failure: {0}")]
    Storage(#[from] StoreError),
}
