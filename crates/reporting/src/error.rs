//! Reporting error types.

use thiserror::Error;

/// Errors that can occur while building a report.
#[derive(Debug, Error)]
pub enum ReportingError {
    /// The underlying store failed.
    #[error("Storage failure: {0}")]
    Storage(#[from] order_store::StoreError),
}

/// Result type for reporting operations.
pub type Result<T> = std::result::Result<T, ReportingError>;
