//! Reporting over persisted orders.
//!
//! This crate provides the read-only side of the order core:
//! - [`ReportingEngine`] answering spend, count and distribution questions
//! - Serializable report rows ([`CityCount`], [`StatusCount`],
//!   [`ProductSales`], [`CustomerSummary`])
//!
//! Nothing here writes to the store.

pub mod engine;
pub mod error;
pub mod rows;

pub use engine::ReportingEngine;
pub use error::{ReportingError, Result};
pub use rows::{CityCount, CustomerSummary, ProductSales, StatusCount};
