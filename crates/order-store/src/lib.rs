//! Persistence for orders and their lines.
//!
//! Reads are exposed through [`OrderStore`] and [`OrderLineStore`]; every
//! write goes through an [`OrderTransaction`] obtained from
//! [`OrderRepository::begin`], so multi-row changes commit or roll back as a
//! unit.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::{InMemoryOrderRepository, InMemoryTransaction};
pub use postgres::{PostgresOrderRepository, PostgresTransaction};
pub use store::{OrderLineStore, OrderRepository, OrderStore, OrderTransaction};
