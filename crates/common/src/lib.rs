//! Shared types for the order-processing core.
//!
//! Identifiers, money, order status and the persisted order / order-line
//! records used by the store, domain and reporting crates.

mod money;
mod order;
mod status;
mod types;

pub use money::Money;
pub use order::{NewOrder, NewOrderLine, Order, OrderLine};
pub use status::{OrderStatus, UnknownStatus};
pub use types::{CustomerId, OrderId, OrderLineId, PaymentMethodId, ProductId, UserId};
