//! Report row types.

use common::{CustomerId, Money, OrderStatus, ProductId};
use serde::{Deserialize, Serialize};

/// Number of orders shipped to one city.
///
/// `city` is `None` for orders without a shipping city.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityCount {
    pub city: Option<String>,
    pub order_count: u64,
}

/// Number of orders currently in one status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub order_count: u64,
}

/// Units of one product sold across all orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSales {
    pub product_id: ProductId,
    pub units_sold: u64,
}

/// Per-customer order statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSummary {
    pub customer_id: CustomerId,
    /// Orders in any status.
    pub order_count: u64,
    /// Sum of totals of completed orders only.
    pub completed_spend: Money,
}
