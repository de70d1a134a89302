use async_trait::async_trait;
use common::{
    CustomerId, Money, NewOrder, NewOrderLine, Order, OrderId, OrderLine, OrderStatus,
    PaymentMethodId, ProductId, UserId,
};

use crate::Result;

/// Read access to committed orders.
///
/// Finders return an empty vector when nothing matches; they never fail
/// because of absence. Results come back in insertion order.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Retrieves an order by ID.
    async fn find_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Returns true if an order with this ID exists.
    async fn order_exists(&self, id: OrderId) -> Result<bool> {
        Ok(self.find_order(id).await?.is_some())
    }

    /// Retrieves every order.
    async fn find_all_orders(&self) -> Result<Vec<Order>>;

    async fn find_orders_by_customer(&self, customer_id: CustomerId) -> Result<Vec<Order>>;

    async fn find_orders_by_status(&self, status: OrderStatus) -> Result<Vec<Order>>;

    async fn find_orders_by_city(&self, city: &str) -> Result<Vec<Order>>;

    async fn find_orders_by_user(&self, user_id: UserId) -> Result<Vec<Order>>;

    async fn find_orders_by_payment_method(
        &self,
        payment_method_id: PaymentMethodId,
    ) -> Result<Vec<Order>>;

    /// Retrieves orders whose total lies in `min..=max`.
    async fn find_orders_by_total_between(&self, min: Money, max: Money) -> Result<Vec<Order>>;

    async fn count_orders(&self) -> Result<u64>;

    async fn count_orders_by_status(&self, status: OrderStatus) -> Result<u64>;

    async fn count_orders_by_customer(&self, customer_id: CustomerId) -> Result<u64>;

    /// Sums order totals for a customer restricted to one status.
    ///
    /// Returns zero when no order matches.
    async fn sum_total_by_customer_where_status(
        &self,
        customer_id: CustomerId,
        status: OrderStatus,
    ) -> Result<Money>;

    /// Average order total for a status, rounded to the cent.
    ///
    /// Returns None when no order has that status.
    async fn average_total_where_status(&self, status: OrderStatus) -> Result<Option<Money>>;

    /// Order counts per shipping city, most orders first.
    ///
    /// Ties are broken by city name; orders without a city form their own
    /// group which sorts after named cities with the same count.
    async fn count_orders_by_city(&self) -> Result<Vec<(Option<String>, u64)>>;

    /// Order counts per status. Statuses with no orders are omitted.
    async fn count_orders_grouped_by_status(&self) -> Result<Vec<(OrderStatus, u64)>>;
}

/// Read access to committed order lines.
#[async_trait]
pub trait OrderLineStore: Send + Sync {
    /// Retrieves the lines owned by an order, in insertion order.
    async fn find_lines_by_order(&self, order_id: OrderId) -> Result<Vec<OrderLine>>;

    async fn find_lines_by_product(&self, product_id: ProductId) -> Result<Vec<OrderLine>>;

    /// Total units of a product across all lines; zero when it was never ordered.
    async fn sum_quantity_by_product(&self, product_id: ProductId) -> Result<u64>;

    /// Units sold per product across orders of every status.
    ///
    /// Sorted by quantity descending, then product ID ascending.
    async fn best_selling_products(&self) -> Result<Vec<(ProductId, u64)>>;
}

/// A unit of work over orders and their lines.
///
/// Writes made through a transaction become visible to other readers only
/// once [`commit`](OrderTransaction::commit) succeeds. Dropping a transaction
/// without committing discards all of its writes.
#[async_trait]
pub trait OrderTransaction: Send {
    /// Inserts a new order, assigning it a fresh ID.
    async fn insert_order(&mut self, order: NewOrder) -> Result<Order>;

    /// Writes an order under its existing ID, overwriting any previous row.
    async fn save_order(&mut self, order: Order) -> Result<Order>;

    /// Retrieves an order as seen from inside this transaction.
    async fn find_order(&mut self, id: OrderId) -> Result<Option<Order>>;

    /// Deletes an order row. Returns false if it did not exist.
    async fn delete_order(&mut self, id: OrderId) -> Result<bool>;

    /// Inserts a new line, assigning it a fresh ID.
    async fn insert_line(&mut self, line: NewOrderLine) -> Result<OrderLine>;

    /// Writes a line under its existing ID, overwriting any previous row.
    async fn save_line(&mut self, line: OrderLine) -> Result<OrderLine>;

    async fn find_lines_by_order(&mut self, order_id: OrderId) -> Result<Vec<OrderLine>>;

    /// Deletes the given lines.
    async fn delete_lines(&mut self, lines: &[OrderLine]) -> Result<()>;

    /// Makes every write in this transaction visible.
    async fn commit(self) -> Result<()>;

    /// Discards every write in this transaction.
    async fn rollback(self) -> Result<()>;
}

/// Core trait for order storage backends.
///
/// Reads go straight to committed state; every write goes through a
/// transaction obtained from [`begin`](OrderRepository::begin).
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait OrderRepository: OrderStore + OrderLineStore {
    /// The unit-of-work type handed out by this backend.
    type Transaction: OrderTransaction;

    /// Opens a new transaction.
    async fn begin(&self) -> Result<Self::Transaction>;
}
