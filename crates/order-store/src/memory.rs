use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use async_trait::async_trait;
use common::{
    CustomerId, Money, NewOrder, NewOrderLine, Order, OrderId, OrderLine, OrderLineId,
    OrderStatus, PaymentMethodId, ProductId, UserId,
};
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

use crate::{
    Result, StoreError,
    store::{OrderLineStore, OrderRepository, OrderStore, OrderTransaction},
};

/// Both tables, kept in insertion order.
#[derive(Debug, Clone, Default)]
struct Tables {
    orders: Vec<Order>,
    lines: Vec<OrderLine>,
}

impl Tables {
    fn orders_where(&self, predicate: impl Fn(&Order) -> bool) -> Vec<Order> {
        self.orders.iter().filter(|o| predicate(o)).cloned().collect()
    }

    fn upsert_order(&mut self, order: Order) {
        match self.orders.iter_mut().find(|o| o.id == order.id) {
            Some(existing) => *existing = order,
            None => self.orders.push(order),
        }
    }

    fn upsert_line(&mut self, line: OrderLine) {
        match self.lines.iter_mut().find(|l| l.id == line.id) {
            Some(existing) => *existing = line,
            None => self.lines.push(line),
        }
    }
}

/// Sentinel meaning "never inject a failure".
const NO_FAULT: usize = usize::MAX;

/// In-memory order repository implementation for testing.
///
/// Provides the same interface and transactional behavior as the
/// PostgreSQL implementation. A transaction holds the write lock for its
/// whole lifetime and works on a private copy of the tables, so concurrent
/// readers see either none or all of its writes.
#[derive(Clone)]
pub struct InMemoryOrderRepository {
    tables: Arc<RwLock<Tables>>,
    fail_line_writes_after: Arc<AtomicUsize>,
}

impl Default for InMemoryOrderRepository {
    fn default() -> Self {
        Self {
            tables: Arc::default(),
            fail_line_writes_after: Arc::new(AtomicUsize::new(NO_FAULT)),
        }
    }
}

impl InMemoryOrderRepository {
    /// Creates a new empty in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of order rows stored.
    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }

    /// Returns the total number of line rows stored.
    pub async fn line_count(&self) -> usize {
        self.tables.read().await.lines.len()
    }

    /// Clears all orders and lines.
    pub async fn clear(&self) {
        let mut tables = self.tables.write().await;
        tables.orders.clear();
        tables.lines.clear();
    }

    /// Configures every later transaction to fail its line write once `n`
    /// lines have been written in it. Inserts, saves and deletions of lines
    /// all count as writes. `None` disables the fault.
    pub fn set_fail_line_writes_after(&self, n: Option<usize>) {
        self.fail_line_writes_after
            .store(n.unwrap_or(NO_FAULT), AtomicOrdering::SeqCst);
    }
}

/// Orders `None` after any named city.
fn compare_cities(a: &Option<String>, b: &Option<String>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderRepository {
    async fn find_order(&self, id: OrderId) -> Result<Option<Order>> {
        let tables = self.tables.read().await;
        Ok(tables.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn find_all_orders(&self) -> Result<Vec<Order>> {
        Ok(self.tables.read().await.orders.clone())
    }

    async fn find_orders_by_customer(&self, customer_id: CustomerId) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        Ok(tables.orders_where(|o| o.customer_id == customer_id))
    }

    async fn find_orders_by_status(&self, status: OrderStatus) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        Ok(tables.orders_where(|o| o.status == status))
    }

    async fn find_orders_by_city(&self, city: &str) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        Ok(tables.orders_where(|o| o.shipping_city.as_deref() == Some(city)))
    }

    async fn find_orders_by_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        Ok(tables.orders_where(|o| o.user_id == Some(user_id)))
    }

    async fn find_orders_by_payment_method(
        &self,
        payment_method_id: PaymentMethodId,
    ) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        Ok(tables.orders_where(|o| o.payment_method_id == payment_method_id))
    }

    async fn find_orders_by_total_between(&self, min: Money, max: Money) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        Ok(tables.orders_where(|o| o.total >= min && o.total <= max))
    }

    async fn count_orders(&self) -> Result<u64> {
        Ok(self.tables.read().await.orders.len() as u64)
    }

    async fn count_orders_by_status(&self, status: OrderStatus) -> Result<u64> {
        let tables = self.tables.read().await;
        Ok(tables.orders.iter().filter(|o| o.status == status).count() as u64)
    }

    async fn count_orders_by_customer(&self, customer_id: CustomerId) -> Result<u64> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .iter()
            .filter(|o| o.customer_id == customer_id)
            .count() as u64)
    }

    async fn sum_total_by_customer_where_status(
        &self,
        customer_id: CustomerId,
        status: OrderStatus,
    ) -> Result<Money> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .iter()
            .filter(|o| o.customer_id == customer_id && o.status == status)
            .map(|o| o.total)
            .sum())
    }

    async fn average_total_where_status(&self, status: OrderStatus) -> Result<Option<Money>> {
        let tables = self.tables.read().await;
        let totals: Vec<i64> = tables
            .orders
            .iter()
            .filter(|o| o.status == status)
            .map(|o| o.total.cents())
            .collect();

        if totals.is_empty() {
            return Ok(None);
        }
        let average = totals.iter().sum::<i64>() as f64 / totals.len() as f64;
        Ok(Some(Money::from_cents(average.round() as i64)))
    }

    async fn count_orders_by_city(&self) -> Result<Vec<(Option<String>, u64)>> {
        let tables = self.tables.read().await;
        let mut counts: HashMap<Option<String>, u64> = HashMap::new();
        for order in &tables.orders {
            *counts.entry(order.shipping_city.clone()).or_default() += 1;
        }

        let mut counts: Vec<_> = counts.into_iter().collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| compare_cities(&a.0, &b.0)));
        Ok(counts)
    }

    async fn count_orders_grouped_by_status(&self) -> Result<Vec<(OrderStatus, u64)>> {
        let tables = self.tables.read().await;
        let mut counts: HashMap<OrderStatus, u64> = HashMap::new();
        for order in &tables.orders {
            *counts.entry(order.status).or_default() += 1;
        }

        let mut counts: Vec<_> = counts.into_iter().collect();
        counts.sort_by_key(|(status, _)| *status);
        Ok(counts)
    }
}

#[async_trait]
impl OrderLineStore for InMemoryOrderRepository {
    async fn find_lines_by_order(&self, order_id: OrderId) -> Result<Vec<OrderLine>> {
        let tables = self.tables.read().await;
        Ok(tables
            .lines
            .iter()
            .filter(|l| l.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn find_lines_by_product(&self, product_id: ProductId) -> Result<Vec<OrderLine>> {
        let tables = self.tables.read().await;
        Ok(tables
            .lines
            .iter()
            .filter(|l| l.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn sum_quantity_by_product(&self, product_id: ProductId) -> Result<u64> {
        let tables = self.tables.read().await;
        Ok(tables
            .lines
            .iter()
            .filter(|l| l.product_id == product_id)
            .map(|l| u64::from(l.quantity))
            .sum())
    }

    async fn best_selling_products(&self) -> Result<Vec<(ProductId, u64)>> {
        let tables = self.tables.read().await;
        let mut totals: HashMap<ProductId, u64> = HashMap::new();
        for line in &tables.lines {
            *totals.entry(line.product_id).or_default() += u64::from(line.quantity);
        }

        let mut totals: Vec<_> = totals.into_iter().collect();
        totals.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        Ok(totals)
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    type Transaction = InMemoryTransaction;

    async fn begin(&self) -> Result<InMemoryTransaction> {
        let guard = self.tables.clone().write_owned().await;
        let working = (*guard).clone();
        Ok(InMemoryTransaction {
            guard,
            working,
            lines_written: 0,
            fail_line_writes_after: self.fail_line_writes_after.load(AtomicOrdering::SeqCst),
        })
    }
}

/// Transaction over [`InMemoryOrderRepository`].
///
/// Holds the repository's write lock until it is committed, rolled back or
/// dropped.
pub struct InMemoryTransaction {
    guard: OwnedRwLockWriteGuard<Tables>,
    working: Tables,
    lines_written: usize,
    fail_line_writes_after: usize,
}

impl InMemoryTransaction {
    fn check_line_write(&mut self) -> Result<()> {
        if self.lines_written >= self.fail_line_writes_after {
            return Err(StoreError::Unavailable(format!(
                "line write rejected after {} lines",
                self.lines_written
            )));
        }
        self.lines_written += 1;
        Ok(())
    }
}

#[async_trait]
impl OrderTransaction for InMemoryTransaction {
    async fn insert_order(&mut self, order: NewOrder) -> Result<Order> {
        let order = order.with_id(OrderId::new());
        self.working.orders.push(order.clone());
        Ok(order)
    }

    async fn save_order(&mut self, order: Order) -> Result<Order> {
        self.working.upsert_order(order.clone());
        Ok(order)
    }

    async fn find_order(&mut self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.working.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn delete_order(&mut self, id: OrderId) -> Result<bool> {
        let before = self.working.orders.len();
        self.working.orders.retain(|o| o.id != id);
        Ok(self.working.orders.len() < before)
    }

    async fn insert_line(&mut self, line: NewOrderLine) -> Result<OrderLine> {
        self.check_line_write()?;
        let line = line.with_id(OrderLineId::new());
        self.working.lines.push(line.clone());
        Ok(line)
    }

    async fn save_line(&mut self, line: OrderLine) -> Result<OrderLine> {
        self.check_line_write()?;
        self.working.upsert_line(line.clone());
        Ok(line)
    }

    async fn find_lines_by_order(&mut self, order_id: OrderId) -> Result<Vec<OrderLine>> {
        Ok(self
            .working
            .lines
            .iter()
            .filter(|l| l.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn delete_lines(&mut self, lines: &[OrderLine]) -> Result<()> {
        for _ in lines {
            self.check_line_write()?;
        }
        self.working
            .lines
            .retain(|l| !lines.iter().any(|doomed| doomed.id == l.id));
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        let Self {
            mut guard, working, ..
        } = self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}
