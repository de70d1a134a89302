//! Order service: the single writer of orders and their lines.

use std::time::Instant;

use common::{
    CustomerId, Money, NewOrder, NewOrderLine, Order, OrderId, OrderLine, OrderStatus,
    PaymentMethodId, UserId,
};
use order_store::{OrderLineStore, OrderRepository, OrderStore, OrderTransaction};

use crate::error::DomainError;

use super::{LineDraft, OrderDraft, OrderTotals, validate_discount};

/// Service for managing orders together with their lines.
///
/// Every operation that touches more than one row runs inside a single
/// store transaction. An early return drops the transaction, which rolls
/// back whatever it had written.
pub struct OrderService<R: OrderRepository> {
    repository: R,
}

impl<R: OrderRepository> OrderService<R> {
    /// Creates a new order service over the given repository.
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    /// Returns a reference to the underlying repository.
    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Creates an order and all of its lines atomically.
    ///
    /// Line subtotals, the order subtotal and the discounted total are
    /// computed here; the returned order carries its assigned ID.
    #[tracing::instrument(skip(self, draft, lines), fields(customer_id = %draft.customer_id, lines = lines.len()))]
    pub async fn create(
        &self,
        draft: OrderDraft,
        lines: Vec<LineDraft>,
    ) -> Result<Order, DomainError> {
        let started = Instant::now();

        let discount = validate_discount(draft.discount())?;
        for line in &lines {
            line.validate()?;
        }
        let totals = OrderTotals::compute(&lines, discount)?;

        let mut tx = self.repository.begin().await?;
        let order = tx.insert_order(draft.into_new_order(totals)).await?;
        for line in &lines {
            tx.insert_line(new_line(order.id, line)).await?;
        }
        tx.commit().await?;

        metrics::counter!("orders_created_total").increment(1);
        metrics::counter!("order_lines_written_total").increment(lines.len() as u64);
        metrics::histogram!("order_create_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        tracing::info!(order_id = %order.id, total = %order.total, "Order created");
        Ok(order)
    }

    /// Replaces every field of an existing order except its ID.
    ///
    /// Subtotal and total are taken as given and not recomputed from the
    /// order's lines. Lines are left untouched.
    #[tracing::instrument(skip(self, replacement))]
    pub async fn update(&self, order_id: OrderId, replacement: NewOrder) -> Result<Order, DomainError> {
        validate_discount(replacement.discount_percent)?;

        let mut tx = self.repository.begin().await?;
        let existing = tx
            .find_order(order_id)
            .await?
            .ok_or(DomainError::NotFound(order_id))?;
        let order = tx.save_order(existing.replace_with(replacement)).await?;
        tx.commit().await?;

        tracing::info!("Order updated");
        Ok(order)
    }

    /// Sets the status of an order, leaving every other field unchanged.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, DomainError> {
        let mut tx = self.repository.begin().await?;
        let mut order = tx
            .find_order(order_id)
            .await?
            .ok_or(DomainError::NotFound(order_id))?;
        let previous = order.status;
        order.status = status;
        let order = tx.save_order(order).await?;
        tx.commit().await?;

        metrics::counter!("order_status_updates_total", "status" => status.as_str())
            .increment(1);
        tracing::info!(from = %previous, to = %status, "Order status updated");
        Ok(order)
    }

    /// Deletes an order and all of its lines atomically.
    ///
    /// Returns false, without touching the store, if the order does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, order_id: OrderId) -> Result<bool, DomainError> {
        let mut tx = self.repository.begin().await?;
        if tx.find_order(order_id).await?.is_none() {
            tx.rollback().await?;
            return Ok(false);
        }

        let lines = tx.find_lines_by_order(order_id).await?;
        tx.delete_lines(&lines).await?;
        tx.delete_order(order_id).await?;
        tx.commit().await?;

        metrics::counter!("orders_deleted_total").increment(1);
        tracing::info!(lines = lines.len(), "Order deleted");
        Ok(true)
    }

    /// Lines of an order; empty when the order has none or does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn list_lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>, DomainError> {
        tracing::debug!("Listing order lines");
        Ok(self.repository.find_lines_by_order(order_id).await?)
    }

    /// Swaps the full set of lines of an order and reprices it.
    ///
    /// The order's stored discount is applied to the new subtotal. Old lines
    /// are removed, new lines inserted and the order saved in one transaction.
    #[tracing::instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn replace_lines(
        &self,
        order_id: OrderId,
        lines: Vec<LineDraft>,
    ) -> Result<Order, DomainError> {
        for line in &lines {
            line.validate()?;
        }

        let mut tx = self.repository.begin().await?;
        let mut order = tx
            .find_order(order_id)
            .await?
            .ok_or(DomainError::NotFound(order_id))?;
        let totals = OrderTotals::compute(&lines, order.discount_percent)?;

        let old_lines = tx.find_lines_by_order(order_id).await?;
        tx.delete_lines(&old_lines).await?;
        for line in &lines {
            tx.insert_line(new_line(order_id, line)).await?;
        }

        order.subtotal = totals.subtotal;
        order.total = totals.total;
        let order = tx.save_order(order).await?;
        tx.commit().await?;

        metrics::counter!("order_lines_written_total").increment(lines.len() as u64);
        tracing::info!(removed = old_lines.len(), total = %order.total, "Order lines replaced");
        Ok(order)
    }

    // Read-only passthroughs

    /// Loads an order by ID.
    ///
    /// Returns None if the order doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, order_id: OrderId) -> Result<Option<Order>, DomainError> {
        tracing::debug!("Loading order");
        Ok(self.repository.find_order(order_id).await?)
    }

    pub async fn list_all(&self) -> Result<Vec<Order>, DomainError> {
        Ok(self.repository.find_all_orders().await?)
    }

    pub async fn find_by_customer(&self, customer_id: CustomerId) -> Result<Vec<Order>, DomainError> {
        Ok(self.repository.find_orders_by_customer(customer_id).await?)
    }

    pub async fn find_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, DomainError> {
        Ok(self.repository.find_orders_by_status(status).await?)
    }

    pub async fn find_by_city(&self, city: &str) -> Result<Vec<Order>, DomainError> {
        Ok(self.repository.find_orders_by_city(city).await?)
    }

    pub async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Order>, DomainError> {
        Ok(self.repository.find_orders_by_user(user_id).await?)
    }

    pub async fn find_by_payment_method(
        &self,
        payment_method_id: PaymentMethodId,
    ) -> Result<Vec<Order>, DomainError> {
        Ok(self
            .repository
            .find_orders_by_payment_method(payment_method_id)
            .await?)
    }

    /// Orders whose total lies in `min..=max`.
    pub async fn find_by_total_between(
        &self,
        min: Money,
        max: Money,
    ) -> Result<Vec<Order>, DomainError> {
        Ok(self.repository.find_orders_by_total_between(min, max).await?)
    }

    pub async fn count(&self) -> Result<u64, DomainError> {
        Ok(self.repository.count_orders().await?)
    }
}

impl<R: OrderRepository + Clone> Clone for OrderService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
        }
    }
}

fn new_line(order_id: OrderId, line: &LineDraft) -> NewOrderLine {
    NewOrderLine::new(order_id, line.product_id, line.unit_price, line.quantity)
}
