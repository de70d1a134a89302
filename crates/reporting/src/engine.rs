//! Reporting engine: aggregate queries over orders and lines.

use common::{CustomerId, Money, OrderStatus, ProductId};
use order_store::{OrderLineStore, OrderRepository, OrderStore};

use crate::Result;
use crate::rows::{CityCount, CustomerSummary, ProductSales, StatusCount};

/// Read-only statistics over persisted orders.
///
/// Every query reads committed state straight from the repository; the
/// engine keeps no state of its own.
pub struct ReportingEngine<R: OrderRepository> {
    repository: R,
}

impl<R: OrderRepository> ReportingEngine<R> {
    /// Creates a new reporting engine over the given repository.
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    /// Realized spend of a customer: the sum of totals of their COMPLETED
    /// orders. Orders in any other status do not count.
    #[tracing::instrument(skip(self))]
    pub async fn total_spend_by_customer(&self, customer_id: CustomerId) -> Result<Money> {
        tracing::debug!("Summing completed spend");
        Ok(self
            .repository
            .sum_total_by_customer_where_status(customer_id, OrderStatus::Completed)
            .await?)
    }

    /// Number of orders a customer has placed, in any status.
    #[tracing::instrument(skip(self))]
    pub async fn order_count_by_customer(&self, customer_id: CustomerId) -> Result<u64> {
        Ok(self.repository.count_orders_by_customer(customer_id).await?)
    }

    /// Order count and completed spend for one customer.
    #[tracing::instrument(skip(self))]
    pub async fn customer_summary(&self, customer_id: CustomerId) -> Result<CustomerSummary> {
        let order_count = self.order_count_by_customer(customer_id).await?;
        let completed_spend = self.total_spend_by_customer(customer_id).await?;
        Ok(CustomerSummary {
            customer_id,
            order_count,
            completed_spend,
        })
    }

    /// Mean total of completed orders, or None when there are none.
    #[tracing::instrument(skip(self))]
    pub async fn average_total_of_completed_orders(&self) -> Result<Option<Money>> {
        Ok(self
            .repository
            .average_total_where_status(OrderStatus::Completed)
            .await?)
    }

    /// Order counts per shipping city, busiest city first.
    #[tracing::instrument(skip(self))]
    pub async fn distribution_by_city(&self) -> Result<Vec<CityCount>> {
        let rows = self.repository.count_orders_by_city().await?;
        tracing::debug!(cities = rows.len(), "City distribution computed");
        Ok(rows
            .into_iter()
            .map(|(city, order_count)| CityCount { city, order_count })
            .collect())
    }

    /// Order counts for every status, in lifecycle order.
    ///
    /// Statuses without orders are reported with a count of zero.
    #[tracing::instrument(skip(self))]
    pub async fn distribution_by_status(&self) -> Result<Vec<StatusCount>> {
        let counts = self.repository.count_orders_grouped_by_status().await?;
        Ok(OrderStatus::ALL
            .into_iter()
            .map(|status| StatusCount {
                status,
                order_count: counts
                    .iter()
                    .find(|(s, _)| *s == status)
                    .map_or(0, |(_, n)| *n),
            })
            .collect())
    }

    /// Products ranked by units sold, highest first.
    ///
    /// Lines of orders in every status count, cancelled ones included.
    #[tracing::instrument(skip(self))]
    pub async fn best_selling_products(&self) -> Result<Vec<ProductSales>> {
        let rows = self.repository.best_selling_products().await?;
        Ok(rows
            .into_iter()
            .map(|(product_id, units_sold)| ProductSales {
                product_id,
                units_sold,
            })
            .collect())
    }

    /// Units of one product sold; zero when it was never ordered.
    #[tracing::instrument(skip(self))]
    pub async fn units_sold_for_product(&self, product_id: ProductId) -> Result<ProductSales> {
        let units_sold = self.repository.sum_quantity_by_product(product_id).await?;
        Ok(ProductSales {
            product_id,
            units_sold,
        })
    }
}

impl<R: OrderRepository + Clone> Clone for ReportingEngine<R> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
        }
    }
}
