use async_trait::async_trait;
use chrono::NaiveDate;
use common::{
    CustomerId, Money, NewOrder, NewOrderLine, Order, OrderId, OrderLine, OrderLineId,
    OrderStatus, PaymentMethodId, ProductId, UserId,
};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Result, StoreError,
    store::{OrderLineStore, OrderRepository, OrderStore, OrderTransaction},
};

const ORDER_COLUMNS: &str = "id, order_date, customer_id, status, discount_percent, \
     payment_method_id, user_id, subtotal_cents, total_cents, shipping_address, shipping_city, notes";

const LINE_COLUMNS: &str =
    "id, order_id, product_id, unit_price_cents, quantity, line_subtotal_cents";

const UPSERT_ORDER: &str = r#"
    INSERT INTO orders (id, order_date, customer_id, status, discount_percent, payment_method_id,
                        user_id, subtotal_cents, total_cents, shipping_address, shipping_city, notes)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
    ON CONFLICT (id) DO UPDATE SET
        order_date = EXCLUDED.order_date,
        customer_id = EXCLUDED.customer_id,
        status = EXCLUDED.status,
        discount_percent = EXCLUDED.discount_percent,
        payment_method_id = EXCLUDED.payment_method_id,
        user_id = EXCLUDED.user_id,
        subtotal_cents = EXCLUDED.subtotal_cents,
        total_cents = EXCLUDED.total_cents,
        shipping_address = EXCLUDED.shipping_address,
        shipping_city = EXCLUDED.shipping_city,
        notes = EXCLUDED.notes
    "#;

// order_id is never updated: lines do not move between orders.
const UPSERT_LINE: &str = r#"
    INSERT INTO order_lines (id, order_id, product_id, unit_price_cents, quantity, line_subtotal_cents)
    VALUES ($1, $2, $3, $4, $5, $6)
    ON CONFLICT (id) DO UPDATE SET
        product_id = EXCLUDED.product_id,
        unit_price_cents = EXCLUDED.unit_price_cents,
        quantity = EXCLUDED.quantity,
        line_subtotal_cents = EXCLUDED.line_subtotal_cents
    "#;

/// PostgreSQL-backed order repository implementation.
#[derive(Clone)]
pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    /// Creates a new PostgreSQL order repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool to `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        tracing::info!(max_connections, "Connected to PostgreSQL");
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn fetch_orders(
        &self,
        filter: &str,
        bind: impl FnOnce(PgQuery<'_>) -> PgQuery<'_>,
    ) -> Result<Vec<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders {filter} ORDER BY seq ASC");
        let rows = bind(sqlx::query(&sql)).fetch_all(&self.pool).await?;
        rows.into_iter().map(row_to_order).collect()
    }

    async fn fetch_lines(
        &self,
        filter: &str,
        bind: impl FnOnce(PgQuery<'_>) -> PgQuery<'_>,
    ) -> Result<Vec<OrderLine>> {
        let sql = format!("SELECT {LINE_COLUMNS} FROM order_lines {filter} ORDER BY seq ASC");
        let rows = bind(sqlx::query(&sql)).fetch_all(&self.pool).await?;
        rows.into_iter().map(row_to_line).collect()
    }
}

type PgQuery<'q> = sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments>;

fn to_u64(value: i64, column: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| StoreError::InvalidRow(format!("negative {column}: {value}")))
}

fn row_to_order(row: PgRow) -> Result<Order> {
    let status: String = row.try_get("status")?;
    let status = status
        .parse::<OrderStatus>()
        .map_err(|e| StoreError::InvalidRow(e.to_string()))?;

    Ok(Order {
        id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
        order_date: row.try_get::<NaiveDate, _>("order_date")?,
        customer_id: CustomerId::new(row.try_get("customer_id")?),
        status,
        discount_percent: row.try_get("discount_percent")?,
        payment_method_id: PaymentMethodId::new(row.try_get("payment_method_id")?),
        user_id: row.try_get::<Option<i64>, _>("user_id")?.map(UserId::new),
        subtotal: Money::from_cents(row.try_get("subtotal_cents")?),
        total: Money::from_cents(row.try_get("total_cents")?),
        shipping_address: row.try_get("shipping_address")?,
        shipping_city: row.try_get("shipping_city")?,
        notes: row.try_get("notes")?,
    })
}

fn row_to_line(row: PgRow) -> Result<OrderLine> {
    let quantity: i32 = row.try_get("quantity")?;
    let quantity = u32::try_from(quantity)
        .map_err(|_| StoreError::InvalidRow(format!("negative quantity: {quantity}")))?;

    Ok(OrderLine {
        id: OrderLineId::from_uuid(row.try_get::<Uuid, _>("id")?),
        order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
        product_id: ProductId::new(row.try_get("product_id")?),
        unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
        quantity,
        line_subtotal: Money::from_cents(row.try_get("line_subtotal_cents")?),
    })
}

fn quantity_param(quantity: u32) -> Result<i32> {
    i32::try_from(quantity)
        .map_err(|_| StoreError::InvalidRow(format!("quantity out of range: {quantity}")))
}

#[async_trait]
impl OrderStore for PostgresOrderRepository {
    async fn find_order(&self, id: OrderId) -> Result<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let row: Option<PgRow> = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_order).transpose()
    }

    async fn order_exists(&self, id: OrderId) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM orders WHERE id = $1)")
            .bind(id.as_uuid())
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn find_all_orders(&self) -> Result<Vec<Order>> {
        self.fetch_orders("", |q| q).await
    }

    async fn find_orders_by_customer(&self, customer_id: CustomerId) -> Result<Vec<Order>> {
        self.fetch_orders("WHERE customer_id = $1", |q| q.bind(customer_id.get()))
            .await
    }

    async fn find_orders_by_status(&self, status: OrderStatus) -> Result<Vec<Order>> {
        self.fetch_orders("WHERE status = $1", |q| q.bind(status.as_str()))
            .await
    }

    async fn find_orders_by_city(&self, city: &str) -> Result<Vec<Order>> {
        let city = city.to_string();
        self.fetch_orders("WHERE shipping_city = $1", |q| q.bind(city))
            .await
    }

    async fn find_orders_by_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        self.fetch_orders("WHERE user_id = $1", |q| q.bind(user_id.get()))
            .await
    }

    async fn find_orders_by_payment_method(
        &self,
        payment_method_id: PaymentMethodId,
    ) -> Result<Vec<Order>> {
        self.fetch_orders("WHERE payment_method_id = $1", |q| {
            q.bind(payment_method_id.get())
        })
        .await
    }

    async fn find_orders_by_total_between(&self, min: Money, max: Money) -> Result<Vec<Order>> {
        self.fetch_orders("WHERE total_cents BETWEEN $1 AND $2", |q| {
            q.bind(min.cents()).bind(max.cents())
        })
        .await
    }

    async fn count_orders(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;
        to_u64(count, "count")
    }

    async fn count_orders_by_status(&self, status: OrderStatus) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE status = $1")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await?;
        to_u64(count, "count")
    }

    async fn count_orders_by_customer(&self, customer_id: CustomerId) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE customer_id = $1")
            .bind(customer_id.get())
            .fetch_one(&self.pool)
            .await?;
        to_u64(count, "count")
    }

    async fn sum_total_by_customer_where_status(
        &self,
        customer_id: CustomerId,
        status: OrderStatus,
    ) -> Result<Money> {
        let sum: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(total_cents), 0)::BIGINT FROM orders WHERE customer_id = $1 AND status = $2",
        )
        .bind(customer_id.get())
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(Money::from_cents(sum))
    }

    async fn average_total_where_status(&self, status: OrderStatus) -> Result<Option<Money>> {
        let average: Option<f64> = sqlx::query_scalar(
            "SELECT AVG(total_cents)::DOUBLE PRECISION FROM orders WHERE status = $1",
        )
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(average.map(|cents| Money::from_cents(cents.round() as i64)))
    }

    async fn count_orders_by_city(&self) -> Result<Vec<(Option<String>, u64)>> {
        let rows = sqlx::query(
            r#"
            SELECT shipping_city, COUNT(*) AS order_count
            FROM orders
            GROUP BY shipping_city
            ORDER BY order_count DESC, shipping_city ASC NULLS LAST
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<(Option<String>, u64)> {
                let city: Option<String> = row.try_get("shipping_city")?;
                let count = to_u64(row.try_get("order_count")?, "order_count")?;
                Ok((city, count))
            })
            .collect()
    }

    async fn count_orders_grouped_by_status(&self) -> Result<Vec<(OrderStatus, u64)>> {
        let rows = sqlx::query(
            "SELECT status, COUNT(*) AS order_count FROM orders GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut counts = rows
            .into_iter()
            .map(|row| -> Result<(OrderStatus, u64)> {
                let status: String = row.try_get("status")?;
                let status = status
                    .parse::<OrderStatus>()
                    .map_err(|e| StoreError::InvalidRow(e.to_string()))?;
                let count = to_u64(row.try_get("order_count")?, "order_count")?;
                Ok((status, count))
            })
            .collect::<Result<Vec<_>>>()?;
        counts.sort_by_key(|(status, _)| *status);
        Ok(counts)
    }
}

#[async_trait]
impl OrderLineStore for PostgresOrderRepository {
    async fn find_lines_by_order(&self, order_id: OrderId) -> Result<Vec<OrderLine>> {
        self.fetch_lines("WHERE order_id = $1", |q| q.bind(order_id.as_uuid()))
            .await
    }

    async fn find_lines_by_product(&self, product_id: ProductId) -> Result<Vec<OrderLine>> {
        self.fetch_lines("WHERE product_id = $1", |q| q.bind(product_id.get()))
            .await
    }

    async fn sum_quantity_by_product(&self, product_id: ProductId) -> Result<u64> {
        let sum: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity), 0)::BIGINT FROM order_lines WHERE product_id = $1",
        )
        .bind(product_id.get())
        .fetch_one(&self.pool)
        .await?;
        to_u64(sum, "quantity")
    }

    async fn best_selling_products(&self) -> Result<Vec<(ProductId, u64)>> {
        let rows = sqlx::query(
            r#"
            SELECT product_id, SUM(quantity)::BIGINT AS total_quantity
            FROM order_lines
            GROUP BY product_id
            ORDER BY total_quantity DESC, product_id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<(ProductId, u64)> {
                let product_id = ProductId::new(row.try_get("product_id")?);
                let quantity = to_u64(row.try_get("total_quantity")?, "total_quantity")?;
                Ok((product_id, quantity))
            })
            .collect()
    }
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    type Transaction = PostgresTransaction;

    async fn begin(&self) -> Result<PostgresTransaction> {
        let tx = self.pool.begin().await?;
        Ok(PostgresTransaction { tx })
    }
}

/// Transaction over [`PostgresOrderRepository`].
///
/// Dropping it without calling `commit` rolls the database transaction back.
pub struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl OrderTransaction for PostgresTransaction {
    async fn insert_order(&mut self, order: NewOrder) -> Result<Order> {
        self.save_order(order.with_id(OrderId::new())).await
    }

    async fn save_order(&mut self, order: Order) -> Result<Order> {
        sqlx::query(UPSERT_ORDER)
            .bind(order.id.as_uuid())
            .bind(order.order_date)
            .bind(order.customer_id.get())
            .bind(order.status.as_str())
            .bind(order.discount_percent)
            .bind(order.payment_method_id.get())
            .bind(order.user_id.map(|u| u.get()))
            .bind(order.subtotal.cents())
            .bind(order.total.cents())
            .bind(&order.shipping_address)
            .bind(&order.shipping_city)
            .bind(&order.notes)
            .execute(&mut *self.tx)
            .await?;
        Ok(order)
    }

    async fn find_order(&mut self, id: OrderId) -> Result<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let row: Option<PgRow> = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(row_to_order).transpose()
    }

    async fn delete_order(&mut self, id: OrderId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_line(&mut self, line: NewOrderLine) -> Result<OrderLine> {
        self.save_line(line.with_id(OrderLineId::new())).await
    }

    async fn save_line(&mut self, line: OrderLine) -> Result<OrderLine> {
        sqlx::query(UPSERT_LINE)
            .bind(line.id.as_uuid())
            .bind(line.order_id.as_uuid())
            .bind(line.product_id.get())
            .bind(line.unit_price.cents())
            .bind(quantity_param(line.quantity)?)
            .bind(line.line_subtotal.cents())
            .execute(&mut *self.tx)
            .await?;
        Ok(line)
    }

    async fn find_lines_by_order(&mut self, order_id: OrderId) -> Result<Vec<OrderLine>> {
        let sql =
            format!("SELECT {LINE_COLUMNS} FROM order_lines WHERE order_id = $1 ORDER BY seq ASC");
        let rows = sqlx::query(&sql)
            .bind(order_id.as_uuid())
            .fetch_all(&mut *self.tx)
            .await?;
        rows.into_iter().map(row_to_line).collect()
    }

    async fn delete_lines(&mut self, lines: &[OrderLine]) -> Result<()> {
        if lines.is_empty() {
            return Ok(());
        }
        let ids: Vec<Uuid> = lines.iter().map(|l| l.id.as_uuid()).collect();
        sqlx::query("DELETE FROM order_lines WHERE id = ANY($1)")
            .bind(ids)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
