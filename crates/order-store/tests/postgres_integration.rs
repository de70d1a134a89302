//! PostgreSQL integration tests
//!
//! These tests share one PostgreSQL container and truncate the tables before
//! each test, so they run serially. Run with:
//!
//! ```bash
//! cargo test -p order-store --test postgres_integration
//! ```

use std::sync::Arc;

use chrono::NaiveDate;
use common::{
    CustomerId, Money, NewOrder, NewOrderLine, OrderId, OrderStatus, PaymentMethodId, ProductId,
    UserId,
};
use order_store::{
    OrderLineStore, OrderRepository, OrderStore, OrderTransaction, PostgresOrderRepository,
};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            PostgresOrderRepository::new(temp_pool.clone())
                .run_migrations()
                .await
                .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh repository with its own pool and emptied tables
async fn get_test_repo() -> PostgresOrderRepository {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE order_lines, orders")
        .execute(&pool)
        .await
        .unwrap();

    PostgresOrderRepository::new(pool)
}

fn new_order(customer: i64, status: OrderStatus, total_cents: i64, city: Option<&str>) -> NewOrder {
    NewOrder {
        order_date: NaiveDate::from_ymd_opt(2025, 6, 23).unwrap(),
        customer_id: CustomerId::new(customer),
        status,
        discount_percent: 0.0,
        payment_method_id: PaymentMethodId::new(1),
        user_id: Some(UserId::new(2)),
        subtotal: Money::from_cents(total_cents),
        total: Money::from_cents(total_cents),
        shipping_address: Some("Av. Providencia 1234".to_string()),
        shipping_city: city.map(String::from),
        notes: None,
    }
}

fn line(order_id: OrderId, product: i64, unit_cents: i64, quantity: u32) -> NewOrderLine {
    NewOrderLine::new(order_id, ProductId::new(product), Money::from_cents(unit_cents), quantity)
}

#[tokio::test]
#[serial]
async fn insert_and_read_back_order_with_lines() {
    let repo = get_test_repo().await;

    let mut tx = repo.begin().await.unwrap();
    let order = tx
        .insert_order(new_order(1, OrderStatus::Pending, 13000, Some("Santiago")))
        .await
        .unwrap();
    let first = tx.insert_line(line(order.id, 10, 5000, 2)).await.unwrap();
    let second = tx.insert_line(line(order.id, 20, 3000, 1)).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(repo.find_order(order.id).await.unwrap(), Some(order.clone()));
    assert!(repo.order_exists(order.id).await.unwrap());
    assert_eq!(
        repo.find_lines_by_order(order.id).await.unwrap(),
        vec![first, second]
    );
}

#[tokio::test]
#[serial]
async fn uncommitted_writes_are_invisible_and_rolled_back() {
    let repo = get_test_repo().await;

    let mut tx = repo.begin().await.unwrap();
    let order = tx
        .insert_order(new_order(1, OrderStatus::Pending, 100, None))
        .await
        .unwrap();
    tx.insert_line(line(order.id, 1, 100, 1)).await.unwrap();

    assert!(repo.find_order(order.id).await.unwrap().is_none());
    tx.rollback().await.unwrap();

    assert!(repo.find_order(order.id).await.unwrap().is_none());
    assert!(repo.find_lines_by_order(order.id).await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn delete_lines_then_order_in_one_transaction() {
    let repo = get_test_repo().await;

    let mut tx = repo.begin().await.unwrap();
    let order = tx
        .insert_order(new_order(1, OrderStatus::Pending, 100, None))
        .await
        .unwrap();
    tx.insert_line(line(order.id, 1, 100, 1)).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = repo.begin().await.unwrap();
    let lines = tx.find_lines_by_order(order.id).await.unwrap();
    tx.delete_lines(&lines).await.unwrap();
    assert!(tx.delete_order(order.id).await.unwrap());
    tx.commit().await.unwrap();

    assert!(!repo.order_exists(order.id).await.unwrap());
    assert!(repo.find_lines_by_order(order.id).await.unwrap().is_empty());

    let mut tx = repo.begin().await.unwrap();
    assert!(!tx.delete_order(order.id).await.unwrap());
}

#[tokio::test]
#[serial]
async fn save_order_overwrites_by_id() {
    let repo = get_test_repo().await;

    let mut tx = repo.begin().await.unwrap();
    let mut order = tx
        .insert_order(new_order(1, OrderStatus::Pending, 100, None))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    order.status = OrderStatus::Shipped;
    order.notes = Some("Fragile".to_string());
    let mut tx = repo.begin().await.unwrap();
    tx.save_order(order.clone()).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(repo.count_orders().await.unwrap(), 1);
    assert_eq!(repo.find_order(order.id).await.unwrap(), Some(order));
}

#[tokio::test]
#[serial]
async fn aggregate_queries() {
    let repo = get_test_repo().await;

    let mut tx = repo.begin().await.unwrap();
    let completed = tx
        .insert_order(new_order(7, OrderStatus::Completed, 9000, Some("Santiago")))
        .await
        .unwrap();
    let pending = tx
        .insert_order(new_order(7, OrderStatus::Pending, 4000, Some("Santiago")))
        .await
        .unwrap();
    tx.insert_order(new_order(8, OrderStatus::Completed, 3000, None))
        .await
        .unwrap();
    tx.insert_line(line(completed.id, 10, 1000, 4)).await.unwrap();
    tx.insert_line(line(pending.id, 20, 1000, 4)).await.unwrap();
    tx.insert_line(line(pending.id, 30, 1000, 1)).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(
        repo.sum_total_by_customer_where_status(CustomerId::new(7), OrderStatus::Completed)
            .await
            .unwrap(),
        Money::from_cents(9000)
    );
    assert_eq!(
        repo.sum_total_by_customer_where_status(CustomerId::new(99), OrderStatus::Completed)
            .await
            .unwrap(),
        Money::zero()
    );
    assert_eq!(repo.count_orders_by_customer(CustomerId::new(7)).await.unwrap(), 2);
    assert_eq!(repo.count_orders_by_status(OrderStatus::Completed).await.unwrap(), 2);
    assert_eq!(
        repo.average_total_where_status(OrderStatus::Completed)
            .await
            .unwrap(),
        Some(Money::from_cents(6000))
    );
    assert_eq!(
        repo.average_total_where_status(OrderStatus::Shipped)
            .await
            .unwrap(),
        None
    );
    assert_eq!(
        repo.count_orders_by_city().await.unwrap(),
        vec![(Some("Santiago".to_string()), 2), (None, 1)]
    );
    assert_eq!(
        repo.count_orders_grouped_by_status().await.unwrap(),
        vec![(OrderStatus::Pending, 1), (OrderStatus::Completed, 2)]
    );
    assert_eq!(
        repo.best_selling_products().await.unwrap(),
        vec![
            (ProductId::new(10), 4),
            (ProductId::new(20), 4),
            (ProductId::new(30), 1)
        ]
    );
    assert_eq!(repo.sum_quantity_by_product(ProductId::new(99)).await.unwrap(), 0);
}

#[tokio::test]
#[serial]
async fn finders_filter_and_keep_insertion_order() {
    let repo = get_test_repo().await;

    let mut tx = repo.begin().await.unwrap();
    let mut ids = Vec::new();
    for cents in [500, 1000, 1500, 2000, 2500] {
        let order = tx
            .insert_order(new_order(1, OrderStatus::Pending, cents, Some("Arica")))
            .await
            .unwrap();
        ids.push(order.id);
    }
    tx.commit().await.unwrap();

    let in_range = repo
        .find_orders_by_total_between(Money::from_cents(1000), Money::from_cents(2000))
        .await
        .unwrap();
    assert_eq!(
        in_range.iter().map(|o| o.id).collect::<Vec<_>>(),
        ids[1..4].to_vec()
    );

    assert_eq!(repo.find_orders_by_city("Arica").await.unwrap().len(), 5);
    assert!(repo.find_orders_by_city("Iquique").await.unwrap().is_empty());
    assert_eq!(repo.find_orders_by_user(UserId::new(2)).await.unwrap().len(), 5);
    assert_eq!(
        repo.find_orders_by_payment_method(PaymentMethodId::new(1))
            .await
            .unwrap()
            .len(),
        5
    );
    assert!(
        repo.find_orders_by_status(OrderStatus::Cancelled)
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(repo.find_all_orders().await.unwrap().len(), 5);
}
