use chrono::NaiveDate;
use common::{CustomerId, Money, NewOrder, NewOrderLine, OrderStatus, PaymentMethodId, ProductId};
use criterion::{Criterion, criterion_group, criterion_main};
use order_store::{InMemoryOrderRepository, OrderLineStore, OrderRepository, OrderStore, OrderTransaction};

fn make_order(customer: i64, status: OrderStatus) -> NewOrder {
    NewOrder {
        order_date: NaiveDate::from_ymd_opt(2025, 6, 23).unwrap(),
        customer_id: CustomerId::new(customer),
        status,
        discount_percent: 0.0,
        payment_method_id: PaymentMethodId::new(1),
        user_id: None,
        subtotal: Money::from_cents(1000),
        total: Money::from_cents(1000),
        shipping_address: None,
        shipping_city: Some("Santiago".to_string()),
        notes: None,
    }
}

async fn populate(repo: &InMemoryOrderRepository, orders: usize) {
    let mut tx = repo.begin().await.unwrap();
    for i in 0..orders {
        let status = if i % 2 == 0 {
            OrderStatus::Completed
        } else {
            OrderStatus::Pending
        };
        let order = tx
            .insert_order(make_order((i % 10) as i64, status))
            .await
            .unwrap();
        for product in 0..3 {
            tx.insert_line(NewOrderLine::new(
                order.id,
                ProductId::new(product),
                Money::from_cents(500),
                2,
            ))
            .await
            .unwrap();
        }
    }
    tx.commit().await.unwrap();
}

fn bench_insert_order_with_lines(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("order_store/insert_order_with_3_lines", |b| {
        b.iter(|| {
            rt.block_on(async {
                let repo = InMemoryOrderRepository::new();
                populate(&repo, 1).await;
            });
        });
    });
}

fn bench_sum_total_by_customer(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let repo = InMemoryOrderRepository::new();
    rt.block_on(populate(&repo, 1000));

    c.bench_function("order_store/sum_total_by_customer_1000_orders", |b| {
        b.iter(|| {
            rt.block_on(async {
                repo.sum_total_by_customer_where_status(CustomerId::new(4), OrderStatus::Completed)
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_best_selling_products(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let repo = InMemoryOrderRepository::new();
    rt.block_on(populate(&repo, 1000));

    c.bench_function("order_store/best_selling_products_3000_lines", |b| {
        b.iter(|| {
            rt.block_on(async {
                repo.best_selling_products().await.unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_insert_order_with_lines,
    bench_sum_total_by_customer,
    bench_best_selling_products,
);
criterion_main!(benches);
