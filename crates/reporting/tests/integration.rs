//! Integration tests for the reporting engine.
//!
//! Orders are written through the order service and read back through the
//! engine over the same in-memory repository.

use chrono::NaiveDate;
use common::{CustomerId, Money, OrderStatus, PaymentMethodId, ProductId};
use domain::{LineDraft, OrderDraft, OrderService};
use order_store::InMemoryOrderRepository;
use reporting::{CityCount, ProductSales, ReportingEngine};

struct Fixture {
    service: OrderService<InMemoryOrderRepository>,
    engine: ReportingEngine<InMemoryOrderRepository>,
}

impl Fixture {
    fn new() -> Self {
        let repo = InMemoryOrderRepository::new();
        Self {
            service: OrderService::new(repo.clone()),
            engine: ReportingEngine::new(repo),
        }
    }

    async fn order(
        &self,
        customer: i64,
        status: OrderStatus,
        city: Option<&str>,
        lines: Vec<LineDraft>,
    ) -> common::Order {
        let mut draft = OrderDraft::new(
            NaiveDate::from_ymd_opt(2025, 4, 2).unwrap(),
            CustomerId::new(customer),
            PaymentMethodId::new(1),
        )
        .with_status(status);
        if let Some(city) = city {
            draft = draft.shipped_to("Main St 1", city);
        }
        self.service.create(draft, lines).await.unwrap()
    }
}

fn line(product: i64, cents: i64, quantity: u32) -> LineDraft {
    LineDraft::new(ProductId::new(product), Money::from_cents(cents), quantity)
}

mod customer_reports {
    use super::*;

    #[tokio::test]
    async fn spend_counts_only_completed_orders() {
        let fx = Fixture::new();
        fx.order(7, OrderStatus::Completed, None, vec![line(1, 9000, 1)])
            .await;
        fx.order(7, OrderStatus::Pending, None, vec![line(2, 4000, 1)])
            .await;

        assert_eq!(
            fx.engine
                .total_spend_by_customer(CustomerId::new(7))
                .await
                .unwrap(),
            Money::from_dollars(90)
        );
        assert_eq!(
            fx.engine
                .order_count_by_customer(CustomerId::new(7))
                .await
                .unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn customer_without_completed_orders_spent_zero() {
        let fx = Fixture::new();
        fx.order(3, OrderStatus::Cancelled, None, vec![line(1, 500, 2)])
            .await;

        let summary = fx.engine.customer_summary(CustomerId::new(3)).await.unwrap();
        assert_eq!(summary.order_count, 1);
        assert_eq!(summary.completed_spend, Money::zero());

        let unknown = fx.engine.customer_summary(CustomerId::new(99)).await.unwrap();
        assert_eq!(unknown.order_count, 0);
        assert_eq!(unknown.completed_spend, Money::zero());
    }

    #[tokio::test]
    async fn status_change_moves_spend() {
        let fx = Fixture::new();
        let order = fx
            .order(5, OrderStatus::Shipped, None, vec![line(1, 1200, 1)])
            .await;
        assert_eq!(
            fx.engine
                .total_spend_by_customer(CustomerId::new(5))
                .await
                .unwrap(),
            Money::zero()
        );

        fx.service
            .update_status(order.id, OrderStatus::Completed)
            .await
            .unwrap();

        assert_eq!(
            fx.engine
                .total_spend_by_customer(CustomerId::new(5))
                .await
                .unwrap(),
            Money::from_cents(1200)
        );
    }
}

mod distributions {
    use super::*;

    #[tokio::test]
    async fn average_of_completed_orders() {
        let fx = Fixture::new();
        fx.order(1, OrderStatus::Completed, None, vec![line(1, 1000, 1)])
            .await;
        fx.order(2, OrderStatus::Completed, None, vec![line(1, 2001, 1)])
            .await;
        fx.order(3, OrderStatus::Pending, None, vec![line(1, 99999, 1)])
            .await;

        // 15.005 rounds half away from zero
        assert_eq!(
            fx.engine.average_total_of_completed_orders().await.unwrap(),
            Some(Money::from_cents(1501))
        );
    }

    #[tokio::test]
    async fn city_distribution_busiest_first() {
        let fx = Fixture::new();
        fx.order(1, OrderStatus::Pending, Some("Arica"), vec![]).await;
        fx.order(2, OrderStatus::Pending, Some("Osorno"), vec![]).await;
        fx.order(3, OrderStatus::Pending, None, vec![]).await;
        fx.order(4, OrderStatus::Pending, Some("Osorno"), vec![]).await;

        assert_eq!(
            fx.engine.distribution_by_city().await.unwrap(),
            vec![
                CityCount {
                    city: Some("Osorno".to_string()),
                    order_count: 2
                },
                CityCount {
                    city: Some("Arica".to_string()),
                    order_count: 1
                },
                CityCount {
                    city: None,
                    order_count: 1
                },
            ]
        );
    }

    #[tokio::test]
    async fn status_distribution_covers_every_status() {
        let fx = Fixture::new();
        for status in [
            OrderStatus::Completed,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ] {
            fx.order(1, status, None, vec![]).await;
        }

        let rows = fx.engine.distribution_by_status().await.unwrap();
        assert_eq!(
            rows.iter().map(|r| r.status).collect::<Vec<_>>(),
            OrderStatus::ALL.to_vec()
        );
        assert_eq!(rows.iter().map(|r| r.order_count).sum::<u64>(), 3);
        assert_eq!(rows[2].order_count, 2);
        assert_eq!(rows[3].order_count, 1);
    }
}

mod product_reports {
    use super::*;

    #[tokio::test]
    async fn best_sellers_include_cancelled_orders() {
        let fx = Fixture::new();
        fx.order(
            1,
            OrderStatus::Completed,
            None,
            vec![line(10, 100, 2), line(20, 100, 5)],
        )
        .await;
        fx.order(2, OrderStatus::Cancelled, None, vec![line(10, 100, 4)])
            .await;
        fx.order(3, OrderStatus::Pending, None, vec![line(30, 100, 1)])
            .await;

        assert_eq!(
            fx.engine.best_selling_products().await.unwrap(),
            vec![
                ProductSales {
                    product_id: ProductId::new(10),
                    units_sold: 6
                },
                ProductSales {
                    product_id: ProductId::new(20),
                    units_sold: 5
                },
                ProductSales {
                    product_id: ProductId::new(30),
                    units_sold: 1
                },
            ]
        );
    }

    #[tokio::test]
    async fn deleted_orders_stop_counting() {
        let fx = Fixture::new();
        let order = fx
            .order(1, OrderStatus::Completed, None, vec![line(10, 100, 3)])
            .await;
        fx.order(2, OrderStatus::Completed, None, vec![line(10, 100, 1)])
            .await;

        assert!(fx.service.delete(order.id).await.unwrap());

        let sales = fx
            .engine
            .units_sold_for_product(ProductId::new(10))
            .await
            .unwrap();
        assert_eq!(sales.units_sold, 1);
        assert_eq!(
            fx.engine
                .total_spend_by_customer(CustomerId::new(1))
                .await
                .unwrap(),
            Money::zero()
        );
    }
}
