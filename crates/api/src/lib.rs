//! HTTP API server for the order-processing core.
//!
//! Exposes order management and reporting endpoints over any
//! [`OrderRepository`], with structured logging (tracing) and Prometheus
//! metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use domain::OrderService;
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::OrderRepository;
use reporting::ReportingEngine;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<R: OrderRepository + Clone + 'static>(
    state: Arc<AppState<R>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    use routes::{health, orders, reports};

    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(health::check::<R>))
        .route("/orders", get(orders::list::<R>).post(orders::create::<R>))
        .route("/orders/count", get(orders::count::<R>))
        .route(
            "/orders/{id}",
            get(orders::get::<R>)
                .put(orders::replace::<R>)
                .delete(orders::delete::<R>),
        )
        .route(
            "/orders/{id}/status",
            axum::routing::patch(orders::update_status::<R>),
        )
        .route(
            "/orders/{id}/lines",
            get(orders::lines::<R>).put(orders::replace_lines::<R>),
        )
        .route("/reports/customers/{id}", get(reports::customer::<R>))
        .route("/reports/cities", get(reports::cities::<R>))
        .route("/reports/statuses", get(reports::statuses::<R>))
        .route(
            "/reports/completed-average",
            get(reports::completed_average::<R>),
        )
        .route("/reports/best-sellers", get(reports::best_sellers::<R>))
        .route(
            "/reports/products/{id}/units",
            get(reports::product_units::<R>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state over a repository.
///
/// The order service and the reporting engine share the same repository.
pub fn create_state<R: OrderRepository + Clone + 'static>(repository: R) -> Arc<AppState<R>> {
    Arc::new(AppState {
        order_service: OrderService::new(repository.clone()),
        reporting: ReportingEngine::new(repository),
    })
}
