//! Reporting endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use common::{CustomerId, ProductId};
use order_store::OrderRepository;
use reporting::{CityCount, CustomerSummary, ProductSales, StatusCount};
use serde::{Deserialize, Serialize};

use super::orders::AppState;
use crate::error::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct BestSellersQuery {
    /// Keep only the first `limit` products.
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct AverageResponse {
    /// None when no order is completed.
    pub average_total_cents: Option<i64>,
}

/// GET /reports/customers/{id}: order count and completed spend of a customer.
#[tracing::instrument(skip(state))]
pub async fn customer<R: OrderRepository + Clone + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<i64>,
) -> Result<Json<CustomerSummary>, ApiError> {
    let summary = state.reporting.customer_summary(CustomerId::new(id)).await?;
    Ok(Json(summary))
}

/// GET /reports/cities: order counts per shipping city.
#[tracing::instrument(skip(state))]
pub async fn cities<R: OrderRepository + Clone + 'static>(
    State(state): State<Arc<AppState<R>>>,
) -> Result<Json<Vec<CityCount>>, ApiError> {
    Ok(Json(state.reporting.distribution_by_city().await?))
}

/// GET /reports/statuses: order counts for every status.
#[tracing::instrument(skip(state))]
pub async fn statuses<R: OrderRepository + Clone + 'static>(
    State(state): State<Arc<AppState<R>>>,
) -> Result<Json<Vec<StatusCount>>, ApiError> {
    Ok(Json(state.reporting.distribution_by_status().await?))
}

/// GET /reports/completed-average: mean total of completed orders.
#[tracing::instrument(skip(state))]
pub async fn completed_average<R: OrderRepository + Clone + 'static>(
    State(state): State<Arc<AppState<R>>>,
) -> Result<Json<AverageResponse>, ApiError> {
    let average = state.reporting.average_total_of_completed_orders().await?;
    Ok(Json(AverageResponse {
        average_total_cents: average.map(|m| m.cents()),
    }))
}

/// GET /reports/best-sellers: products ranked by units sold.
#[tracing::instrument(skip(state, query))]
pub async fn best_sellers<R: OrderRepository + Clone + 'static>(
    State(state): State<Arc<AppState<R>>>,
    query: Result<Query<BestSellersQuery>, QueryRejection>,
) -> Result<Json<Vec<ProductSales>>, ApiError> {
    let Query(query) = query?;
    let mut rows = state.reporting.best_selling_products().await?;
    if let Some(limit) = query.limit {
        rows.truncate(limit);
    }
    Ok(Json(rows))
}

/// GET /reports/products/{id}/units: units sold of one product.
#[tracing::instrument(skip(state))]
pub async fn product_units<R: OrderRepository + Clone + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<i64>,
) -> Result<Json<ProductSales>, ApiError> {
    let sales = state
        .reporting
        .units_sold_for_product(ProductId::new(id))
        .await?;
    Ok(Json(sales))
}
