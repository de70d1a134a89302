//! Order CRUD endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::NaiveDate;
use common::{
    CustomerId, Money, NewOrder, Order, OrderId, OrderLine, OrderStatus, PaymentMethodId,
    ProductId, UserId,
};
use domain::{LineDraft, OrderDraft, OrderError, OrderService};
use order_store::OrderRepository;
use reporting::ReportingEngine;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<R: OrderRepository> {
    pub order_service: OrderService<R>,
    pub reporting: ReportingEngine<R>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub order_date: NaiveDate,
    pub customer_id: i64,
    pub status: Option<String>,
    pub discount_percent: Option<f64>,
    pub payment_method_id: i64,
    pub user_id: Option<i64>,
    pub shipping_address: Option<String>,
    pub shipping_city: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub lines: Vec<LineRequest>,
}

#[derive(Deserialize)]
pub struct LineRequest {
    pub product_id: i64,
    pub unit_price_cents: i64,
    pub quantity: u32,
}

/// Full-record replacement. Totals are stored exactly as sent.
#[derive(Deserialize)]
pub struct ReplaceOrderRequest {
    pub order_date: NaiveDate,
    pub customer_id: i64,
    pub status: String,
    pub discount_percent: Option<f64>,
    pub payment_method_id: i64,
    pub user_id: Option<i64>,
    pub subtotal_cents: i64,
    pub total_cents: i64,
    pub shipping_address: Option<String>,
    pub shipping_city: Option<String>,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Deserialize)]
pub struct ReplaceLinesRequest {
    pub lines: Vec<LineRequest>,
}

/// Query filters for `GET /orders`; all present filters must match.
#[derive(Debug, Default, Deserialize)]
pub struct OrderFilter {
    pub customer_id: Option<i64>,
    pub status: Option<String>,
    pub city: Option<String>,
    pub user_id: Option<i64>,
    pub payment_method_id: Option<i64>,
    pub min_total_cents: Option<i64>,
    pub max_total_cents: Option<i64>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub order_date: NaiveDate,
    pub customer_id: i64,
    pub status: OrderStatus,
    pub discount_percent: f64,
    pub payment_method_id: i64,
    pub user_id: Option<i64>,
    pub subtotal_cents: i64,
    pub total_cents: i64,
    pub shipping_address: Option<String>,
    pub shipping_city: Option<String>,
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines: Option<Vec<LineResponse>>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id.to_string(),
            order_date: order.order_date,
            customer_id: order.customer_id.get(),
            status: order.status,
            discount_percent: order.discount_percent,
            payment_method_id: order.payment_method_id.get(),
            user_id: order.user_id.map(|u| u.get()),
            subtotal_cents: order.subtotal.cents(),
            total_cents: order.total.cents(),
            shipping_address: order.shipping_address,
            shipping_city: order.shipping_city,
            notes: order.notes,
            lines: None,
        }
    }
}

impl OrderResponse {
    fn with_lines(mut self, lines: Vec<OrderLine>) -> Self {
        self.lines = Some(lines.into_iter().map(LineResponse::from).collect());
        self
    }
}

#[derive(Serialize)]
pub struct LineResponse {
    pub id: String,
    pub order_id: String,
    pub product_id: i64,
    pub unit_price_cents: i64,
    pub quantity: u32,
    pub line_subtotal_cents: i64,
}

impl From<OrderLine> for LineResponse {
    fn from(line: OrderLine) -> Self {
        Self {
            id: line.id.to_string(),
            order_id: line.order_id.to_string(),
            product_id: line.product_id.get(),
            unit_price_cents: line.unit_price.cents(),
            quantity: line.quantity,
            line_subtotal_cents: line.line_subtotal.cents(),
        }
    }
}

#[derive(Serialize)]
pub struct CountResponse {
    pub count: u64,
}

// -- Handlers --

/// POST /orders: create an order together with its lines.
#[tracing::instrument(skip(state, payload))]
pub async fn create<R: OrderRepository + Clone + 'static>(
    State(state): State<Arc<AppState<R>>>,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let Json(req) = payload?;

    let mut draft = OrderDraft::new(
        req.order_date,
        CustomerId::new(req.customer_id),
        PaymentMethodId::new(req.payment_method_id),
    );
    if let Some(status) = req.status.as_deref() {
        draft = draft.with_status(parse_status(status)?);
    }
    draft.discount_percent = req.discount_percent;
    draft.user_id = req.user_id.map(UserId::new);
    draft.shipping_address = req.shipping_address;
    draft.shipping_city = req.shipping_city;
    draft.notes = req.notes;

    let order = state
        .order_service
        .create(draft, line_drafts(&req.lines))
        .await?;
    let lines = state.order_service.list_lines(order.id).await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderResponse::from(order).with_lines(lines)),
    ))
}

/// GET /orders/{id}: load an order with its lines.
#[tracing::instrument(skip(state))]
pub async fn get<R: OrderRepository + Clone + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state
        .order_service
        .get(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;
    let lines = state.order_service.list_lines(order_id).await?;

    Ok(Json(OrderResponse::from(order).with_lines(lines)))
}

/// GET /orders: list orders, optionally filtered.
#[tracing::instrument(skip(state, filter))]
pub async fn list<R: OrderRepository + Clone + 'static>(
    State(state): State<Arc<AppState<R>>>,
    filter: Result<Query<OrderFilter>, QueryRejection>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let Query(filter) = filter?;
    let status = filter.status.as_deref().map(parse_status).transpose()?;
    let service = &state.order_service;

    // Narrow with one store query, then apply the remaining filters.
    let mut orders = if let Some(customer_id) = filter.customer_id {
        service.find_by_customer(CustomerId::new(customer_id)).await?
    } else if let Some(status) = status {
        service.find_by_status(status).await?
    } else if let Some(city) = filter.city.as_deref() {
        service.find_by_city(city).await?
    } else if let Some(user_id) = filter.user_id {
        service.find_by_user(UserId::new(user_id)).await?
    } else if let Some(payment_method_id) = filter.payment_method_id {
        service
            .find_by_payment_method(PaymentMethodId::new(payment_method_id))
            .await?
    } else if filter.min_total_cents.is_some() || filter.max_total_cents.is_some() {
        let (min, max) = filter.total_range();
        service.find_by_total_between(min, max).await?
    } else {
        service.list_all().await?
    };
    orders.retain(|order| filter.matches(order, status));

    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// GET /orders/count: number of stored orders.
#[tracing::instrument(skip(state))]
pub async fn count<R: OrderRepository + Clone + 'static>(
    State(state): State<Arc<AppState<R>>>,
) -> Result<Json<CountResponse>, ApiError> {
    let count = state.order_service.count().await?;
    Ok(Json(CountResponse { count }))
}

/// PUT /orders/{id}: replace every field of an order except its ID.
#[tracing::instrument(skip(state, payload))]
pub async fn replace<R: OrderRepository + Clone + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
    payload: Result<Json<ReplaceOrderRequest>, JsonRejection>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let Json(req) = payload?;

    let replacement = NewOrder {
        order_date: req.order_date,
        customer_id: CustomerId::new(req.customer_id),
        status: parse_status(&req.status)?,
        discount_percent: req.discount_percent.unwrap_or(0.0),
        payment_method_id: PaymentMethodId::new(req.payment_method_id),
        user_id: req.user_id.map(UserId::new),
        subtotal: Money::from_cents(req.subtotal_cents),
        total: Money::from_cents(req.total_cents),
        shipping_address: req.shipping_address,
        shipping_city: req.shipping_city,
        notes: req.notes,
    };
    let order = state.order_service.update(order_id, replacement).await?;

    Ok(Json(OrderResponse::from(order)))
}

/// PATCH /orders/{id}/status: change the status of an order.
#[tracing::instrument(skip(state, payload))]
pub async fn update_status<R: OrderRepository + Clone + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let Json(req) = payload?;
    let status = parse_status(&req.status)?;

    let order = state.order_service.update_status(order_id, status).await?;
    Ok(Json(OrderResponse::from(order)))
}

/// GET /orders/{id}/lines: lines of an order.
#[tracing::instrument(skip(state))]
pub async fn lines<R: OrderRepository + Clone + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<LineResponse>>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let lines = state.order_service.list_lines(order_id).await?;
    Ok(Json(lines.into_iter().map(LineResponse::from).collect()))
}

/// PUT /orders/{id}/lines: replace the lines of an order and reprice it.
#[tracing::instrument(skip(state, payload))]
pub async fn replace_lines<R: OrderRepository + Clone + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
    payload: Result<Json<ReplaceLinesRequest>, JsonRejection>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let Json(req) = payload?;

    let order = state
        .order_service
        .replace_lines(order_id, line_drafts(&req.lines))
        .await?;
    let lines = state.order_service.list_lines(order_id).await?;

    Ok(Json(OrderResponse::from(order).with_lines(lines)))
}

/// DELETE /orders/{id}: delete an order and its lines.
#[tracing::instrument(skip(state))]
pub async fn delete<R: OrderRepository + Clone + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let order_id = parse_order_id(&id)?;

    if state.order_service.delete(order_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Order {id} not found")))
    }
}

impl OrderFilter {
    fn total_range(&self) -> (Money, Money) {
        (
            Money::from_cents(self.min_total_cents.unwrap_or(i64::MIN)),
            Money::from_cents(self.max_total_cents.unwrap_or(i64::MAX)),
        )
    }

    fn matches(&self, order: &Order, status: Option<OrderStatus>) -> bool {
        let (min, max) = self.total_range();
        self.customer_id.is_none_or(|c| order.customer_id.get() == c)
            && status.is_none_or(|s| order.status == s)
            && self
                .city
                .as_deref()
                .is_none_or(|c| order.shipping_city.as_deref() == Some(c))
            && self
                .user_id
                .is_none_or(|u| order.user_id.map(|id| id.get()) == Some(u))
            && self
                .payment_method_id
                .is_none_or(|p| order.payment_method_id.get() == p)
            && (min..=max).contains(&order.total)
    }
}

fn line_drafts(lines: &[LineRequest]) -> Vec<LineDraft> {
    lines
        .iter()
        .map(|line| {
            LineDraft::new(
                ProductId::new(line.product_id),
                Money::from_cents(line.unit_price_cents),
                line.quantity,
            )
        })
        .collect()
}

pub(crate) fn parse_status(status: &str) -> Result<OrderStatus, ApiError> {
    status
        .parse::<OrderStatus>()
        .map_err(|e| ApiError::from(OrderError::from(e)))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))?;
    Ok(OrderId::from_uuid(uuid))
}
