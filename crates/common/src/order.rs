//! Persisted order and order-line records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{CustomerId, Money, OrderId, OrderLineId, OrderStatus, PaymentMethodId, ProductId, UserId};

/// An order row that has not been assigned an ID yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub order_date: NaiveDate,
    pub customer_id: CustomerId,
    pub status: OrderStatus,
    /// Percentage off the subtotal, 0 through 100.
    pub discount_percent: f64,
    pub payment_method_id: PaymentMethodId,
    pub user_id: Option<UserId>,
    /// Sum of the line subtotals.
    pub subtotal: Money,
    /// Subtotal with the discount applied.
    pub total: Money,
    pub shipping_address: Option<String>,
    pub shipping_city: Option<String>,
    pub notes: Option<String>,
}

impl NewOrder {
    /// Attaches a store-assigned ID, producing the persisted record.
    pub fn with_id(self, id: OrderId) -> Order {
        Order {
            id,
            order_date: self.order_date,
            customer_id: self.customer_id,
            status: self.status,
            discount_percent: self.discount_percent,
            payment_method_id: self.payment_method_id,
            user_id: self.user_id,
            subtotal: self.subtotal,
            total: self.total,
            shipping_address: self.shipping_address,
            shipping_city: self.shipping_city,
            notes: self.notes,
        }
    }
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_date: NaiveDate,
    pub customer_id: CustomerId,
    pub status: OrderStatus,
    pub discount_percent: f64,
    pub payment_method_id: PaymentMethodId,
    pub user_id: Option<UserId>,
    pub subtotal: Money,
    pub total: Money,
    pub shipping_address: Option<String>,
    pub shipping_city: Option<String>,
    pub notes: Option<String>,
}

impl Order {
    /// Replaces every field except the ID with the contents of `replacement`.
    pub fn replace_with(self, replacement: NewOrder) -> Order {
        replacement.with_id(self.id)
    }
}

/// An order line that has not been assigned an ID yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderLine {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub unit_price: Money,
    pub quantity: u32,
    /// `unit_price * quantity`.
    pub line_subtotal: Money,
}

impl NewOrderLine {
    /// Builds a line for `order_id`, deriving the line subtotal.
    pub fn new(order_id: OrderId, product_id: ProductId, unit_price: Money, quantity: u32) -> Self {
        Self {
            order_id,
            product_id,
            unit_price,
            quantity,
            line_subtotal: unit_price.multiply(quantity),
        }
    }

    pub fn with_id(self, id: OrderLineId) -> OrderLine {
        OrderLine {
            id,
            order_id: self.order_id,
            product_id: self.product_id,
            unit_price: self.unit_price,
            quantity: self.quantity,
            line_subtotal: self.line_subtotal,
        }
    }
}

/// A persisted order line. Belongs to exactly one order for its whole life.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: OrderLineId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub unit_price: Money,
    pub quantity: u32,
    pub line_subtotal: Money,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_new_order() -> NewOrder {
        NewOrder {
            order_date: NaiveDate::from_ymd_opt(2025, 6, 23).unwrap(),
            customer_id: CustomerId::new(1),
            status: OrderStatus::Pending,
            discount_percent: 10.0,
            payment_method_id: PaymentMethodId::new(1),
            user_id: Some(UserId::new(3)),
            subtotal: Money::from_dollars(130),
            total: Money::from_dollars(117),
            shipping_address: Some("Av. Providencia 1234".to_string()),
            shipping_city: Some("Santiago".to_string()),
            notes: None,
        }
    }

    #[test]
    fn with_id_keeps_every_field() {
        let draft = sample_new_order();
        let id = OrderId::new();
        let order = draft.clone().with_id(id);

        assert_eq!(order.id, id);
        assert_eq!(order.customer_id, draft.customer_id);
        assert_eq!(order.total, draft.total);
        assert_eq!(order.shipping_city, draft.shipping_city);
    }

    #[test]
    fn replace_with_preserves_id() {
        let order = sample_new_order().with_id(OrderId::new());
        let id = order.id;

        let mut replacement = sample_new_order();
        replacement.notes = Some("Leave at the door".to_string());
        replacement.status = OrderStatus::Shipped;

        let replaced = order.replace_with(replacement);
        assert_eq!(replaced.id, id);
        assert_eq!(replaced.status, OrderStatus::Shipped);
        assert_eq!(replaced.notes.as_deref(), Some("Leave at the door"));
    }

    #[test]
    fn new_line_derives_subtotal() {
        let line = NewOrderLine::new(OrderId::new(), ProductId::new(101), Money::from_cents(2599), 2);
        assert_eq!(line.line_subtotal.cents(), 5198);
    }

    #[test]
    fn order_date_serializes_as_calendar_date() {
        let json = serde_json::to_value(sample_new_order()).unwrap();
        assert_eq!(json["order_date"], "2025-06-23");
        assert_eq!(json["status"], "PENDING");
        assert_eq!(json["total"], 11700);
    }
}
