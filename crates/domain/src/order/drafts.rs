use chrono::NaiveDate;
use common::{CustomerId, Money, NewOrder, OrderStatus, PaymentMethodId, ProductId, UserId};

use super::{OrderError, OrderTotals};

/// An order header as submitted by a caller, before pricing.
///
/// Subtotal and total are not part of a draft: they are derived from the
/// lines when the order is created.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    /// Date the order was placed.
    pub order_date: NaiveDate,
    /// Customer placing the order.
    pub customer_id: CustomerId,
    /// Initial status.
    pub status: OrderStatus,
    /// Discount percentage; `None` means no discount.
    pub discount_percent: Option<f64>,
    /// Payment method used.
    pub payment_method_id: PaymentMethodId,
    /// Back-office user who registered the order, if any.
    pub user_id: Option<UserId>,
    pub shipping_address: Option<String>,
    pub shipping_city: Option<String>,
    pub notes: Option<String>,
}

impl OrderDraft {
    /// Creates a pending, undiscounted draft with no shipping details.
    pub fn new(
        order_date: NaiveDate,
        customer_id: CustomerId,
        payment_method_id: PaymentMethodId,
    ) -> Self {
        Self {
            order_date,
            customer_id,
            status: OrderStatus::Pending,
            discount_percent: None,
            payment_method_id,
            user_id: None,
            shipping_address: None,
            shipping_city: None,
            notes: None,
        }
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_discount(mut self, percent: f64) -> Self {
        self.discount_percent = Some(percent);
        self
    }

    pub fn registered_by(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn shipped_to(mut self, address: impl Into<String>, city: impl Into<String>) -> Self {
        self.shipping_address = Some(address.into());
        self.shipping_city = Some(city.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// The effective discount percentage.
    pub fn discount(&self) -> f64 {
        self.discount_percent.unwrap_or(0.0)
    }

    /// Builds the record to insert, carrying the computed totals.
    pub(crate) fn into_new_order(self, totals: OrderTotals) -> NewOrder {
        let discount_percent = self.discount();
        NewOrder {
            order_date: self.order_date,
            customer_id: self.customer_id,
            status: self.status,
            discount_percent,
            payment_method_id: self.payment_method_id,
            user_id: self.user_id,
            subtotal: totals.subtotal,
            total: totals.total,
            shipping_address: self.shipping_address,
            shipping_city: self.shipping_city,
            notes: self.notes,
        }
    }
}

/// Largest quantity a single line may carry; storage keeps it as a 32-bit
/// signed integer.
pub const MAX_QUANTITY: u32 = i32::MAX as u32;

/// A line as submitted by a caller: what was bought, at what price, how many.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineDraft {
    pub product_id: ProductId,
    pub unit_price: Money,
    pub quantity: u32,
}

impl LineDraft {
    pub fn new(product_id: ProductId, unit_price: Money, quantity: u32) -> Self {
        Self {
            product_id,
            unit_price,
            quantity,
        }
    }

    /// Unit price times quantity.
    pub fn subtotal(&self) -> Result<Money, OrderError> {
        self.unit_price.checked_multiply(self.quantity).ok_or_else(|| {
            OrderError::AmountOverflow(format!(
                "{} x {} for product {}",
                self.unit_price, self.quantity, self.product_id
            ))
        })
    }

    /// Rejects zero or oversized quantities, negative prices and subtotals
    /// that overflow.
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.quantity == 0 || self.quantity > MAX_QUANTITY {
            return Err(OrderError::InvalidQuantity {
                quantity: self.quantity,
            });
        }
        if self.unit_price.is_negative() {
            return Err(OrderError::InvalidPrice {
                price: self.unit_price,
            });
        }
        self.subtotal()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> OrderDraft {
        OrderDraft::new(
            NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
            CustomerId::new(1),
            PaymentMethodId::new(2),
        )
    }

    #[test]
    fn test_new_draft_defaults() {
        let draft = draft();
        assert_eq!(draft.status, OrderStatus::Pending);
        assert_eq!(draft.discount_percent, None);
        assert_eq!(draft.discount(), 0.0);
        assert!(draft.shipping_city.is_none());
    }

    #[test]
    fn test_builder_methods() {
        let draft = draft()
            .with_status(OrderStatus::InProgress)
            .with_discount(15.0)
            .registered_by(UserId::new(9))
            .shipped_to("Calle Falsa 123", "Valparaiso")
            .with_notes("Leave at the door");

        assert_eq!(draft.status, OrderStatus::InProgress);
        assert_eq!(draft.discount(), 15.0);
        assert_eq!(draft.user_id, Some(UserId::new(9)));
        assert_eq!(draft.shipping_city.as_deref(), Some("Valparaiso"));
        assert_eq!(draft.notes.as_deref(), Some("Leave at the door"));
    }

    #[test]
    fn test_into_new_order_carries_totals() {
        let totals = OrderTotals {
            subtotal: Money::from_cents(10000),
            total: Money::from_cents(9000),
        };
        let new_order = draft().with_discount(10.0).into_new_order(totals);

        assert_eq!(new_order.subtotal, Money::from_cents(10000));
        assert_eq!(new_order.total, Money::from_cents(9000));
        assert_eq!(new_order.discount_percent, 10.0);
    }

    #[test]
    fn test_line_subtotal() {
        let line = LineDraft::new(ProductId::new(1), Money::from_cents(2550), 3);
        assert_eq!(line.subtotal().unwrap(), Money::from_cents(7650));
    }

    #[test]
    fn test_line_validation() {
        assert!(LineDraft::new(ProductId::new(1), Money::zero(), 1)
            .validate()
            .is_ok());
        assert!(matches!(
            LineDraft::new(ProductId::new(1), Money::from_cents(100), 0).validate(),
            Err(OrderError::InvalidQuantity { quantity: 0 })
        ));
        assert!(matches!(
            LineDraft::new(ProductId::new(1), Money::from_cents(-1), 1).validate(),
            Err(OrderError::InvalidPrice { .. })
        ));
    }

    #[test]
    fn test_line_validation_bounds() {
        assert!(LineDraft::new(ProductId::new(1), Money::from_cents(1), MAX_QUANTITY)
            .validate()
            .is_ok());
        assert!(matches!(
            LineDraft::new(ProductId::new(1), Money::from_cents(1), MAX_QUANTITY + 1).validate(),
            Err(OrderError::InvalidQuantity { .. })
        ));
        assert!(matches!(
            LineDraft::new(ProductId::new(1), Money::from_cents(i64::MAX), 2).validate(),
            Err(OrderError::AmountOverflow(_))
        ));
    }
}
