//! Order snapshots and lifecycle transitions.
//!
//! An [`Order`] owns independent copies of the cart lines it was placed from,
//! so later catalog or cart changes never reach it. Status changes go through
//! [`Order::transition`], which checks the edge against
//! [`OrderStatus::can_transition_to`] and appends to the tracking history.
//! History is append-only.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{CartLine, ModelNo, OrderId, OrderStatus, PaymentMethod, VariantId};

/// Rejected lifecycle edge.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("order cannot move from {from} to {to}")]
pub struct InvalidTransition {
    /// Status before the attempted change.
    pub from: OrderStatus,
    /// Requested status.
    pub to: OrderStatus,
}

/// Immutable copy of a cart line taken at placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    /// Absent on orders listed by the backend without variant references.
    pub variant_id: Option<VariantId>,
    pub model_no: ModelNo,
    pub product_name: String,
    pub color: String,
    pub size: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl OrderLine {
    /// `quantity x unit_price`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

impl From<&CartLine> for OrderLine {
    fn from(line: &CartLine) -> Self {
        Self {
            variant_id: Some(line.variant_id),
            model_no: line.model_no,
            product_name: line.product_name.clone(),
            color: line.color.clone(),
            size: line.size.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
        }
    }
}

/// Delivery address captured at placement.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub full_name: String,
    pub phone: String,
    pub address_line: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
}

impl ShippingAddress {
    /// Single-line rendering for receipts and logs.
    #[must_use]
    pub fn one_line(&self) -> String {
        format!(
            "{}, {}, {}, {} - {}",
            self.full_name, self.address_line, self.city, self.state, self.pincode
        )
    }
}

/// One entry in an order's tracking history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingEvent {
    /// Status entered.
    pub status: OrderStatus,
    /// When it happened.
    pub at: DateTime<Utc>,
    /// Free-form description.
    pub description: String,
    /// Where it happened, if reported.
    pub location: Option<String>,
}

impl TrackingEvent {
    /// Event without a location.
    #[must_use]
    pub fn new(status: OrderStatus, at: DateTime<Utc>, description: impl Into<String>) -> Self {
        Self {
            status,
            at,
            description: description.into(),
            location: None,
        }
    }
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Server-assigned ID.
    pub id: OrderId,
    /// Line snapshot in cart order.
    pub lines: Vec<OrderLine>,
    /// Coupon discount applied at placement.
    pub discount: Decimal,
    /// Amount charged.
    pub total: Decimal,
    /// Chosen payment method, when known.
    pub payment_method: Option<PaymentMethod>,
    /// Address snapshot, when known.
    pub shipping_address: Option<ShippingAddress>,
    /// Current status.
    pub status: OrderStatus,
    /// Append-only history, oldest first.
    pub tracking: Vec<TrackingEvent>,
}

impl Order {
    /// A freshly placed order with a single `Placed` tracking event.
    #[must_use]
    pub fn placed(
        id: OrderId,
        lines: &[CartLine],
        discount: Decimal,
        total: Decimal,
        payment_method: PaymentMethod,
        shipping_address: ShippingAddress,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            lines: lines.iter().map(OrderLine::from).collect(),
            discount,
            total,
            payment_method: Some(payment_method),
            shipping_address: Some(shipping_address),
            status: OrderStatus::Placed,
            tracking: vec![TrackingEvent::new(OrderStatus::Placed, at, "Order placed")],
        }
    }

    /// Move to `next`, appending a tracking event.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransition`] when the edge is not allowed; the order
    /// is left unchanged.
    pub fn transition(
        &mut self,
        next: OrderStatus,
        at: DateTime<Utc>,
        description: impl Into<String>,
    ) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.tracking.push(TrackingEvent::new(next, at, description));
        Ok(())
    }

    /// Cancel the order.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransition`] once the order has shipped.
    pub fn cancel(&mut self, at: DateTime<Utc>) -> Result<(), InvalidTransition> {
        self.transition(OrderStatus::Cancelled, at, "Cancelled by customer")
    }

    /// Adopt the backend's status and append events not yet recorded.
    ///
    /// The backend is authoritative for status, so no edge check is made.
    /// Existing events are never removed or edited. Returns how many events
    /// were appended.
    pub fn merge_remote(&mut self, status: OrderStatus, events: Vec<TrackingEvent>) -> usize {
        let before = self.tracking.len();
        for event in events {
            let known = self
                .tracking
                .iter()
                .any(|e| e.status == event.status && e.at == event.at);
            if !known {
                self.tracking.push(event);
            }
        }
        self.status = status;
        self.tracking.len() - before
    }

    /// Total units in the order.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }

    /// Sum of line totals before shipping and discount.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.lines.iter().map(OrderLine::line_total).sum()
    }

    /// Most recent tracking event.
    #[must_use]
    pub fn latest_event(&self) -> Option<&TrackingEvent> {
        self.tracking.last()
    }
}
