//! Order lifecycle controller.
//!
//! Places orders from a [`CheckoutSession`], drives payment completion and
//! keeps a local registry of orders seen in this session.
//!
//! | Method          | After placement    | Cart cleared                          |
//! |-----------------|--------------------|---------------------------------------|
//! | card, COD       | `Confirmed`        | immediately                           |
//! | UPI             | `AwaitingPayment`  | on verified payment or dismissed dialog |
//!
//! Each order releases the cart at most once. A late verification after a
//! dismissed dialog leaves whatever the shopper has added since.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use solemate_core::{
    Order, OrderId, OrderStatus, PaymentCompletion, PaymentMethod, PaymentStatus, ShippingAddress,
};
use tracing::{debug, info, instrument, warn};

use crate::backend::{BackendError, CommerceBackend, PaymentRecord, PlaceOrder};
use crate::cart::CartStateController;
use crate::checkout::CheckoutSession;
use crate::error::{self, CommerceError, Result};
use crate::gate::lock;

/// Result of a successful placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementOutcome {
    /// Paid or payable on delivery; the cart has been cleared.
    Confirmed(Order),
    /// Waiting for an asynchronous payment. `payment` is `None` when
    /// initiation failed; retry with
    /// [`OrderLifecycleController::initiate_payment`].
    PaymentPending {
        order: Order,
        payment: Option<PaymentRecord>,
    },
}

impl PlacementOutcome {
    /// The placed order.
    #[must_use]
    pub const fn order(&self) -> &Order {
        match self {
            Self::Confirmed(order) | Self::PaymentPending { order, .. } => order,
        }
    }
}

/// Order lifecycle controller.
///
/// Cheap to clone; clones share the registry.
pub struct OrderLifecycleController<B> {
    inner: Arc<OrdersInner<B>>,
}

struct OrdersInner<B> {
    backend: Arc<B>,
    cart: CartStateController<B>,
    orders: Mutex<HashMap<OrderId, Order>>,
    payments: Mutex<HashMap<OrderId, PaymentRecord>>,
    /// Orders whose cart has already been cleared.
    cart_released: Mutex<HashSet<OrderId>>,
}

impl<B> Clone for OrderLifecycleController<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: CommerceBackend> OrderLifecycleController<B> {
    #[must_use]
    pub fn new(backend: Arc<B>, cart: CartStateController<B>) -> Self {
        Self {
            inner: Arc::new(OrdersInner {
                backend,
                cart,
                orders: Mutex::new(HashMap::new()),
                payments: Mutex::new(HashMap::new()),
                cart_released: Mutex::new(HashSet::new()),
            }),
        }
    }

    /// A known order.
    #[must_use]
    pub fn get(&self, order_id: OrderId) -> Option<Order> {
        lock(&self.inner.orders).get(&order_id).cloned()
    }

    /// Pending payment for an order, if one was initiated.
    #[must_use]
    pub fn pending_payment(&self, order_id: OrderId) -> Option<PaymentRecord> {
        lock(&self.inner.payments).get(&order_id).cloned()
    }

    /// Place an order for the session's cart.
    ///
    /// A stale coupon is revalidated first; the applied coupon is consumed
    /// on success.
    ///
    /// # Errors
    ///
    /// Returns `EmptyCart`, `NotSignedIn`, or the backend error from
    /// placement. Failures after the backend accepted the order (clearing
    /// the cart, initiating payment) are logged and do not fail placement.
    #[instrument(skip(self, session, address), fields(payment_method = method.as_str()))]
    pub async fn place_order(
        &self,
        session: &mut CheckoutSession<B>,
        address: ShippingAddress,
        method: PaymentMethod,
    ) -> Result<PlacementOutcome> {
        if !self.inner.cart.identity().is_some_and(|i| i.is_shopper()) {
            return Err(CommerceError::NotSignedIn);
        }
        let cart = self.inner.cart.cart();
        if cart.is_empty() {
            return Err(CommerceError::EmptyCart);
        }

        if session.quote().coupon_stale {
            session.revalidate_coupon().await?;
        }
        let quote = session.quote();

        let request = PlaceOrder {
            lines: cart.lines.clone(),
            shipping_address: address.clone(),
            payment_method: method,
            discount: quote.totals.discount,
            coupon_id: session.coupon_id(),
            total: quote.totals.total,
        };

        error::add_breadcrumb(
            "order",
            "Place order",
            Some(&[
                ("payment_method", method.as_str()),
                ("total", &quote.totals.total.to_string()),
            ]),
        );

        let record = self
            .inner
            .backend
            .place_order(&request)
            .await
            .map_err(|e| CommerceError::from(e).reported())?;

        let mut order = Order::placed(
            record.id,
            &cart.lines,
            quote.totals.discount,
            quote.totals.total,
            method,
            address,
            Utc::now(),
        );
        session.remove_coupon();
        info!(order_id = %order.id, total = %order.total, "Order placed");

        let outcome = match method.completion() {
            PaymentCompletion::Synchronous => {
                order.transition(OrderStatus::Confirmed, Utc::now(), "Order confirmed")?;
                self.clear_cart_after_placement(order.id).await;
                PlacementOutcome::Confirmed(order.clone())
            }
            PaymentCompletion::Asynchronous => {
                order.transition(
                    OrderStatus::AwaitingPayment,
                    Utc::now(),
                    "Awaiting payment",
                )?;
                let payment = match self.start_payment(order.id).await {
                    Ok(payment) => Some(payment),
                    Err(err) => {
                        warn!(order_id = %order.id, error = %err, "Payment initiation failed");
                        None
                    }
                };
                PlacementOutcome::PaymentPending {
                    order: order.clone(),
                    payment,
                }
            }
        };

        lock(&self.inner.orders).insert(order.id, order);
        Ok(outcome)
    }

    /// Start (or restart) payment for an order awaiting it.
    ///
    /// # Errors
    ///
    /// Returns `OrderNotFound`, `InvalidTransition` when the order is not
    /// awaiting payment, or the backend error.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn initiate_payment(&self, order_id: OrderId) -> Result<PaymentRecord> {
        let status = self.known_status(order_id)?;
        if status != OrderStatus::AwaitingPayment {
            return Err(solemate_core::InvalidTransition {
                from: status,
                to: OrderStatus::AwaitingPayment,
            }
            .into());
        }
        self.start_payment(order_id).await
    }

    /// Verify a completed payment and confirm the order.
    ///
    /// # Errors
    ///
    /// Returns `OrderNotFound`, `PaymentIncomplete` when the backend does
    /// not report the payment as completed, `InvalidTransition`, or the
    /// backend error. The order stays `AwaitingPayment` on error.
    #[instrument(skip(self, transaction_id), fields(order_id = %order_id))]
    pub async fn complete_payment(&self, order_id: OrderId, transaction_id: &str) -> Result<Order> {
        let status = self.known_status(order_id)?;
        if status != OrderStatus::AwaitingPayment {
            return Err(solemate_core::InvalidTransition {
                from: status,
                to: OrderStatus::Confirmed,
            }
            .into());
        }

        let payment = match self.pending_payment(order_id) {
            Some(payment) => payment,
            None => self.start_payment(order_id).await?,
        };

        error::add_breadcrumb(
            "payment",
            "Verify payment",
            Some(&[("order_id", &order_id.to_string())]),
        );

        let verified = self
            .inner
            .backend
            .verify_payment(payment.id, transaction_id)
            .await
            .map_err(|e| CommerceError::from(e).reported())?;
        if verified != PaymentStatus::Completed {
            warn!(status = ?verified, "Payment not completed");
            return Err(CommerceError::PaymentIncomplete {
                order_id,
                status: verified,
            });
        }

        let order = self.update(order_id, |order| {
            order.transition(OrderStatus::Confirmed, Utc::now(), "Payment received")
        })?;
        lock(&self.inner.payments).remove(&order_id);
        info!("Payment completed");

        self.clear_cart_after_placement(order_id).await;
        Ok(order)
    }

    /// The shopper closed the payment dialog without paying.
    ///
    /// The order stays `AwaitingPayment` (placed, payment pending) and the
    /// cart is cleared unless this order already released it.
    ///
    /// # Errors
    ///
    /// Returns `OrderNotFound` or `InvalidTransition` when the order is not
    /// awaiting payment.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn dismiss_payment(&self, order_id: OrderId) -> Result<Order> {
        let order = self
            .get(order_id)
            .ok_or(CommerceError::OrderNotFound(order_id))?;
        if order.status != OrderStatus::AwaitingPayment {
            return Err(solemate_core::InvalidTransition {
                from: order.status,
                to: OrderStatus::AwaitingPayment,
            }
            .into());
        }

        error::add_breadcrumb(
            "payment",
            "Payment dialog closed",
            Some(&[("order_id", &order_id.to_string())]),
        );
        info!("Payment dismissed, order left awaiting payment");

        self.clear_cart_after_placement(order_id).await;
        Ok(order)
    }

    /// Cancel an order.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` once the order has shipped (no backend
    /// call is made), `OrderNotFound`, or the backend error.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn cancel(&self, order_id: OrderId) -> Result<Order> {
        let status = match self.get(order_id) {
            Some(order) => order.status,
            None => self.refresh(order_id).await?.status,
        };
        if !status.is_cancellable() {
            return Err(solemate_core::InvalidTransition {
                from: status,
                to: OrderStatus::Cancelled,
            }
            .into());
        }

        error::add_breadcrumb(
            "order",
            "Cancel order",
            Some(&[("order_id", &order_id.to_string())]),
        );

        self.inner
            .backend
            .cancel_order(order_id)
            .await
            .map_err(|e| not_found_as_order(e, order_id))?;

        let order = self.update(order_id, |order| order.cancel(Utc::now()))?;
        lock(&self.inner.payments).remove(&order_id);
        info!("Order cancelled");
        Ok(order)
    }

    /// Pull backend status and tracking history into the local order.
    ///
    /// # Errors
    ///
    /// Returns `OrderNotFound` or the backend error.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn refresh(&self, order_id: OrderId) -> Result<Order> {
        let record = self
            .inner
            .backend
            .fetch_order(order_id)
            .await
            .map_err(|e| not_found_as_order(e, order_id))?;

        let mut orders = lock(&self.inner.orders);
        let order = match orders.get_mut(&order_id) {
            Some(order) => {
                let appended = order.merge_remote(record.status, record.tracking);
                if appended > 0 {
                    info!(appended, status = %order.status, "Tracking updated");
                }
                order.clone()
            }
            None => {
                let order = Order::from(record);
                orders.insert(order_id, order.clone());
                order
            }
        };
        Ok(order)
    }

    /// The shopper's orders, newest first as reported by the backend.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    #[instrument(skip(self))]
    pub async fn my_orders(&self) -> Result<Vec<Order>> {
        let records = self
            .inner
            .backend
            .my_orders()
            .await
            .map_err(|e| CommerceError::from(e).reported())?;

        let mut orders = lock(&self.inner.orders);
        Ok(records
            .into_iter()
            .map(|record| {
                let id = record.id;
                let order = match orders.get_mut(&id) {
                    Some(order) => {
                        order.merge_remote(record.status, record.tracking);
                        order.clone()
                    }
                    None => Order::from(record),
                };
                orders.insert(id, order.clone());
                order
            })
            .collect())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn known_status(&self, order_id: OrderId) -> Result<OrderStatus> {
        lock(&self.inner.orders)
            .get(&order_id)
            .map(|o| o.status)
            .ok_or(CommerceError::OrderNotFound(order_id))
    }

    fn update<F>(&self, order_id: OrderId, f: F) -> Result<Order>
    where
        F: FnOnce(&mut Order) -> std::result::Result<(), solemate_core::InvalidTransition>,
    {
        let mut orders = lock(&self.inner.orders);
        let order = orders
            .get_mut(&order_id)
            .ok_or(CommerceError::OrderNotFound(order_id))?;
        f(order)?;
        Ok(order.clone())
    }

    async fn start_payment(&self, order_id: OrderId) -> Result<PaymentRecord> {
        let payment = self
            .inner
            .backend
            .initiate_payment(order_id)
            .await
            .map_err(|e| CommerceError::from(e).reported())?;
        info!(payment_id = %payment.id, amount = %payment.amount, "Payment initiated");
        lock(&self.inner.payments).insert(order_id, payment.clone());
        Ok(payment)
    }

    async fn clear_cart_after_placement(&self, order_id: OrderId) {
        if !lock(&self.inner.cart_released).insert(order_id) {
            debug!(order_id = %order_id, "Cart already released for order");
            return;
        }
        if let Err(err) = self.inner.cart.clear().await {
            // Unmark so a later completion can retry.
            lock(&self.inner.cart_released).remove(&order_id);
            warn!(order_id = %order_id, error = %err, "Failed to clear cart after order");
        }
    }
}

fn not_found_as_order(err: BackendError, order_id: OrderId) -> CommerceError {
    match err {
        BackendError::NotFound(_) => CommerceError::OrderNotFound(order_id),
        other => CommerceError::from(other).reported(),
    }
}
