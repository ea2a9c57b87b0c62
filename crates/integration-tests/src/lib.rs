//! Integration tests for SoleMate.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p solemate-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_controller` - Identity reaction, mutations, coalescing
//! - `checkout_flow` - Coupons and totals against the live cart
//! - `order_lifecycle` - Placement and payment completion per method
//! - `rest_backend` - [`solemate_storefront::RestBackend`] against a local HTTP server
//!
//! Controller tests run against [`FakeBackend`], an in-memory backend that
//! applies the same rules as the real one and counts calls per endpoint.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use solemate_core::pricing::effective_price;
use solemate_core::{
    Cart, CartLine, CartLineId, Coupon, CouponEvaluator, CouponId, DiscountType,
    EvaluationContext, Identity, ModelNo, OrderId, OrderLine, OrderStatus, PaymentId,
    PaymentStatus, Product, Role, ShippingAddress, TrackingEvent, UserId, VariantMatrix, Wishlist,
    WishlistItem, WishlistItemId,
};
use solemate_storefront::backend::{
    AddToCart, BackendError, CommerceBackend, CouponValidation, OrderRecord, PaymentRecord,
    PlaceOrder,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Failure injected into the next call of an endpoint.
#[derive(Debug, Clone)]
pub enum Failure {
    /// Server error (`NetworkFailure`).
    Unavailable,
    /// Refused with a message (`ValidationRejection`).
    Rejected(String),
}

impl Failure {
    fn into_error(self) -> BackendError {
        match self {
            Self::Unavailable => BackendError::Status {
                status: 503,
                body: "Service Unavailable".to_string(),
            },
            Self::Rejected(message) => BackendError::Rejected(message),
        }
    }
}

#[derive(Debug, Default)]
struct FakeState {
    products: HashMap<ModelNo, Product>,
    lines: Vec<CartLine>,
    wishlist: Vec<WishlistItem>,
    coupons: Vec<Coupon>,
    orders: Vec<OrderRecord>,
    payments: HashMap<PaymentId, PaymentRecord>,
    prior_orders: u64,
    payment_outcome: PaymentStatus,
    next_id: i64,
}

impl FakeState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn cart(&self) -> Cart {
        Cart::from_lines(self.lines.clone())
    }

    fn order_mut(&mut self, id: OrderId) -> Result<&mut OrderRecord, BackendError> {
        self.orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| BackendError::NotFound(format!("order {id}")))
    }
}

/// In-memory commerce backend.
#[derive(Debug)]
pub struct FakeBackend {
    state: Mutex<FakeState>,
    calls: Mutex<HashMap<&'static str, usize>>,
    failures: Mutex<HashMap<&'static str, Failure>>,
    latency: Mutex<Option<Duration>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBackend {
    /// Empty backend. Verified payments complete by default.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                payment_outcome: PaymentStatus::Completed,
                next_id: 100,
                ..FakeState::default()
            }),
            calls: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            latency: Mutex::new(None),
        }
    }

    /// Backend stocked with [`fixtures::runner`] and [`fixtures::save20`].
    #[must_use]
    pub fn stocked() -> Self {
        Self::new()
            .with_product(fixtures::runner())
            .with_coupon(fixtures::save20())
    }

    #[must_use]
    pub fn with_product(self, product: Product) -> Self {
        lock(&self.state).products.insert(product.model_no, product);
        self
    }

    #[must_use]
    pub fn with_coupon(self, coupon: Coupon) -> Self {
        lock(&self.state).coupons.push(coupon);
        self
    }

    /// Number of calls made to an endpoint.
    #[must_use]
    pub fn calls(&self, endpoint: &str) -> usize {
        lock(&self.calls).get(endpoint).copied().unwrap_or(0)
    }

    /// Number of calls made to any endpoint.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        lock(&self.calls).values().sum()
    }

    /// Fail the next call to `endpoint`.
    pub fn fail_next(&self, endpoint: &'static str, failure: Failure) {
        lock(&self.failures).insert(endpoint, failure);
    }

    /// Delay every cart mutation.
    pub fn set_latency(&self, latency: Duration) {
        *lock(&self.latency) = Some(latency);
    }

    /// Status reported by the next payment verifications.
    pub fn set_payment_outcome(&self, status: PaymentStatus) {
        lock(&self.state).payment_outcome = status;
    }

    /// Number of orders the shopper placed before this test.
    pub fn set_prior_orders(&self, count: u64) {
        lock(&self.state).prior_orders = count;
    }

    /// Move an order as the fulfilment side would.
    pub fn advance_order(&self, id: OrderId, status: OrderStatus, description: &str) {
        let mut state = lock(&self.state);
        if let Ok(order) = state.order_mut(id) {
            order.status = status;
            order.tracking.push(TrackingEvent::new(status, Utc::now(), description));
        }
    }

    /// Server-side cart lines.
    #[must_use]
    pub fn cart_lines(&self) -> Vec<CartLine> {
        lock(&self.state).lines.clone()
    }

    /// Server-side order.
    #[must_use]
    pub fn order(&self, id: OrderId) -> Option<OrderRecord> {
        lock(&self.state).orders.iter().find(|o| o.id == id).cloned()
    }

    /// Record a call and return an injected failure, if any.
    fn enter(&self, endpoint: &'static str) -> Result<(), BackendError> {
        *lock(&self.calls).entry(endpoint).or_default() += 1;
        lock(&self.failures)
            .remove(endpoint)
            .map_or(Ok(()), |f| Err(f.into_error()))
    }

    async fn delay(&self) {
        let latency = *lock(&self.latency);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

impl CommerceBackend for FakeBackend {
    async fn fetch_cart(&self) -> Result<Cart, BackendError> {
        self.enter("fetch_cart")?;
        Ok(lock(&self.state).cart())
    }

    async fn add_to_cart(&self, request: &AddToCart) -> Result<Cart, BackendError> {
        self.enter("add_to_cart")?;
        self.delay().await;

        let mut state = lock(&self.state);
        let product = state
            .products
            .get(&request.model_no)
            .ok_or_else(|| BackendError::NotFound(format!("product {}", request.model_no)))?;
        let variant = VariantMatrix::new(product)
            .resolve(&request.color, &request.size)
            .cloned()
            .ok_or_else(|| BackendError::Rejected("Variant not found".to_string()))?;
        let name = product.name.clone();

        let existing = state
            .lines
            .iter()
            .find(|l| l.variant_id == variant.id)
            .map_or(0, |l| l.quantity);
        if existing + request.quantity > variant.quantity_on_hand {
            return Err(BackendError::Rejected("Insufficient stock".to_string()));
        }

        if let Some(line) = state.lines.iter_mut().find(|l| l.variant_id == variant.id) {
            line.quantity += request.quantity;
        } else {
            let id = CartLineId::new(state.next_id());
            state.lines.push(CartLine {
                id,
                variant_id: variant.id,
                model_no: request.model_no,
                product_name: name,
                color: variant.color.name.clone(),
                color_hex: variant.color.hex.clone(),
                size: variant.size.clone(),
                quantity: request.quantity,
                unit_price: effective_price(&variant, Utc::now()),
                image_url: variant.primary_image().map(|i| i.url.clone()),
            });
        }
        Ok(state.cart())
    }

    async fn remove_cart_line(&self, line_id: CartLineId) -> Result<Cart, BackendError> {
        self.enter("remove_cart_line")?;
        self.delay().await;

        let mut state = lock(&self.state);
        state.lines.retain(|l| l.id != line_id);
        Ok(state.cart())
    }

    async fn update_cart_line(&self, line_id: CartLineId, quantity: u32) -> Result<Cart, BackendError> {
        self.enter("update_cart_line")?;
        self.delay().await;

        let mut state = lock(&self.state);
        let line = state
            .lines
            .iter_mut()
            .find(|l| l.id == line_id)
            .ok_or_else(|| BackendError::NotFound(format!("cart item {line_id}")))?;
        line.quantity = quantity;
        Ok(state.cart())
    }

    async fn clear_cart(&self) -> Result<(), BackendError> {
        self.enter("clear_cart")?;
        lock(&self.state).lines.clear();
        Ok(())
    }

    async fn fetch_wishlist(&self) -> Result<Wishlist, BackendError> {
        self.enter("fetch_wishlist")?;
        Ok(Wishlist {
            items: lock(&self.state).wishlist.clone(),
        })
    }

    async fn add_to_wishlist(&self, model_no: ModelNo) -> Result<Wishlist, BackendError> {
        self.enter("add_to_wishlist")?;
        let mut state = lock(&self.state);
        let product = state
            .products
            .get(&model_no)
            .ok_or_else(|| BackendError::NotFound(format!("product {model_no}")))?;
        let item = WishlistItem {
            id: WishlistItemId::new(0),
            model_no,
            name: product.name.clone(),
            price: product.base_price,
        };
        if !state.wishlist.iter().any(|i| i.model_no == model_no) {
            let id = WishlistItemId::new(state.next_id());
            state.wishlist.push(WishlistItem { id, ..item });
        }
        Ok(Wishlist {
            items: state.wishlist.clone(),
        })
    }

    async fn remove_from_wishlist(&self, model_no: ModelNo) -> Result<Wishlist, BackendError> {
        self.enter("remove_from_wishlist")?;
        let mut state = lock(&self.state);
        state.wishlist.retain(|i| i.model_no != model_no);
        Ok(Wishlist {
            items: state.wishlist.clone(),
        })
    }

    async fn validate_coupon(
        &self,
        code: &str,
        cart_value: Decimal,
    ) -> Result<CouponValidation, BackendError> {
        self.enter("validate_coupon")?;
        let state = lock(&self.state);
        let ctx =
            EvaluationContext::new(Utc::now(), cart_value).with_prior_orders(state.prior_orders);
        Ok(
            match CouponEvaluator::evaluate_code(&state.coupons, code, &ctx) {
                Ok(applied) => CouponValidation::Accepted {
                    coupon_id: Some(applied.coupon_id),
                    code: applied.code,
                    discount: applied.amount,
                },
                Err(rejection) => CouponValidation::Rejected {
                    message: rejection.to_string(),
                },
            },
        )
    }

    async fn active_coupons(&self) -> Result<Vec<Coupon>, BackendError> {
        self.enter("active_coupons")?;
        Ok(lock(&self.state)
            .coupons
            .iter()
            .filter(|c| c.active)
            .cloned()
            .collect())
    }

    async fn is_first_order(&self) -> Result<bool, BackendError> {
        self.enter("is_first_order")?;
        Ok(lock(&self.state).prior_orders == 0)
    }

    async fn place_order(&self, request: &PlaceOrder) -> Result<OrderRecord, BackendError> {
        self.enter("place_order")?;
        if request.lines.is_empty() {
            return Err(BackendError::Rejected("Cart is empty".to_string()));
        }

        let mut state = lock(&self.state);
        let record = OrderRecord {
            id: OrderId::new(state.next_id()),
            status: OrderStatus::Placed,
            lines: request.lines.iter().map(OrderLine::from).collect(),
            discount: request.discount,
            total: request.total,
            payment_method: Some(request.payment_method),
            shipping_address: Some(request.shipping_address.clone()),
            tracking: vec![TrackingEvent::new(
                OrderStatus::Placed,
                Utc::now(),
                "Order placed",
            )],
        };
        state.orders.push(record.clone());
        state.prior_orders += 1;
        if let Some(coupon_id) = request.coupon_id
            && let Some(coupon) = state.coupons.iter_mut().find(|c| c.id == coupon_id)
        {
            coupon.used_count += 1;
        }
        Ok(record)
    }

    async fn fetch_order(&self, order_id: OrderId) -> Result<OrderRecord, BackendError> {
        self.enter("fetch_order")?;
        let mut state = lock(&self.state);
        state.order_mut(order_id).cloned()
    }

    async fn my_orders(&self) -> Result<Vec<OrderRecord>, BackendError> {
        self.enter("my_orders")?;
        Ok(lock(&self.state).orders.iter().rev().cloned().collect())
    }

    async fn cancel_order(&self, order_id: OrderId) -> Result<(), BackendError> {
        self.enter("cancel_order")?;
        let mut state = lock(&self.state);
        let order = state.order_mut(order_id)?;
        if !order.status.is_cancellable() {
            return Err(BackendError::Rejected(
                "Order can no longer be cancelled".to_string(),
            ));
        }
        order.status = OrderStatus::Cancelled;
        order.tracking.push(TrackingEvent::new(
            OrderStatus::Cancelled,
            Utc::now(),
            "Cancelled by customer",
        ));
        Ok(())
    }

    async fn initiate_payment(&self, order_id: OrderId) -> Result<PaymentRecord, BackendError> {
        self.enter("initiate_payment")?;
        let mut state = lock(&self.state);
        let amount = state.order_mut(order_id)?.total;
        let id = PaymentId::new(state.next_id());
        let payment = PaymentRecord {
            id,
            order_id,
            amount,
            status: PaymentStatus::Pending,
            upi_uri: Some(format!(
                "upi://pay?pa=solemate@upi&pn=SoleMate&am={amount}&tr={id}"
            )),
            transaction_id: None,
        };
        state.payments.insert(id, payment.clone());
        Ok(payment)
    }

    async fn verify_payment(
        &self,
        payment_id: PaymentId,
        transaction_id: &str,
    ) -> Result<PaymentStatus, BackendError> {
        self.enter("verify_payment")?;
        let mut state = lock(&self.state);
        let outcome = state.payment_outcome;
        let payment = state
            .payments
            .get_mut(&payment_id)
            .ok_or_else(|| BackendError::NotFound(format!("payment {payment_id}")))?;
        payment.status = outcome;
        payment.transaction_id = Some(transaction_id.to_string());
        let order_id = payment.order_id;

        if outcome == PaymentStatus::Completed {
            let order = state.order_mut(order_id)?;
            order.status = OrderStatus::Confirmed;
            order.tracking.push(TrackingEvent::new(
                OrderStatus::Confirmed,
                Utc::now(),
                "Payment received",
            ));
        }
        Ok(outcome)
    }

    async fn fetch_product(&self, model_no: ModelNo) -> Result<Product, BackendError> {
        self.enter("fetch_product")?;
        lock(&self.state)
            .products
            .get(&model_no)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(format!("product {model_no}")))
    }
}

/// Shared test data.
pub mod fixtures {
    use chrono::Duration;
    use solemate_core::{Color, FlashSale, ImageId, Variant, VariantId, VariantImage};
    use solemate_storefront::StorefrontConfig;

    use super::*;

    pub const RUNNER: ModelNo = ModelNo::new(1001);

    fn variant(id: i64, color: &str, hex: &str, size: &str, price: i64, qty: u32) -> Variant {
        Variant {
            id: VariantId::new(id),
            sku: format!("RUN-{id}"),
            model_no: RUNNER,
            color: Color::new(color, hex),
            size: size.to_string(),
            price: Decimal::from(price),
            flash_sale: None,
            quantity_on_hand: qty,
            images: vec![VariantImage {
                id: ImageId::new(id * 10),
                url: format!("https://cdn.example.test/run/{id}.jpg"),
                primary: true,
            }],
        }
    }

    /// Trail runner: Black 8/9 at 150, Red 9 at 200 (on flash sale at 120
    /// for the next hour), White 10 sold out.
    #[must_use]
    pub fn runner() -> Product {
        let mut red = variant(3, "Red", "#cc0000", "9", 200, 5);
        red.flash_sale = Some(FlashSale {
            price: Decimal::from(120),
            ends_at: Utc::now() + Duration::hours(1),
        });
        Product {
            model_no: RUNNER,
            name: "Trail Runner".to_string(),
            brand: "Stride".to_string(),
            description: "Lightweight trail shoe".to_string(),
            base_price: Decimal::from(150),
            variants: vec![
                variant(1, "Black", "#000000", "8", 150, 10),
                variant(2, "Black", "#000000", "9", 150, 10),
                red,
                variant(4, "White", "#ffffff", "10", 150, 0),
            ],
        }
    }

    /// 20% off, capped at 100, minimum order 200.
    #[must_use]
    pub fn save20() -> Coupon {
        let mut coupon = Coupon::new(
            CouponId::new(1),
            "SAVE20",
            DiscountType::Percentage,
            Decimal::from(20),
        );
        coupon.max_discount = Some(Decimal::from(100));
        coupon.min_order_amount = Some(Decimal::from(200));
        coupon
    }

    /// Flat 150 off a shopper's first order.
    #[must_use]
    pub fn welcome() -> Coupon {
        let mut coupon = Coupon::new(
            CouponId::new(2),
            "WELCOME",
            DiscountType::Fixed,
            Decimal::from(150),
        );
        coupon.first_order_only = true;
        coupon
    }

    #[must_use]
    pub fn shopper() -> Identity {
        let mut identity = Identity::new(UserId::new(7), "Asha", Role::User);
        identity.email = Some("asha@example.test".to_string());
        identity
    }

    #[must_use]
    pub fn admin() -> Identity {
        Identity::new(UserId::new(1), "Ops", Role::Admin)
    }

    #[must_use]
    pub fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Asha Rao".to_string(),
            phone: "9876543210".to_string(),
            address_line: "12 MG Road".to_string(),
            city: "Bengaluru".to_string(),
            state: "Karnataka".to_string(),
            pincode: "560001".to_string(),
        }
    }

    /// Configuration pointing at `api_url` with default shipping.
    ///
    /// # Panics
    ///
    /// Panics if `api_url` is not a valid http(s) URL.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn config(api_url: &str) -> StorefrontConfig {
        StorefrontConfig::from_lookup(|key| match key {
            "SOLEMATE_API_URL" => Some(api_url.to_string()),
            "SOLEMATE_API_TOKEN" => Some("test-token".to_string()),
            _ => None,
        })
        .unwrap()
    }

    /// An add-to-cart request for the runner.
    #[must_use]
    pub fn add(color: &str, size: &str, quantity: u32) -> AddToCart {
        AddToCart {
            model_no: RUNNER,
            color: color.to_string(),
            size: size.to_string(),
            quantity,
        }
    }
}
