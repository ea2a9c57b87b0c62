//! Commerce backend seam.
//!
//! # Architecture
//!
//! - The backend is the source of truth for carts, wishlists, coupons and
//!   orders; controllers only mirror what it returns
//! - [`CommerceBackend`] is the seam the controllers are generic over, so
//!   scenario tests run against an in-memory fake
//! - [`RestBackend`] talks JSON over HTTP with `reqwest` and caches products
//!   in `moka` (5 minute TTL by default)
//! - Wire payloads are parsed and normalized once, in [`payloads`]
//!
//! # Example
//!
//! ```rust,ignore
//! use solemate_storefront::backend::{CommerceBackend, RestBackend};
//!
//! let backend = RestBackend::new(&config)?;
//! let product = backend.fetch_product(ModelNo::new(1001)).await?;
//! ```

mod cache;
pub mod payloads;
mod rest;

use std::future::Future;

use rust_decimal::Decimal;
use serde::Serialize;
use solemate_core::{
    Cart, CartLine, CartLineId, Coupon, CouponId, ModelNo, Order, OrderId, OrderLine, OrderStatus,
    PaymentId, PaymentMethod, PaymentStatus, Product, ShippingAddress, TrackingEvent, Wishlist,
};
use thiserror::Error;

pub use rest::RestBackend;

/// Errors that can occur when talking to the commerce backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status without a usable message.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request refused with a backend message (4xx).
    #[error("Rejected: {0}")]
    Rejected(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Payload parsed but violates a domain invariant.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

/// Body of `POST /cart/add`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCart {
    pub model_no: ModelNo,
    pub color: String,
    pub size: String,
    pub quantity: u32,
}

/// Body of `POST /orders/place`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceOrder {
    /// Snapshot of the cart lines being ordered.
    pub lines: Vec<CartLine>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub discount: Decimal,
    pub coupon_id: Option<CouponId>,
    pub total: Decimal,
}

/// Outcome of `GET /coupons/validate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CouponValidation {
    /// Coupon applies with this discount.
    Accepted {
        coupon_id: Option<CouponId>,
        code: String,
        discount: Decimal,
    },
    /// Coupon refused; the message is shown to the shopper.
    Rejected { message: String },
}

/// An order as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRecord {
    pub id: OrderId,
    pub status: OrderStatus,
    pub lines: Vec<OrderLine>,
    pub discount: Decimal,
    pub total: Decimal,
    pub payment_method: Option<PaymentMethod>,
    pub shipping_address: Option<ShippingAddress>,
    /// Oldest first.
    pub tracking: Vec<TrackingEvent>,
}

impl From<OrderRecord> for Order {
    fn from(record: OrderRecord) -> Self {
        Self {
            id: record.id,
            lines: record.lines,
            discount: record.discount,
            total: record.total,
            payment_method: record.payment_method,
            shipping_address: record.shipping_address,
            status: record.status,
            tracking: record.tracking,
        }
    }
}

/// A payment as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRecord {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub amount: Decimal,
    pub status: PaymentStatus,
    /// `upi://pay?...` string to render as a QR code.
    pub upi_uri: Option<String>,
    pub transaction_id: Option<String>,
}

/// Operations the controllers need from the commerce backend.
///
/// Every mutation returns the backend's resulting state so callers can
/// replace their local copy wholesale.
pub trait CommerceBackend: Send + Sync + 'static {
    /// `GET /cart`
    fn fetch_cart(&self) -> impl Future<Output = Result<Cart, BackendError>> + Send;

    /// `POST /cart/add`
    fn add_to_cart(
        &self,
        request: &AddToCart,
    ) -> impl Future<Output = Result<Cart, BackendError>> + Send;

    /// `DELETE /cart/item/{id}`
    fn remove_cart_line(
        &self,
        line_id: CartLineId,
    ) -> impl Future<Output = Result<Cart, BackendError>> + Send;

    /// `PUT /cart/item/{id}`
    fn update_cart_line(
        &self,
        line_id: CartLineId,
        quantity: u32,
    ) -> impl Future<Output = Result<Cart, BackendError>> + Send;

    /// `DELETE /cart/clear`
    fn clear_cart(&self) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// `GET /wishlist`
    fn fetch_wishlist(&self) -> impl Future<Output = Result<Wishlist, BackendError>> + Send;

    /// `POST /wishlist/add/{modelNo}`
    fn add_to_wishlist(
        &self,
        model_no: ModelNo,
    ) -> impl Future<Output = Result<Wishlist, BackendError>> + Send;

    /// `DELETE /wishlist/remove/{modelNo}`
    fn remove_from_wishlist(
        &self,
        model_no: ModelNo,
    ) -> impl Future<Output = Result<Wishlist, BackendError>> + Send;

    /// `GET /coupons/validate?code&cartValue`
    fn validate_coupon(
        &self,
        code: &str,
        cart_value: Decimal,
    ) -> impl Future<Output = Result<CouponValidation, BackendError>> + Send;

    /// `GET /coupons/active`
    fn active_coupons(&self) -> impl Future<Output = Result<Vec<Coupon>, BackendError>> + Send;

    /// `GET /orders/check-first-order`
    fn is_first_order(&self) -> impl Future<Output = Result<bool, BackendError>> + Send;

    /// `POST /orders/place`
    fn place_order(
        &self,
        request: &PlaceOrder,
    ) -> impl Future<Output = Result<OrderRecord, BackendError>> + Send;

    /// `GET /orders/{id}`
    fn fetch_order(
        &self,
        order_id: OrderId,
    ) -> impl Future<Output = Result<OrderRecord, BackendError>> + Send;

    /// `GET /orders/my-orders`
    fn my_orders(&self) -> impl Future<Output = Result<Vec<OrderRecord>, BackendError>> + Send;

    /// `POST /orders/{id}/cancel`
    fn cancel_order(
        &self,
        order_id: OrderId,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// `POST /payments/initiate`
    fn initiate_payment(
        &self,
        order_id: OrderId,
    ) -> impl Future<Output = Result<PaymentRecord, BackendError>> + Send;

    /// `POST /payments/verify`
    fn verify_payment(
        &self,
        payment_id: PaymentId,
        transaction_id: &str,
    ) -> impl Future<Output = Result<PaymentStatus, BackendError>> + Send;

    /// `GET /products/{modelNo}`
    fn fetch_product(
        &self,
        model_no: ModelNo,
    ) -> impl Future<Output = Result<Product, BackendError>> + Send;
}
