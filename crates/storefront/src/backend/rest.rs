//! REST implementation of [`CommerceBackend`].
//!
//! Uses `reqwest` 0.13 for HTTP and `moka` for the product cache. Every
//! request carries a fresh `X-Request-Id` and, when configured, a bearer
//! token.

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, StatusCode};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use solemate_core::{
    Cart, CartLineId, Coupon, ModelNo, OrderId, PaymentId, PaymentStatus, Product, Wishlist,
};
use tracing::{debug, instrument};
use url::Url;
use uuid::Uuid;

use super::cache::ProductCache;
use super::payloads::{
    CartPayload, CouponPayload, CouponValidationPayload, InitiatePaymentBody, OrderPayload,
    PaymentPayload, PlaceOrderBody, ProductPayload, VerifyPaymentBody, VerifyPaymentPayload,
    WishlistPayload, convert_cart, convert_coupon, convert_coupon_validation, convert_order,
    convert_payment, convert_product, convert_verification, convert_wishlist, error_message,
};
use super::{
    AddToCart, BackendError, CommerceBackend, CouponValidation, OrderRecord, PaymentRecord,
    PlaceOrder,
};
use crate::config::StorefrontConfig;

/// Longest body excerpt kept in logs and errors.
const BODY_EXCERPT: usize = 500;

// =============================================================================
// RestBackend
// =============================================================================

/// Client for the commerce REST API.
///
/// Cheap to clone; clones share the connection pool and product cache.
#[derive(Clone)]
pub struct RestBackend {
    inner: Arc<RestBackendInner>,
}

struct RestBackendInner {
    client: reqwest::Client,
    base_url: Url,
    token: Option<SecretString>,
    products: ProductCache,
}

#[derive(serde::Serialize)]
struct QuantityBody {
    quantity: u32,
}

impl RestBackend {
    /// Create a new client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &StorefrontConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(RestBackendInner {
                client,
                base_url: config.api_url.clone(),
                token: config.api_token.clone(),
                products: ProductCache::new(config.product_cache_ttl),
            }),
        })
    }

    /// Drop a cached product so the next fetch goes to the backend.
    pub async fn invalidate_product(&self, model_no: ModelNo) {
        self.inner.products.invalidate(model_no).await;
    }

    /// Build an endpoint URL below the configured base.
    fn url(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| BackendError::InvalidPayload("API URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self
            .inner
            .client
            .request(method, url)
            .header("X-Request-Id", Uuid::new_v4().to_string())
            .header("Accept", "application/json");
        match &self.inner.token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    /// Send a request and return the body of a successful response.
    async fn send(&self, builder: RequestBuilder) -> Result<String, BackendError> {
        let response = builder.send().await?;
        let status = response.status();

        // Check for rate limiting
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(BackendError::RateLimited(retry_after));
        }

        // Get response body as text first for better error diagnostics
        let body = response.text().await?;

        if status == StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound(
                error_message(&body).unwrap_or_else(|| excerpt(&body)),
            ));
        }

        if status.is_client_error()
            && let Some(message) = error_message(&body)
        {
            debug!(status = %status, message = %message, "Backend rejected request");
            return Err(BackendError::Rejected(message));
        }

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %excerpt(&body),
                "Backend returned non-success status"
            );
            return Err(BackendError::Status {
                status: status.as_u16(),
                body: excerpt(&body),
            });
        }

        Ok(body)
    }

    /// Send a request and parse the JSON response.
    async fn execute<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, BackendError> {
        let body = self.send(builder).await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %excerpt(&body),
                "Failed to parse backend response"
            );
            BackendError::Parse(e)
        })
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, BackendError> {
        let url = self.url(segments)?;
        self.execute(self.request(Method::GET, url)).await
    }
}

fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT).collect()
}

// =============================================================================
// CommerceBackend
// =============================================================================

impl CommerceBackend for RestBackend {
    // -------------------------------------------------------------------------
    // Cart (not cached - mutable state)
    // -------------------------------------------------------------------------

    #[instrument(skip(self))]
    async fn fetch_cart(&self) -> Result<Cart, BackendError> {
        let payload: CartPayload = self.get(&["cart"]).await?;
        Ok(convert_cart(payload))
    }

    #[instrument(skip(self, request), fields(model_no = %request.model_no, quantity = request.quantity))]
    async fn add_to_cart(&self, request: &AddToCart) -> Result<Cart, BackendError> {
        let url = self.url(&["cart", "add"])?;
        let payload: CartPayload = self
            .execute(self.request(Method::POST, url).json(request))
            .await?;
        Ok(convert_cart(payload))
    }

    #[instrument(skip(self), fields(cart_line_id = %line_id))]
    async fn remove_cart_line(&self, line_id: CartLineId) -> Result<Cart, BackendError> {
        let id = line_id.to_string();
        let url = self.url(&["cart", "item", &id])?;
        let payload: CartPayload = self.execute(self.request(Method::DELETE, url)).await?;
        Ok(convert_cart(payload))
    }

    #[instrument(skip(self), fields(cart_line_id = %line_id))]
    async fn update_cart_line(
        &self,
        line_id: CartLineId,
        quantity: u32,
    ) -> Result<Cart, BackendError> {
        let id = line_id.to_string();
        let url = self.url(&["cart", "item", &id])?;
        let payload: CartPayload = self
            .execute(self.request(Method::PUT, url).json(&QuantityBody { quantity }))
            .await?;
        Ok(convert_cart(payload))
    }

    #[instrument(skip(self))]
    async fn clear_cart(&self) -> Result<(), BackendError> {
        let url = self.url(&["cart", "clear"])?;
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Wishlist
    // -------------------------------------------------------------------------

    #[instrument(skip(self))]
    async fn fetch_wishlist(&self) -> Result<Wishlist, BackendError> {
        let payload: WishlistPayload = self.get(&["wishlist"]).await?;
        Ok(convert_wishlist(payload))
    }

    #[instrument(skip(self), fields(model_no = %model_no))]
    async fn add_to_wishlist(&self, model_no: ModelNo) -> Result<Wishlist, BackendError> {
        let id = model_no.to_string();
        let url = self.url(&["wishlist", "add", &id])?;
        let payload: WishlistPayload = self.execute(self.request(Method::POST, url)).await?;
        Ok(convert_wishlist(payload))
    }

    #[instrument(skip(self), fields(model_no = %model_no))]
    async fn remove_from_wishlist(&self, model_no: ModelNo) -> Result<Wishlist, BackendError> {
        let id = model_no.to_string();
        let url = self.url(&["wishlist", "remove", &id])?;
        let payload: WishlistPayload = self.execute(self.request(Method::DELETE, url)).await?;
        Ok(convert_wishlist(payload))
    }

    // -------------------------------------------------------------------------
    // Coupons
    // -------------------------------------------------------------------------

    #[instrument(skip(self), fields(cart_value = %cart_value))]
    async fn validate_coupon(
        &self,
        code: &str,
        cart_value: Decimal,
    ) -> Result<CouponValidation, BackendError> {
        let mut url = self.url(&["coupons", "validate"])?;
        url.query_pairs_mut()
            .append_pair("code", code)
            .append_pair("cartValue", &cart_value.to_string());
        let payload: CouponValidationPayload =
            self.execute(self.request(Method::GET, url)).await?;
        Ok(convert_coupon_validation(payload, code))
    }

    #[instrument(skip(self))]
    async fn active_coupons(&self) -> Result<Vec<Coupon>, BackendError> {
        let payload: Vec<CouponPayload> = self.get(&["coupons", "active"]).await?;
        Ok(payload.into_iter().map(convert_coupon).collect())
    }

    #[instrument(skip(self))]
    async fn is_first_order(&self) -> Result<bool, BackendError> {
        self.get(&["orders", "check-first-order"]).await
    }

    // -------------------------------------------------------------------------
    // Orders & Payments
    // -------------------------------------------------------------------------

    #[instrument(skip(self, request), fields(payment_method = request.payment_method.as_str(), total = %request.total))]
    async fn place_order(&self, request: &PlaceOrder) -> Result<OrderRecord, BackendError> {
        let url = self.url(&["orders", "place"])?;
        let payload: OrderPayload = self
            .execute(self.request(Method::POST, url).json(&PlaceOrderBody::from(request)))
            .await?;
        convert_order(payload)
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    async fn fetch_order(&self, order_id: OrderId) -> Result<OrderRecord, BackendError> {
        let id = order_id.to_string();
        let payload: OrderPayload = self.get(&["orders", &id]).await?;
        convert_order(payload)
    }

    #[instrument(skip(self))]
    async fn my_orders(&self) -> Result<Vec<OrderRecord>, BackendError> {
        let payload: Vec<OrderPayload> = self.get(&["orders", "my-orders"]).await?;
        payload.into_iter().map(convert_order).collect()
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    async fn cancel_order(&self, order_id: OrderId) -> Result<(), BackendError> {
        let id = order_id.to_string();
        let url = self.url(&["orders", &id, "cancel"])?;
        self.send(self.request(Method::POST, url)).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    async fn initiate_payment(&self, order_id: OrderId) -> Result<PaymentRecord, BackendError> {
        let url = self.url(&["payments", "initiate"])?;
        let payload: PaymentPayload = self
            .execute(
                self.request(Method::POST, url)
                    .json(&InitiatePaymentBody { order_id }),
            )
            .await?;
        Ok(convert_payment(payload))
    }

    #[instrument(skip(self, transaction_id), fields(payment_id = %payment_id))]
    async fn verify_payment(
        &self,
        payment_id: PaymentId,
        transaction_id: &str,
    ) -> Result<PaymentStatus, BackendError> {
        let url = self.url(&["payments", "verify"])?;
        let body = VerifyPaymentBody {
            payment_id: payment_id.to_string(),
            transaction_id,
        };
        let payload: VerifyPaymentPayload = self
            .execute(self.request(Method::POST, url).json(&body))
            .await?;
        convert_verification(payload)
    }

    // -------------------------------------------------------------------------
    // Catalog (cached)
    // -------------------------------------------------------------------------

    #[instrument(skip(self), fields(model_no = %model_no))]
    async fn fetch_product(&self, model_no: ModelNo) -> Result<Product, BackendError> {
        // Check cache
        if let Some(product) = self.inner.products.get(model_no).await {
            debug!("Cache hit for product");
            return Ok(Product::clone(&product));
        }

        let id = model_no.to_string();
        let payload: ProductPayload = self.get(&["products", &id]).await?;
        let product = convert_product(payload)?;

        // Cache the result
        self.inner.products.insert(product.clone()).await;

        Ok(product)
    }
}
