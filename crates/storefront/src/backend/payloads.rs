//! Wire payloads and their conversion into domain types.
//!
//! The backend speaks camelCase JSON with a few loosely typed fields: roles
//! arrive as a single string or an array (optionally `ROLE_` prefixed),
//! timestamps may or may not carry an offset, and a flash sale is only real
//! when both its price and end time are present. All of that is settled here
//! so nothing past this module sees the raw shapes.

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solemate_core::{
    Cart, CartLine, CartLineId, Color, Coupon, CouponId, DiscountType, FlashSale, Identity,
    ImageId, ModelNo, OrderId, OrderLine, OrderStatus, PaymentId, PaymentMethod, PaymentStatus,
    Product, Role, ShippingAddress, TrackingEvent, UserId, Variant, VariantId, VariantImage,
    Wishlist, WishlistItem, WishlistItemId, coupon::normalize_code, round_money,
};
use tracing::warn;

use super::{BackendError, CouponValidation, OrderRecord, PaymentRecord, PlaceOrder};

// =============================================================================
// Shared
// =============================================================================

/// Summary of a product embedded in cart, wishlist and order payloads.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummaryPayload {
    pub model_no: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub img1: Option<String>,
}

/// Parse a backend timestamp. Offset-less values are taken as UTC.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
                .map(|naive| naive.and_utc())
                .ok()
        })
}

fn optional_timestamp(raw: Option<&str>, field: &str) -> Option<DateTime<Utc>> {
    let raw = raw?;
    let parsed = parse_timestamp(raw);
    if parsed.is_none() && !raw.trim().is_empty() {
        warn!(field, value = raw, "Ignoring unparseable timestamp");
    }
    parsed
}

/// Clamp a signed wire quantity into `u32`, warning on negatives.
fn quantity(raw: i64, context: &str) -> u32 {
    u32::try_from(raw).unwrap_or_else(|_| {
        warn!(quantity = raw, context, "Clamping out-of-range quantity");
        if raw < 0 { 0 } else { u32::MAX }
    })
}

// =============================================================================
// Identity
// =============================================================================

/// A role entry: a bare string or an object carrying the name.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RoleEntry {
    Name(String),
    Object {
        #[serde(alias = "authority")]
        name: String,
    },
}

impl RoleEntry {
    fn as_str(&self) -> &str {
        match self {
            Self::Name(name) | Self::Object { name } => name,
        }
    }
}

/// `roles` as either a single entry or an array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(RoleEntry),
    Many(Vec<RoleEntry>),
}

/// Authenticated user as returned by the auth collaborator.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityPayload {
    #[serde(alias = "userId")]
    pub id: i64,
    #[serde(default, alias = "username")]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub roles: Option<OneOrMany>,
}

/// Normalize an identity payload into a single canonical role.
#[must_use]
pub fn convert_identity(payload: IdentityPayload) -> Identity {
    let mut raw: Vec<&str> = Vec::new();
    match &payload.roles {
        Some(OneOrMany::One(entry)) => raw.push(entry.as_str()),
        Some(OneOrMany::Many(entries)) => raw.extend(entries.iter().map(RoleEntry::as_str)),
        None => {}
    }
    if let Some(role) = payload.role.as_deref() {
        raw.push(role);
    }

    let mut identity = Identity::new(UserId::new(payload.id), payload.name, Role::normalize(raw));
    identity.email = payload.email;
    identity
}

// =============================================================================
// Catalog
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPayload {
    pub model_no: i64,
    #[serde(default)]
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub brand_name: Option<String>,
    #[serde(default)]
    pub variants: Vec<VariantPayload>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantPayload {
    pub id: i64,
    pub price: Decimal,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub sale_price: Option<Decimal>,
    #[serde(default)]
    pub sale_end_time: Option<String>,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub color_hex: Option<String>,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub images: Vec<ImagePayload>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePayload {
    pub id: i64,
    pub image_url: String,
    #[serde(default)]
    pub is_primary: Option<bool>,
}

/// Convert and validate a product.
///
/// # Errors
///
/// Returns [`BackendError::InvalidPayload`] if the product breaks a catalog
/// invariant (duplicate color/size pair, several primary images).
pub fn convert_product(payload: ProductPayload) -> Result<Product, BackendError> {
    let model_no = ModelNo::new(payload.model_no);
    let variants = payload
        .variants
        .into_iter()
        .map(|v| convert_variant(model_no, v))
        .collect();

    let product = Product {
        model_no,
        name: payload.name,
        brand: payload.brand_name.unwrap_or_default(),
        description: payload.description.unwrap_or_default(),
        base_price: round_money(payload.price),
        variants,
    };

    product
        .validate()
        .map_err(|e| BackendError::InvalidPayload(format!("product {model_no}: {e}")))?;
    Ok(product)
}

fn convert_variant(model_no: ModelNo, payload: VariantPayload) -> Variant {
    let ends_at = optional_timestamp(payload.sale_end_time.as_deref(), "saleEndTime");
    let flash_sale = match (payload.sale_price, ends_at) {
        (Some(price), Some(ends_at)) => Some(FlashSale {
            price: round_money(price),
            ends_at,
        }),
        _ => None,
    };

    let hex = payload
        .color_hex
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| payload.color.clone());

    Variant {
        id: VariantId::new(payload.id),
        sku: payload.sku.unwrap_or_default(),
        model_no,
        color: Color::new(payload.color, hex),
        size: payload.size,
        price: round_money(payload.price),
        flash_sale,
        quantity_on_hand: quantity(payload.quantity, "variant stock"),
        images: payload
            .images
            .into_iter()
            .map(|img| VariantImage {
                id: ImageId::new(img.id),
                url: img.image_url,
                primary: img.is_primary.unwrap_or(false),
            })
            .collect(),
    }
}

// =============================================================================
// Cart & Wishlist
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartPayload {
    #[serde(default)]
    pub cart_id: Option<i64>,
    #[serde(default)]
    pub items: Vec<CartItemPayload>,
    #[serde(default)]
    pub total_amount: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemPayload {
    pub id: i64,
    #[serde(default)]
    pub product: Option<ProductSummaryPayload>,
    #[serde(default)]
    pub variant_id: Option<i64>,
    pub price: Decimal,
    pub quantity: i64,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub color_hex: Option<String>,
}

/// Convert a cart, dropping lines that cannot be referenced or have no units.
#[must_use]
pub fn convert_cart(payload: CartPayload) -> Cart {
    let lines: Vec<CartLine> = payload
        .items
        .into_iter()
        .filter_map(|item| {
            let (Some(product), Some(variant_id)) = (item.product, item.variant_id) else {
                warn!(cart_line_id = item.id, "Dropping cart line without product or variant");
                return None;
            };
            if item.quantity < 1 {
                warn!(
                    cart_line_id = item.id,
                    quantity = item.quantity,
                    "Dropping cart line with no units"
                );
                return None;
            }
            let color = item.color.unwrap_or_default();
            Some(CartLine {
                id: CartLineId::new(item.id),
                variant_id: VariantId::new(variant_id),
                model_no: ModelNo::new(product.model_no),
                product_name: product.name,
                color_hex: item.color_hex.unwrap_or_else(|| color.clone()),
                color,
                size: item.size.unwrap_or_default(),
                quantity: quantity(item.quantity, "cart line"),
                unit_price: round_money(item.price),
                image_url: product.img1,
            })
        })
        .collect();

    let cart = Cart::from_lines(lines);
    if let Some(reported) = payload.total_amount
        && round_money(reported) != cart.total()
    {
        warn!(
            cart_id = ?payload.cart_id,
            reported = %reported,
            computed = %cart.total(),
            "Cart total differs from line sum; using line sum"
        );
    }
    cart
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistPayload {
    #[serde(default)]
    pub items: Vec<WishlistItemPayload>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItemPayload {
    pub id: i64,
    #[serde(default)]
    pub product_model_no: Option<i64>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub product: Option<ProductSummaryPayload>,
}

/// Convert a wishlist, dropping items without a product reference.
#[must_use]
pub fn convert_wishlist(payload: WishlistPayload) -> Wishlist {
    let items = payload
        .items
        .into_iter()
        .filter_map(|item| {
            let model_no = item
                .product_model_no
                .or_else(|| item.product.as_ref().map(|p| p.model_no));
            let Some(model_no) = model_no else {
                warn!(wishlist_item_id = item.id, "Dropping wishlist item without product");
                return None;
            };
            let name = item
                .product_name
                .or_else(|| item.product.map(|p| p.name))
                .unwrap_or_default();
            Some(WishlistItem {
                id: WishlistItemId::new(item.id),
                model_no: ModelNo::new(model_no),
                name,
                price: round_money(item.price),
            })
        })
        .collect();
    Wishlist { items }
}

// =============================================================================
// Coupons
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponPayload {
    pub id: i64,
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    #[serde(default)]
    pub max_discount: Option<Decimal>,
    #[serde(default)]
    pub min_order_amount: Option<Decimal>,
    #[serde(default)]
    pub valid_from: Option<String>,
    #[serde(default)]
    pub valid_until: Option<String>,
    #[serde(default)]
    pub usage_limit: u32,
    #[serde(default)]
    pub used_count: u32,
    #[serde(default, alias = "isActive")]
    pub active: Option<bool>,
    #[serde(default, alias = "isFirstOrderOnly")]
    pub first_order_only: Option<bool>,
}

/// Convert a coupon, normalizing its code.
#[must_use]
pub fn convert_coupon(payload: CouponPayload) -> Coupon {
    Coupon {
        id: CouponId::new(payload.id),
        code: normalize_code(&payload.code),
        description: payload.description,
        discount_type: payload.discount_type,
        discount_value: payload.discount_value,
        max_discount: payload.max_discount,
        min_order_amount: payload.min_order_amount.filter(|m| !m.is_zero()),
        valid_from: optional_timestamp(payload.valid_from.as_deref(), "validFrom"),
        valid_until: optional_timestamp(payload.valid_until.as_deref(), "validUntil"),
        usage_limit: payload.usage_limit,
        used_count: payload.used_count,
        active: payload.active.unwrap_or(true),
        first_order_only: payload.first_order_only.unwrap_or(false),
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponValidationPayload {
    pub valid: bool,
    #[serde(default, alias = "discountAmount")]
    pub discount: Option<Decimal>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub coupon_id: Option<i64>,
    #[serde(default)]
    pub code: Option<String>,
}

/// Convert a validation response. `requested` is the code that was sent.
#[must_use]
pub fn convert_coupon_validation(
    payload: CouponValidationPayload,
    requested: &str,
) -> CouponValidation {
    if payload.valid {
        CouponValidation::Accepted {
            coupon_id: payload.coupon_id.map(CouponId::new),
            code: normalize_code(payload.code.as_deref().unwrap_or(requested)),
            discount: round_money(payload.discount.unwrap_or_default().max(Decimal::ZERO)),
        }
    } else {
        CouponValidation::Rejected {
            message: payload
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| "Invalid coupon code".to_string()),
        }
    }
}

// =============================================================================
// Orders & Payments
// =============================================================================

/// Body of `POST /orders/place`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderBody<'a> {
    pub items: Vec<OrderItemBody>,
    pub shipping_address: &'a ShippingAddress,
    pub payment_method: &'static str,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount: Decimal,
    pub coupon_id: Option<CouponId>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemBody {
    pub variant_id: VariantId,
    pub model_no: ModelNo,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

impl<'a> From<&'a PlaceOrder> for PlaceOrderBody<'a> {
    fn from(request: &'a PlaceOrder) -> Self {
        Self {
            items: request
                .lines
                .iter()
                .map(|line| OrderItemBody {
                    variant_id: line.variant_id,
                    model_no: line.model_no,
                    quantity: line.quantity,
                    price: line.unit_price,
                })
                .collect(),
            shipping_address: &request.shipping_address,
            payment_method: request.payment_method.as_str(),
            discount: request.discount,
            coupon_id: request.coupon_id,
            total_amount: request.total,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPayload {
    pub id: i64,
    #[serde(default)]
    pub items: Vec<OrderItemPayload>,
    #[serde(default)]
    pub total_amount: Decimal,
    #[serde(default)]
    pub discount: Option<Decimal>,
    pub status: String,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
    #[serde(default)]
    pub tracking_history: Vec<TrackingPayload>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemPayload {
    #[serde(default)]
    pub product: Option<ProductSummaryPayload>,
    #[serde(default)]
    pub variant_id: Option<i64>,
    pub price: Decimal,
    pub quantity: i64,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingPayload {
    pub status: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub timestamp: String,
}

/// Map a backend status label onto the lifecycle.
#[must_use]
pub fn parse_order_status(raw: &str) -> Option<OrderStatus> {
    match raw.trim().to_ascii_uppercase().replace(['-', ' '], "_").as_str() {
        "PENDING" | "PLACED" => Some(OrderStatus::Placed),
        "AWAITING_PAYMENT" | "PAYMENT_PENDING" => Some(OrderStatus::AwaitingPayment),
        "PROCESSING" | "CONFIRMED" => Some(OrderStatus::Confirmed),
        "SHIPPED" | "OUT_FOR_DELIVERY" => Some(OrderStatus::Shipped),
        "DELIVERED" => Some(OrderStatus::Delivered),
        "CANCELLED" | "CANCELED" => Some(OrderStatus::Cancelled),
        "RETURNED" => Some(OrderStatus::Returned),
        "REFUNDED" => Some(OrderStatus::Refunded),
        _ => None,
    }
}

/// Convert an order.
///
/// # Errors
///
/// Returns [`BackendError::InvalidPayload`] for an unknown order status.
/// Tracking entries with unknown statuses or timestamps are skipped.
pub fn convert_order(payload: OrderPayload) -> Result<OrderRecord, BackendError> {
    let id = OrderId::new(payload.id);
    let status = parse_order_status(&payload.status).ok_or_else(|| {
        BackendError::InvalidPayload(format!("order {id}: unknown status '{}'", payload.status))
    })?;

    let lines = payload
        .items
        .into_iter()
        .filter_map(|item| {
            let Some(product) = item.product else {
                warn!(order_id = %id, "Dropping order line without product");
                return None;
            };
            Some(OrderLine {
                variant_id: item.variant_id.map(VariantId::new),
                model_no: ModelNo::new(product.model_no),
                product_name: product.name,
                color: item.color.unwrap_or_default(),
                size: item.size.unwrap_or_default(),
                quantity: quantity(item.quantity, "order line"),
                unit_price: round_money(item.price),
            })
        })
        .collect();

    let mut tracking: Vec<TrackingEvent> = payload
        .tracking_history
        .into_iter()
        .filter_map(|entry| convert_tracking(id, entry))
        .collect();
    tracking.sort_by_key(|event| event.at);

    let payment_method = payload.payment_method.as_deref().and_then(|raw| {
        raw.parse::<PaymentMethod>()
            .map_err(|e| warn!(order_id = %id, error = %e, "Ignoring payment method"))
            .ok()
    });

    Ok(OrderRecord {
        id,
        status,
        lines,
        discount: round_money(payload.discount.unwrap_or_default()),
        total: round_money(payload.total_amount),
        payment_method,
        shipping_address: payload.shipping_address,
        tracking,
    })
}

fn convert_tracking(order_id: OrderId, entry: TrackingPayload) -> Option<TrackingEvent> {
    let Some(status) = parse_order_status(&entry.status) else {
        warn!(order_id = %order_id, status = %entry.status, "Skipping tracking entry with unknown status");
        return None;
    };
    let Some(at) = parse_timestamp(&entry.timestamp) else {
        warn!(order_id = %order_id, timestamp = %entry.timestamp, "Skipping tracking entry with bad timestamp");
        return None;
    };
    let location = match (entry.city, entry.state) {
        (Some(city), Some(state)) => Some(format!("{city}, {state}")),
        (Some(place), None) | (None, Some(place)) => Some(place),
        (None, None) => None,
    };
    Some(TrackingEvent {
        status,
        at,
        description: entry.description.unwrap_or_default(),
        location,
    })
}

/// Body of `POST /payments/initiate`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentBody {
    pub order_id: OrderId,
}

/// Body of `POST /payments/verify`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentBody<'a> {
    /// Sent as a string; the backend reads the body as a string map.
    pub payment_id: String,
    pub transaction_id: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload {
    pub id: i64,
    pub order_id: i64,
    #[serde(default)]
    pub amount: Decimal,
    #[serde(default)]
    pub status: PaymentStatus,
    #[serde(default)]
    pub qr_code_data: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
}

#[must_use]
pub fn convert_payment(payload: PaymentPayload) -> PaymentRecord {
    PaymentRecord {
        id: PaymentId::new(payload.id),
        order_id: OrderId::new(payload.order_id),
        amount: round_money(payload.amount),
        status: payload.status,
        upi_uri: payload.qr_code_data.filter(|s| !s.is_empty()),
        transaction_id: payload.transaction_id,
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentPayload {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
}

/// Resolve the payment status from a verify response.
///
/// # Errors
///
/// Returns [`BackendError::Rejected`] when the response reports an error.
pub fn convert_verification(payload: VerifyPaymentPayload) -> Result<PaymentStatus, BackendError> {
    if payload
        .status
        .as_deref()
        .is_some_and(|s| s.eq_ignore_ascii_case("error"))
    {
        return Err(BackendError::Rejected(
            payload
                .message
                .unwrap_or_else(|| "payment verification failed".to_string()),
        ));
    }
    Ok(payload.payment_status.unwrap_or(PaymentStatus::Completed))
}

/// Extract a human-readable message from an error body.
#[must_use]
pub fn error_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        #[serde(default, alias = "error")]
        message: Option<String>,
    }

    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn identity(value: serde_json::Value) -> Identity {
        convert_identity(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn test_identity_single_role() {
        let id = identity(json!({"id": 7, "name": "Asha", "role": "USER"}));
        assert_eq!(id.role, Role::User);
        assert!(id.is_shopper());
    }

    #[test]
    fn test_identity_roles_array_with_prefix() {
        let id = identity(json!({"id": 7, "name": "Ravi", "roles": ["ROLE_USER", "ROLE_ADMIN"]}));
        assert_eq!(id.role, Role::Admin);
        assert!(!id.is_shopper());
    }

    #[test]
    fn test_identity_roles_as_single_string_and_objects() {
        let id = identity(json!({"userId": 3, "username": "m", "roles": "ROLE_MODERATOR"}));
        assert_eq!(id.role, Role::Moderator);
        assert_eq!(id.name, "m");

        let id = identity(json!({"id": 4, "roles": [{"authority": "ROLE_SUPER_ADMIN"}]}));
        assert_eq!(id.role, Role::SuperAdmin);
    }

    #[test]
    fn test_identity_unknown_role_is_user() {
        let id = identity(json!({"id": 5, "email": "x@y.z", "roles": ["ROLE_GUEST"]}));
        assert_eq!(id.role, Role::User);
        assert_eq!(id.email.as_deref(), Some("x@y.z"));
    }

    #[test]
    fn test_parse_timestamp_shapes() {
        let expected = Utc.with_ymd_and_hms(2026, 5, 10, 12, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2026-05-10T12:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2026-05-10T17:30:00+05:30"), Some(expected));
        assert_eq!(parse_timestamp("2026-05-10T12:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2026-05-10T12:00:00.000"), Some(expected));
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("tomorrow"), None);
    }

    fn product_json() -> serde_json::Value {
        json!({
            "modelNo": 1001,
            "name": "Trail Runner",
            "price": 2999.0,
            "brandName": "SoleMate",
            "variants": [
                {
                    "id": 1, "price": 2999.0, "quantity": 4,
                    "color": "Black", "colorHex": "#000000", "size": "9",
                    "salePrice": 2499.0, "saleEndTime": "2026-05-10T12:00:00",
                    "images": [
                        {"id": 10, "imageUrl": "https://cdn/1.jpg", "isPrimary": false},
                        {"id": 11, "imageUrl": "https://cdn/2.jpg", "isPrimary": true}
                    ]
                },
                {
                    "id": 2, "price": 3099.0, "quantity": -2,
                    "color": "Red", "size": "9", "salePrice": 1999.0
                }
            ]
        })
    }

    #[test]
    fn test_convert_product() {
        let product = convert_product(serde_json::from_value(product_json()).unwrap()).unwrap();
        assert_eq!(product.model_no, ModelNo::new(1001));
        assert_eq!(product.brand, "SoleMate");

        let black = &product.variants[0];
        assert_eq!(black.model_no, product.model_no);
        assert_eq!(black.flash_sale.unwrap().price, d("2499"));
        assert_eq!(black.primary_image().unwrap().id, ImageId::new(11));

        let red = &product.variants[1];
        assert_eq!(red.quantity_on_hand, 0);
        assert!(red.flash_sale.is_none(), "sale price without end time is ignored");
        assert_eq!(red.color.hex, "Red");
    }

    #[test]
    fn test_convert_product_rejects_duplicates() {
        let mut value = product_json();
        value["variants"][1]["color"] = json!("Black");
        let err = convert_product(serde_json::from_value(value).unwrap()).unwrap_err();
        assert!(matches!(err, BackendError::InvalidPayload(_)));
    }

    #[test]
    fn test_convert_cart_drops_bad_lines() {
        let payload: CartPayload = serde_json::from_value(json!({
            "cartId": 9,
            "items": [
                {"id": 1, "product": {"modelNo": 1001, "name": "Trail Runner"}, "variantId": 1,
                 "price": 2999.0, "quantity": 2, "size": "9", "color": "Black", "colorHex": "#000"},
                {"id": 2, "product": {"modelNo": 1001, "name": "Trail Runner"}, "variantId": 2,
                 "price": 3099.0, "quantity": 0, "size": "9", "color": "Red"},
                {"id": 3, "price": 10.0, "quantity": 1}
            ],
            "totalAmount": 5998.0
        }))
        .unwrap();

        let cart = convert_cart(payload);
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.total(), d("5998"));
        assert_eq!(cart.lines[0].color_hex, "#000");
    }

    #[test]
    fn test_convert_wishlist() {
        let payload: WishlistPayload = serde_json::from_value(json!({
            "id": 1, "userId": 7,
            "items": [
                {"id": 1, "productModelNo": 1001, "productName": "Trail Runner", "price": 2999.0},
                {"id": 2, "product": {"modelNo": 1002, "name": "Court Classic"}, "price": 1899.0},
                {"id": 3, "price": 1.0}
            ]
        }))
        .unwrap();
        let wishlist = convert_wishlist(payload);
        assert_eq!(wishlist.len(), 2);
        assert!(wishlist.contains(ModelNo::new(1002)));
        assert_eq!(wishlist.items[1].name, "Court Classic");
    }

    #[test]
    fn test_convert_coupon() {
        let payload: CouponPayload = serde_json::from_value(json!({
            "id": 4, "code": " save20 ", "discountType": "PERCENTAGE", "discountValue": 20.0,
            "maxDiscount": 100.0, "minOrderAmount": 200.0, "isActive": true,
            "validUntil": "2026-12-31T23:59:59", "usageLimit": 0, "usedCount": 3,
            "isFirstOrderOnly": false
        }))
        .unwrap();
        let coupon = convert_coupon(payload);
        assert_eq!(coupon.code, "SAVE20");
        assert_eq!(coupon.max_discount, Some(d("100")));
        assert!(coupon.active);
        assert!(coupon.valid_until.is_some());
    }

    #[test]
    fn test_convert_coupon_validation() {
        let accepted: CouponValidationPayload = serde_json::from_value(json!({
            "valid": true, "discountAmount": 100.0, "message": "ok", "code": "SAVE20"
        }))
        .unwrap();
        assert_eq!(
            convert_coupon_validation(accepted, "save20"),
            CouponValidation::Accepted {
                coupon_id: None,
                code: "SAVE20".to_string(),
                discount: d("100"),
            }
        );

        let rejected: CouponValidationPayload = serde_json::from_value(json!({
            "valid": false, "discount": 0, "message": "Minimum order amount is 200"
        }))
        .unwrap();
        assert_eq!(
            convert_coupon_validation(rejected, "save20"),
            CouponValidation::Rejected {
                message: "Minimum order amount is 200".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_order_status() {
        assert_eq!(parse_order_status("PENDING"), Some(OrderStatus::Placed));
        assert_eq!(parse_order_status("processing"), Some(OrderStatus::Confirmed));
        assert_eq!(parse_order_status("out-for-delivery"), Some(OrderStatus::Shipped));
        assert_eq!(parse_order_status("REFUNDED"), Some(OrderStatus::Refunded));
        assert_eq!(parse_order_status("LOST"), None);
    }

    #[test]
    fn test_convert_order() {
        let payload: OrderPayload = serde_json::from_value(json!({
            "id": 55,
            "items": [{"product": {"modelNo": 1001, "name": "Trail Runner"}, "price": 2999.0,
                       "quantity": 1, "size": "9", "color": "Black"}],
            "totalAmount": 2999.0,
            "discount": 0.0,
            "status": "SHIPPED",
            "trackingHistory": [
                {"status": "SHIPPED", "city": "Pune", "state": "MH", "description": "Left hub",
                 "timestamp": "2026-05-11T08:00:00"},
                {"status": "PENDING", "description": "Placed", "timestamp": "2026-05-10T08:00:00"},
                {"status": "TELEPORTED", "timestamp": "2026-05-12T08:00:00"}
            ]
        }))
        .unwrap();

        let record = convert_order(payload).unwrap();
        assert_eq!(record.status, OrderStatus::Shipped);
        assert_eq!(record.lines.len(), 1);
        assert_eq!(record.tracking.len(), 2);
        assert_eq!(record.tracking[0].status, OrderStatus::Placed);
        assert_eq!(record.tracking[1].location.as_deref(), Some("Pune, MH"));
    }

    #[test]
    fn test_convert_order_unknown_status() {
        let payload: OrderPayload =
            serde_json::from_value(json!({"id": 1, "status": "LIMBO"})).unwrap();
        assert!(matches!(
            convert_order(payload),
            Err(BackendError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_place_order_body_shape() {
        let request = PlaceOrder {
            lines: Vec::new(),
            shipping_address: ShippingAddress::default(),
            payment_method: PaymentMethod::Upi,
            discount: d("100"),
            coupon_id: Some(CouponId::new(4)),
            total: d("950.50"),
        };
        let value = serde_json::to_value(PlaceOrderBody::from(&request)).unwrap();
        assert_eq!(value["paymentMethod"], "upi");
        assert_eq!(value["couponId"], 4);
        assert_eq!(value["totalAmount"], 950.5);
        assert!(value["shippingAddress"].get("fullName").is_some());
    }

    #[test]
    fn test_convert_verification() {
        let ok: VerifyPaymentPayload = serde_json::from_value(
            json!({"status": "success", "paymentStatus": "COMPLETED"}),
        )
        .unwrap();
        assert_eq!(convert_verification(ok).unwrap(), PaymentStatus::Completed);

        let err: VerifyPaymentPayload =
            serde_json::from_value(json!({"status": "error", "message": "Invalid transaction"}))
                .unwrap();
        assert!(matches!(
            convert_verification(err),
            Err(BackendError::Rejected(ref m)) if m == "Invalid transaction"
        ));
    }

    #[test]
    fn test_error_message() {
        assert_eq!(
            error_message(r#"{"message":"Out of stock"}"#).as_deref(),
            Some("Out of stock")
        );
        assert_eq!(error_message(r#"{"error":"Bad"}"#).as_deref(), Some("Bad"));
        assert_eq!(error_message("<html>"), None);
    }
}
