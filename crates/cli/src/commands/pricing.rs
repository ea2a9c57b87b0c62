//! Offline pricing commands: checkout quotes, coupon checks, variant picks.
//!
//! Input files use the backend's wire format (`GET /coupons/active`,
//! `GET /products/{modelNo}`), so a saved response can be fed in directly.

use std::path::Path;

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use solemate_core::{
    CheckoutTotals, CouponEvaluator, CurrencyCode, EvaluationContext, Price, Product,
    ShippingRule, VariantMatrix, VariantSelection, pricing as price_rules,
};
use solemate_storefront::backend::payloads::{
    CouponPayload, ProductPayload, convert_coupon, convert_product,
};

use super::{CliError, emit, read_json};

/// Checkout totals for a subtotal and discount.
pub fn quote(
    subtotal: Decimal,
    discount: Decimal,
    threshold: Option<Decimal>,
    fee: Option<Decimal>,
    base: ShippingRule,
    currency: CurrencyCode,
) -> Result<(), CliError> {
    let rule = ShippingRule::new(
        threshold.unwrap_or(base.free_threshold),
        fee.unwrap_or(base.flat_fee),
    );
    emit(&quote_json(subtotal, discount, &rule, currency))
}

fn quote_json(
    subtotal: Decimal,
    discount: Decimal,
    rule: &ShippingRule,
    currency: CurrencyCode,
) -> Value {
    let totals = CheckoutTotals::compute(subtotal, rule, discount);
    let money = |amount| Price::new(amount, currency).to_string();
    json!({
        "subtotal": totals.subtotal,
        "shipping": totals.shipping,
        "discount": totals.discount,
        "total": totals.total,
        "freeShipping": totals.free_shipping(),
        "remainingForFreeShipping": rule.remaining_for_free(subtotal),
        "formatted": {
            "subtotal": money(totals.subtotal),
            "shipping": money(totals.shipping),
            "discount": money(totals.discount),
            "total": money(totals.total),
        },
    })
}

/// Evaluate a code against a coupon list file.
pub fn coupon(
    code: &str,
    coupons_path: &Path,
    cart_value: Decimal,
    prior_orders: Option<u64>,
) -> Result<(), CliError> {
    let payloads: Vec<CouponPayload> = read_json(coupons_path)?;
    emit(&coupon_json(payloads, code, cart_value, prior_orders))
}

fn coupon_json(
    payloads: Vec<CouponPayload>,
    code: &str,
    cart_value: Decimal,
    prior_orders: Option<u64>,
) -> Value {
    let coupons: Vec<_> = payloads.into_iter().map(convert_coupon).collect();

    let mut ctx = EvaluationContext::new(Utc::now(), cart_value);
    if let Some(count) = prior_orders {
        ctx = ctx.with_prior_orders(count);
    }

    match CouponEvaluator::evaluate_code(&coupons, code, &ctx) {
        Ok(applied) => json!({
            "code": applied.code,
            "accepted": true,
            "discount": applied.amount,
        }),
        Err(rejection) => json!({
            "code": code,
            "accepted": false,
            "reason": rejection.to_string(),
        }),
    }
}

/// Resolve a color/size pick against a product file.
pub fn variant(path: &Path, color: Option<&str>, size: Option<&str>) -> Result<(), CliError> {
    let payload: ProductPayload = read_json(path)?;
    let product = convert_product(payload)?;
    emit(&variant_json(&product, color, size))
}

fn variant_json(product: &Product, color: Option<&str>, size: Option<&str>) -> Value {
    let matrix = VariantMatrix::new(product);
    let mut selection = VariantSelection::initial(&matrix);
    if let Some(color) = color {
        selection.select_color(color);
    }
    let size_error = size.and_then(|size| selection.select_size(&matrix, size).err());

    let now = Utc::now();
    let shown = selection.display_variant(&matrix);
    let purchasable = selection.require_variant(&matrix);

    json!({
        "modelNo": product.model_no,
        "colors": matrix.colors().iter().map(|c| &c.name).collect::<Vec<_>>(),
        "color": selection.color(),
        "size": selection.size(),
        "sizes": selection.available_sizes(&matrix),
        "sizeError": size_error.map(|e| e.to_string()),
        "shown": shown.map(|v| json!({
            "sku": v.sku,
            "price": price_rules::quote_variant(v, now),
            "images": VariantMatrix::images_for(v).iter().map(|i| &i.url).collect::<Vec<_>>(),
        })),
        "displayPrice": price_rules::display_price(product, shown, now),
        "purchasable": purchasable.is_ok(),
        "reason": purchasable.err().map(|e| e.to_string()),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn amount(value: &Value) -> Decimal {
        serde_json::from_value(value.clone()).unwrap()
    }

    fn coupons() -> Vec<CouponPayload> {
        serde_json::from_value(json!([
            {
                "id": 1,
                "code": "save20",
                "discountType": "PERCENTAGE",
                "discountValue": 20,
                "maxDiscount": 100,
                "minOrderAmount": 200,
                "usageLimit": 0,
                "usedCount": 0,
                "isActive": true
            },
            {
                "id": 2,
                "code": "WELCOME",
                "discountType": "FIXED",
                "discountValue": 150,
                "isFirstOrderOnly": true
            }
        ]))
        .unwrap()
    }

    #[test]
    fn test_quote_applies_shipping_threshold() {
        let rule = ShippingRule::default();
        let below = quote_json(d("450"), Decimal::ZERO, &rule, CurrencyCode::INR);
        assert_eq!(amount(&below["total"]), d("500"));
        assert_eq!(below["freeShipping"], json!(false));
        assert_eq!(below["formatted"]["shipping"], json!("₹50.00"));
        assert_eq!(below["formatted"]["total"], json!("₹500.00"));

        let above = quote_json(d("600"), d("1000"), &rule, CurrencyCode::USD);
        assert_eq!(amount(&above["total"]), Decimal::ZERO);
        assert_eq!(above["freeShipping"], json!(true));
        assert_eq!(above["formatted"]["total"], json!("$0.00"));
    }

    #[test]
    fn test_coupon_accepts_case_insensitive_code() {
        let out = coupon_json(coupons(), " Save20 ", d("1000"), None);
        assert_eq!(out["accepted"], json!(true));
        assert_eq!(out["code"], json!("SAVE20"));
        assert_eq!(amount(&out["discount"]), d("100"));
    }

    #[test]
    fn test_coupon_reports_minimum() {
        let out = coupon_json(coupons(), "SAVE20", d("150"), None);
        assert_eq!(out["accepted"], json!(false));
        assert!(
            out["reason"]
                .as_str()
                .unwrap()
                .starts_with("minimum order not met")
        );
    }

    #[test]
    fn test_first_order_coupon_needs_order_count() {
        let unknown = coupon_json(coupons(), "WELCOME", d("1000"), None);
        assert_eq!(unknown["accepted"], json!(false));

        let first = coupon_json(coupons(), "WELCOME", d("1000"), Some(0));
        assert_eq!(first["accepted"], json!(true));
    }

    #[test]
    fn test_variant_from_product_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "{}",
            json!({
                "modelNo": 1001,
                "name": "Trail Runner",
                "price": 2999,
                "variants": [
                    {"id": 1, "price": 2999, "quantity": 3, "color": "Black", "size": "9",
                     "images": [{"id": 10, "imageUrl": "https://cdn.example.test/10.jpg", "isPrimary": true}]},
                    {"id": 2, "price": 3199, "quantity": 0, "color": "Red", "size": "9"}
                ]
            })
        )
        .unwrap();

        let payload: ProductPayload = read_json(file.path()).unwrap();
        let product = convert_product(payload).unwrap();

        let black = variant_json(&product, None, Some("9"));
        assert_eq!(black["color"], json!("Black"));
        assert_eq!(black["purchasable"], json!(true));

        let red = variant_json(&product, Some("Red"), Some("9"));
        assert_eq!(red["purchasable"], json!(false));
        assert_eq!(amount(&red["displayPrice"]), d("3199"));

        let missing = variant_json(&product, Some("Red"), Some("12"));
        assert!(missing["sizeError"].is_string());
        assert_eq!(missing["size"], Value::Null);
    }

    #[test]
    fn test_read_json_reports_path() {
        let err = read_json::<Vec<CouponPayload>>(Path::new("/nonexistent/coupons.json"))
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/coupons.json"));
    }
}
