//! Live commands against the configured commerce backend.

use std::path::Path;

use chrono::Utc;
use serde_json::{Value, json};
use solemate_core::{CartLineId, Identity, ModelNo, Price};
use solemate_storefront::backend::payloads::{IdentityPayload, convert_identity};
use solemate_storefront::backend::AddToCart;
use solemate_storefront::{RestBackend, Storefront, StorefrontConfig};

use super::{CliError, emit, read_json};
use crate::{CartAction, OrderAction};

fn load_identity(path: &Path) -> Result<Identity, CliError> {
    let payload: IdentityPayload = read_json(path)?;
    Ok(convert_identity(payload))
}

async fn signed_in(
    config: StorefrontConfig,
    identity_path: &Path,
) -> Result<Storefront<RestBackend>, CliError> {
    let identity = load_identity(identity_path)?;
    tracing::info!(user_id = %identity.user_id, role = %identity.role, "Signing in");

    let storefront = Storefront::connect(config)?;
    storefront.sign_in(Some(identity)).await?;
    Ok(storefront)
}

/// Fetch a product and show its variants with current prices.
pub async fn product(
    config: StorefrontConfig,
    model_no: ModelNo,
    refresh: bool,
) -> Result<(), CliError> {
    let storefront = Storefront::connect(config)?;
    if refresh {
        storefront.backend().invalidate_product(model_no).await;
    }

    let page = storefront.product(model_no).await?;
    let now = Utc::now();
    let matrix = page.matrix();
    let product = page.product();

    emit(&json!({
        "modelNo": product.model_no,
        "name": product.name,
        "brand": product.brand,
        "displayPrice": page.display_price(now),
        "colors": matrix.colors().iter().map(|color| json!({
            "name": color.name,
            "hex": color.hex,
            "sizes": matrix.sizes_for(&color.name).iter().map(|size| json!({
                "size": size,
                "outOfStock": matrix.is_out_of_stock(&color.name, size),
                "price": matrix
                    .resolve(&color.name, size)
                    .map(|v| solemate_core::pricing::quote_variant(v, now)),
            })).collect::<Vec<_>>(),
        })).collect::<Vec<_>>(),
    }))
}

/// Show or change the shopper's cart.
pub async fn cart(
    config: StorefrontConfig,
    identity_path: &Path,
    action: CartAction,
) -> Result<(), CliError> {
    let currency = config.currency;
    let storefront = signed_in(config, identity_path).await?;
    let cart = storefront.cart();

    match action {
        CartAction::Show => {}
        CartAction::Add {
            model_no,
            color,
            size,
            quantity,
        } => {
            cart.add(AddToCart {
                model_no,
                color,
                size,
                quantity,
            })
            .await?;
        }
        CartAction::Set { line, quantity } => {
            cart.set_quantity(CartLineId::new(line), quantity).await?;
        }
        CartAction::Remove { line } => {
            cart.remove(CartLineId::new(line)).await?;
        }
        CartAction::Clear => cart.clear().await?,
    }

    let current = cart.cart();
    emit(&json!({
        "cart": current,
        "itemCount": current.item_count(),
        "total": current.total(),
        "formattedTotal": Price::new(current.total(), currency).to_string(),
        "wishlist": cart.wishlist(),
    }))
}

/// Show checkout totals, optionally with a coupon and the active offers.
pub async fn checkout(
    config: StorefrontConfig,
    identity_path: &Path,
    coupon: Option<&str>,
    offers: bool,
) -> Result<(), CliError> {
    let currency = config.currency;
    let storefront = signed_in(config, identity_path).await?;
    let mut session = storefront.checkout();

    let rejection = match coupon {
        Some(code) => session.apply_coupon(code).await.err().map(|e| e.to_string()),
        None => None,
    };

    let offers: Vec<Value> = if offers {
        session
            .available_coupons()
            .await?
            .into_iter()
            .map(|offer| {
                json!({
                    "code": offer.coupon.code,
                    "description": offer.coupon.description,
                    "applicable": offer.is_applicable(),
                    "discount": offer.evaluation.as_ref().ok().map(|a| a.amount),
                    "reason": offer.evaluation.as_ref().err().map(ToString::to_string),
                })
            })
            .collect()
    } else {
        Vec::new()
    };

    let quote = session.quote();
    emit(&json!({
        "formattedTotal": Price::new(quote.totals.total, currency).to_string(),
        "quote": quote,
        "couponError": rejection,
        "offers": offers,
    }))
}

/// List, track or cancel orders.
pub async fn orders(
    config: StorefrontConfig,
    identity_path: &Path,
    action: OrderAction,
) -> Result<(), CliError> {
    let storefront = signed_in(config, identity_path).await?;
    let orders = storefront.orders();

    match action {
        OrderAction::List => emit(&orders.my_orders().await?),
        OrderAction::Track { order_id } => emit(&orders.refresh(order_id).await?),
        OrderAction::Cancel { order_id } => emit(&orders.cancel(order_id).await?),
    }
}
