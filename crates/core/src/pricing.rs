//! Effective price resolution under time-boxed flash sales.
//!
//! The only rule is the time window: a flash-sale price applies strictly
//! before its end timestamp. Merchandising data is taken as given, so a
//! "sale" price above the base price is still applied.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::types::{Product, Variant};

/// Price shown for a variant at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// Regular unit price.
    pub base: Decimal,
    /// Price the shopper pays right now.
    pub effective: Decimal,
    /// Whole-number percent off, never negative.
    pub discount_percent: u32,
    /// Whether a flash sale is running.
    pub on_sale: bool,
}

/// The price a variant sells at `now`.
#[must_use]
pub fn effective_price(variant: &Variant, now: DateTime<Utc>) -> Decimal {
    match variant.flash_sale {
        Some(sale) if now < sale.ends_at => sale.price,
        _ => variant.price,
    }
}

/// Whether a flash sale is effective at `now`.
#[must_use]
pub fn is_on_sale(variant: &Variant, now: DateTime<Utc>) -> bool {
    variant.flash_sale.is_some_and(|sale| now < sale.ends_at)
}

/// Time left on a running flash sale.
#[must_use]
pub fn flash_sale_remaining(variant: &Variant, now: DateTime<Utc>) -> Option<Duration> {
    variant
        .flash_sale
        .filter(|sale| now < sale.ends_at)
        .map(|sale| sale.ends_at - now)
}

/// `round((base - effective) / base * 100)`, clamped at zero.
///
/// Returns 0 when `base` is zero or `effective >= base`.
#[must_use]
pub fn discount_percent(base: Decimal, effective: Decimal) -> u32 {
    if base <= Decimal::ZERO || effective >= base {
        return 0;
    }
    ((base - effective) / base * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u32()
        .unwrap_or(0)
}

/// Full price breakdown for a variant.
#[must_use]
pub fn quote_variant(variant: &Variant, now: DateTime<Utc>) -> PriceQuote {
    let effective = effective_price(variant, now);
    PriceQuote {
        base: variant.price,
        effective,
        discount_percent: discount_percent(variant.price, effective),
        on_sale: is_on_sale(variant, now),
    }
}

/// Price to show on a product page: the display variant's effective price,
/// or the product base price when no variant resolves.
#[must_use]
pub fn display_price(product: &Product, variant: Option<&Variant>, now: DateTime<Utc>) -> Decimal {
    variant.map_or(product.base_price, |v| effective_price(v, now))
}
