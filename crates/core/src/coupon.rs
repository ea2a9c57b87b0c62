//! Coupon lifecycle evaluation.
//!
//! A coupon is checked against "now" and a candidate cart value. Checks run in
//! a fixed order and the first failing one is reported:
//!
//! 1. disabled by an administrator
//! 2. scheduled (valid-from in the future)
//! 3. expired (valid-until in the past)
//! 4. depleted (usage limit reached; limit 0 means unlimited)
//! 5. below the minimum order amount
//! 6. first-order-only restriction
//!
//! An accepted coupon yields a discount that never exceeds the cart value.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{CouponId, round_money};

/// How a coupon discounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    #[default]
    Percentage,
    Fixed,
}

/// A discount coupon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    /// Coupon ID.
    pub id: CouponId,
    /// Normalized code (see [`normalize_code`]).
    pub code: String,
    /// Short description shown to shoppers.
    pub description: Option<String>,
    /// Percentage or fixed amount.
    pub discount_type: DiscountType,
    /// Percent (for `Percentage`) or amount (for `Fixed`).
    pub discount_value: Decimal,
    /// Cap on a percentage discount.
    pub max_discount: Option<Decimal>,
    /// Minimum cart value required.
    pub min_order_amount: Option<Decimal>,
    /// Not valid before this instant.
    pub valid_from: Option<DateTime<Utc>>,
    /// Not valid after this instant.
    pub valid_until: Option<DateTime<Utc>>,
    /// Maximum redemptions; 0 means unlimited.
    pub usage_limit: u32,
    /// Redemptions so far.
    pub used_count: u32,
    /// Administrative on/off switch.
    pub active: bool,
    /// Only redeemable on a shopper's first order.
    pub first_order_only: bool,
}

impl Coupon {
    /// A coupon with the given code and discount, no restrictions.
    #[must_use]
    pub fn new(id: CouponId, code: &str, discount_type: DiscountType, value: Decimal) -> Self {
        Self {
            id,
            code: normalize_code(code),
            description: None,
            discount_type,
            discount_value: value,
            max_discount: None,
            min_order_amount: None,
            valid_from: None,
            valid_until: None,
            usage_limit: 0,
            used_count: 0,
            active: true,
            first_order_only: false,
        }
    }

    /// Whether the usage limit has been reached.
    #[must_use]
    pub const fn is_depleted(&self) -> bool {
        self.usage_limit > 0 && self.used_count >= self.usage_limit
    }

    /// Lifecycle classification at `now` for a cart value.
    #[must_use]
    pub fn state(&self, now: DateTime<Utc>, cart_value: Decimal) -> CouponState {
        if self.valid_from.is_some_and(|from| now < from) {
            CouponState::Scheduled
        } else if self.valid_until.is_some_and(|until| now > until) {
            CouponState::Expired
        } else if self.is_depleted() {
            CouponState::Depleted
        } else if cart_value < self.min_order() {
            CouponState::BelowMinimum
        } else {
            CouponState::Active
        }
    }

    /// Raw discount for a cart value, capped and clamped to the cart value.
    ///
    /// Ignores lifecycle; use [`CouponEvaluator::evaluate`] for the full check.
    #[must_use]
    pub fn discount_for(&self, cart_value: Decimal) -> Decimal {
        if cart_value <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let raw = match self.discount_type {
            DiscountType::Fixed => self.discount_value,
            DiscountType::Percentage => {
                let pct = cart_value * self.discount_value / Decimal::ONE_HUNDRED;
                self.max_discount.map_or(pct, |cap| pct.min(cap))
            }
        };
        round_money(raw.max(Decimal::ZERO)).min(cart_value)
    }

    fn min_order(&self) -> Decimal {
        self.min_order_amount.unwrap_or(Decimal::ZERO)
    }
}

/// Trim and upper-case a coupon code.
#[must_use]
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Mutually exclusive lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CouponState {
    Scheduled,
    Active,
    Expired,
    Depleted,
    BelowMinimum,
}

/// Why a coupon was not applied.
///
/// These are business rejections, distinct from transport failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CouponRejection {
    /// The code does not match any coupon.
    #[error("invalid coupon code")]
    UnknownCode,
    /// Switched off by an administrator.
    #[error("coupon is not active")]
    Disabled,
    /// Valid-from is in the future.
    #[error("coupon is not yet active")]
    NotYetActive,
    /// Valid-until is in the past.
    #[error("coupon has expired")]
    Expired,
    /// Usage limit reached.
    #[error("coupon usage limit reached")]
    UsageLimitReached,
    /// Cart value below the minimum.
    #[error("minimum order not met: add {shortfall} more (minimum {minimum})")]
    MinimumNotMet {
        /// Required cart value.
        minimum: Decimal,
        /// Amount still missing.
        shortfall: Decimal,
    },
    /// Restricted to a shopper's first order.
    #[error("coupon is only valid on your first order")]
    FirstOrderOnly,
    /// Rejected by the backend with its own message.
    #[error("{0}")]
    Backend(String),
}

/// Inputs for a coupon check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationContext {
    /// Evaluation instant.
    pub now: DateTime<Utc>,
    /// Candidate cart value.
    pub cart_value: Decimal,
    /// Shopper's non-cancelled order count, if known.
    pub prior_orders: Option<u64>,
}

impl EvaluationContext {
    /// Context without order-history information.
    #[must_use]
    pub const fn new(now: DateTime<Utc>, cart_value: Decimal) -> Self {
        Self {
            now,
            cart_value,
            prior_orders: None,
        }
    }

    /// Attach the shopper's prior order count.
    #[must_use]
    pub const fn with_prior_orders(mut self, count: u64) -> Self {
        self.prior_orders = Some(count);
        self
    }
}

/// An accepted coupon and the discount it yields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedDiscount {
    /// Coupon ID.
    pub coupon_id: CouponId,
    /// Normalized code.
    pub code: String,
    /// Discount amount, at most the cart value.
    pub amount: Decimal,
}

/// Stateless coupon evaluator.
#[derive(Debug, Clone, Copy, Default)]
pub struct CouponEvaluator;

impl CouponEvaluator {
    /// Evaluate a coupon.
    ///
    /// # Errors
    ///
    /// Returns the first [`CouponRejection`] in check order.
    pub fn evaluate(
        coupon: &Coupon,
        ctx: &EvaluationContext,
    ) -> Result<AppliedDiscount, CouponRejection> {
        if !coupon.active {
            return Err(CouponRejection::Disabled);
        }

        match coupon.state(ctx.now, ctx.cart_value) {
            CouponState::Scheduled => return Err(CouponRejection::NotYetActive),
            CouponState::Expired => return Err(CouponRejection::Expired),
            CouponState::Depleted => return Err(CouponRejection::UsageLimitReached),
            CouponState::BelowMinimum => {
                let minimum = coupon.min_order();
                return Err(CouponRejection::MinimumNotMet {
                    minimum,
                    shortfall: minimum - ctx.cart_value,
                });
            }
            CouponState::Active => {}
        }

        if coupon.first_order_only && ctx.prior_orders.is_none_or(|n| n > 0) {
            return Err(CouponRejection::FirstOrderOnly);
        }

        Ok(AppliedDiscount {
            coupon_id: coupon.id,
            code: coupon.code.clone(),
            amount: coupon.discount_for(ctx.cart_value),
        })
    }

    /// Look a code up in a coupon list and evaluate it.
    ///
    /// # Errors
    ///
    /// Returns [`CouponRejection::UnknownCode`] when no coupon matches the
    /// normalized code, otherwise as [`CouponEvaluator::evaluate`].
    pub fn evaluate_code(
        coupons: &[Coupon],
        code: &str,
        ctx: &EvaluationContext,
    ) -> Result<AppliedDiscount, CouponRejection> {
        let code = normalize_code(code);
        let coupon = coupons
            .iter()
            .find(|c| c.code == code)
            .ok_or(CouponRejection::UnknownCode)?;
        Self::evaluate(coupon, ctx)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 10, 12, 0, 0).unwrap()
    }

    fn ctx(value: &str) -> EvaluationContext {
        EvaluationContext::new(now(), d(value))
    }

    fn pct20() -> Coupon {
        let mut c = Coupon::new(CouponId::new(1), " save20 ", DiscountType::Percentage, d("20"));
        c.max_discount = Some(d("100"));
        c.min_order_amount = Some(d("200"));
        c
    }

    #[test]
    fn test_code_is_normalized() {
        assert_eq!(pct20().code, "SAVE20");
        assert_eq!(normalize_code("  welcome500"), "WELCOME500");
    }

    #[test]
    fn test_percentage_capped() {
        let applied = CouponEvaluator::evaluate(&pct20(), &ctx("1000")).unwrap();
        assert_eq!(applied.amount, d("100"));
        assert_eq!(applied.code, "SAVE20");
    }

    #[test]
    fn test_rounding_never_lifts_discount_above_cart_value() {
        let flat = Coupon::new(CouponId::new(2), "FLAT10", DiscountType::Fixed, d("10"));
        assert_eq!(flat.discount_for(d("0.005")), d("0.005"));

        let full = Coupon::new(CouponId::new(3), "FREE", DiscountType::Percentage, d("100"));
        assert_eq!(full.discount_for(d("0.125")), d("0.125"));
        assert_eq!(full.discount_for(d("10.004")), d("10.00"));
    }

    #[test]
    fn test_percentage_under_cap() {
        let applied = CouponEvaluator::evaluate(&pct20(), &ctx("300")).unwrap();
        assert_eq!(applied.amount, d("60"));
    }

    #[test]
    fn test_below_minimum_reports_shortfall() {
        let err = CouponEvaluator::evaluate(&pct20(), &ctx("150")).unwrap_err();
        assert_eq!(
            err,
            CouponRejection::MinimumNotMet {
                minimum: d("200"),
                shortfall: d("50"),
            }
        );
        assert!(err.to_string().starts_with("minimum order not met"));
    }

    #[test]
    fn test_fixed_discount_clamped_to_cart_value() {
        let coupon = Coupon::new(CouponId::new(2), "FLAT500", DiscountType::Fixed, d("500"));
        let applied = CouponEvaluator::evaluate(&coupon, &ctx("320")).unwrap();
        assert_eq!(applied.amount, d("320"));
    }

    #[test]
    fn test_scheduled_rejected() {
        let mut coupon = pct20();
        coupon.valid_from = Some(now() + chrono::Duration::days(1));
        assert_eq!(coupon.state(now(), d("1000")), CouponState::Scheduled);
        assert_eq!(
            CouponEvaluator::evaluate(&coupon, &ctx("1000")),
            Err(CouponRejection::NotYetActive)
        );
    }

    #[test]
    fn test_expired_rejected() {
        let mut coupon = pct20();
        coupon.valid_until = Some(now() - chrono::Duration::seconds(1));
        assert_eq!(coupon.state(now(), d("1000")), CouponState::Expired);
        assert_eq!(
            CouponEvaluator::evaluate(&coupon, &ctx("1000")),
            Err(CouponRejection::Expired)
        );
    }

    #[test]
    fn test_window_boundaries_are_inclusive() {
        let mut coupon = pct20();
        coupon.valid_from = Some(now());
        coupon.valid_until = Some(now());
        assert_eq!(coupon.state(now(), d("1000")), CouponState::Active);
    }

    #[test]
    fn test_usage_limit() {
        let mut coupon = pct20();
        coupon.usage_limit = 3;
        coupon.used_count = 3;
        assert_eq!(
            CouponEvaluator::evaluate(&coupon, &ctx("1000")),
            Err(CouponRejection::UsageLimitReached)
        );

        coupon.usage_limit = 0;
        coupon.used_count = 10_000;
        assert!(CouponEvaluator::evaluate(&coupon, &ctx("1000")).is_ok());
    }

    #[test]
    fn test_disabled_checked_first() {
        let mut coupon = pct20();
        coupon.active = false;
        coupon.valid_until = Some(now() - chrono::Duration::days(3));
        assert_eq!(
            CouponEvaluator::evaluate(&coupon, &ctx("1000")),
            Err(CouponRejection::Disabled)
        );
    }

    #[test]
    fn test_first_order_only() {
        let mut coupon = pct20();
        coupon.first_order_only = true;
        assert_eq!(
            CouponEvaluator::evaluate(&coupon, &ctx("1000")),
            Err(CouponRejection::FirstOrderOnly)
        );
        assert_eq!(
            CouponEvaluator::evaluate(&coupon, &ctx("1000").with_prior_orders(2)),
            Err(CouponRejection::FirstOrderOnly)
        );
        assert!(CouponEvaluator::evaluate(&coupon, &ctx("1000").with_prior_orders(0)).is_ok());
    }

    #[test]
    fn test_evaluate_code_lookup() {
        let coupons = vec![pct20()];
        assert!(CouponEvaluator::evaluate_code(&coupons, "save20", &ctx("1000")).is_ok());
        assert_eq!(
            CouponEvaluator::evaluate_code(&coupons, "NOPE", &ctx("1000")),
            Err(CouponRejection::UnknownCode)
        );
    }

    #[test]
    fn test_discount_never_exceeds_cart_value() {
        let mut huge = Coupon::new(CouponId::new(3), "HUGE", DiscountType::Percentage, d("250"));
        huge.max_discount = None;
        for value in ["0", "0.01", "1", "99.99", "500", "123456.78"] {
            let cart_value = d(value);
            for coupon in [&huge, &pct20()] {
                if let Ok(applied) = CouponEvaluator::evaluate(coupon, &ctx(value)) {
                    assert!(applied.amount <= cart_value);
                    assert!(applied.amount >= Decimal::ZERO);
                }
            }
        }
    }

    #[test]
    fn test_percentage_rounds_to_cents() {
        let coupon = Coupon::new(CouponId::new(4), "P15", DiscountType::Percentage, d("15"));
        let applied = CouponEvaluator::evaluate(&coupon, &ctx("99.99")).unwrap();
        assert_eq!(applied.amount, d("15.00"));
    }
}
