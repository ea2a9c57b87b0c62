//! Checkout session: applied coupon plus totals derived from the live cart.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use solemate_core::{
    AppliedDiscount, CheckoutTotals, Coupon, CouponEvaluator, CouponId, CouponRejection,
    EvaluationContext, ShippingRule, coupon::normalize_code, round_money,
};
use tracing::{debug, info, instrument, warn};

use crate::backend::{CommerceBackend, CouponValidation};
use crate::cart::CartStateController;
use crate::error::{self, CommerceError, Result};

/// A coupon accepted by the backend for a given subtotal.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AppliedCoupon {
    coupon_id: Option<CouponId>,
    code: String,
    discount: Decimal,
    validated_against: Decimal,
}

/// Totals for the current cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutQuote {
    #[serde(flatten)]
    pub totals: CheckoutTotals,
    /// Applied coupon code.
    pub coupon_code: Option<String>,
    /// The cart changed since the coupon was validated.
    pub coupon_stale: bool,
    /// Units in the cart.
    pub item_count: u64,
    /// Amount still needed for free shipping.
    pub remaining_for_free_shipping: Option<Decimal>,
}

/// A coupon from the active list with its local evaluation.
#[derive(Debug, Clone)]
pub struct CouponOffer {
    pub coupon: Coupon,
    pub evaluation: std::result::Result<AppliedDiscount, CouponRejection>,
}

impl CouponOffer {
    /// Whether the coupon applies to the current cart.
    #[must_use]
    pub const fn is_applicable(&self) -> bool {
        self.evaluation.is_ok()
    }
}

/// Checkout state for one shopper.
///
/// Nothing but the inputs is stored: every [`CheckoutSession::quote`] is
/// recomputed from the live cart.
pub struct CheckoutSession<B> {
    backend: Arc<B>,
    cart: CartStateController<B>,
    shipping: ShippingRule,
    applied: Option<AppliedCoupon>,
}

impl<B: CommerceBackend> CheckoutSession<B> {
    #[must_use]
    pub const fn new(backend: Arc<B>, cart: CartStateController<B>, shipping: ShippingRule) -> Self {
        Self {
            backend,
            cart,
            shipping,
            applied: None,
        }
    }

    /// Shipping rule in effect.
    #[must_use]
    pub const fn shipping_rule(&self) -> &ShippingRule {
        &self.shipping
    }

    /// The cart controller this session reads from.
    #[must_use]
    pub const fn cart(&self) -> &CartStateController<B> {
        &self.cart
    }

    /// Applied coupon id, if the backend reported one.
    #[must_use]
    pub fn coupon_id(&self) -> Option<CouponId> {
        self.applied.as_ref().and_then(|a| a.coupon_id)
    }

    /// Applied coupon code.
    #[must_use]
    pub fn coupon_code(&self) -> Option<&str> {
        self.applied.as_ref().map(|a| a.code.as_str())
    }

    /// Current totals.
    #[must_use]
    pub fn quote(&self) -> CheckoutQuote {
        let cart = self.cart.cart();
        let subtotal = cart.total();

        let (discount, coupon_code, coupon_stale) = match &self.applied {
            Some(applied) => (
                applied.discount.min(subtotal),
                Some(applied.code.clone()),
                applied.validated_against != subtotal,
            ),
            None => (Decimal::ZERO, None, false),
        };

        let totals = CheckoutTotals::compute(subtotal, &self.shipping, discount);
        CheckoutQuote {
            totals,
            coupon_code,
            coupon_stale,
            item_count: cart.item_count(),
            remaining_for_free_shipping: self.shipping.remaining_for_free(subtotal),
        }
    }

    /// Validate a code with the backend and apply it.
    ///
    /// Any previously applied coupon is replaced on success and kept on
    /// failure.
    ///
    /// # Errors
    ///
    /// Returns `EmptyCart`, `Coupon(UnknownCode)` for a blank code,
    /// `Coupon(Backend(message))` when the backend refuses it, or the
    /// backend error.
    #[instrument(skip(self))]
    pub async fn apply_coupon(&mut self, code: &str) -> Result<CheckoutQuote> {
        let subtotal = self.cart.cart().total();
        if subtotal <= Decimal::ZERO {
            return Err(CommerceError::EmptyCart);
        }
        let code = normalize_code(code);
        if code.is_empty() {
            return Err(CouponRejection::UnknownCode.into());
        }

        error::add_breadcrumb("checkout", "Apply coupon", Some(&[("code", &code)]));

        let validation = self
            .backend
            .validate_coupon(&code, subtotal)
            .await
            .map_err(|e| CommerceError::from(e).reported())?;

        match validation {
            CouponValidation::Accepted {
                coupon_id,
                code,
                discount,
            } => {
                let discount = round_money(discount.clamp(Decimal::ZERO, subtotal));
                info!(code = %code, %discount, "Coupon applied");
                self.applied = Some(AppliedCoupon {
                    coupon_id,
                    code,
                    discount,
                    validated_against: subtotal,
                });
                Ok(self.quote())
            }
            CouponValidation::Rejected { message } => {
                debug!(code = %code, %message, "Coupon rejected");
                Err(CouponRejection::Backend(message).into())
            }
        }
    }

    /// Drop the applied coupon.
    pub fn remove_coupon(&mut self) {
        if let Some(applied) = self.applied.take() {
            debug!(code = %applied.code, "Coupon removed");
        }
    }

    /// Re-run validation if the cart changed since the coupon was applied.
    ///
    /// A coupon the backend now refuses is removed. Returns whether a coupon
    /// is still applied.
    ///
    /// # Errors
    ///
    /// Returns the backend error; the coupon is kept in that case.
    #[instrument(skip(self))]
    pub async fn revalidate_coupon(&mut self) -> Result<bool> {
        let Some(applied) = self.applied.clone() else {
            return Ok(false);
        };
        let subtotal = self.cart.cart().total();
        if applied.validated_against == subtotal {
            return Ok(true);
        }
        if subtotal <= Decimal::ZERO {
            self.remove_coupon();
            return Ok(false);
        }

        match self.apply_coupon(&applied.code).await {
            Ok(_) => Ok(true),
            Err(CommerceError::Coupon(rejection)) => {
                warn!(code = %applied.code, %rejection, "Coupon no longer applies");
                self.remove_coupon();
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    /// Active coupons, each evaluated against the current subtotal.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the coupon list cannot be fetched. A
    /// failed first-order lookup only makes first-order coupons inapplicable.
    #[instrument(skip(self))]
    pub async fn available_coupons(&self) -> Result<Vec<CouponOffer>> {
        let (coupons, first_order) =
            tokio::join!(self.backend.active_coupons(), self.backend.is_first_order());
        let coupons = coupons.map_err(|e| CommerceError::from(e).reported())?;

        let mut ctx = EvaluationContext::new(Utc::now(), self.cart.cart().total());
        match first_order {
            Ok(first) => ctx = ctx.with_prior_orders(u64::from(!first)),
            Err(err) => warn!(error = %err, "First-order lookup failed"),
        }

        Ok(coupons
            .into_iter()
            .map(|coupon| {
                let evaluation = CouponEvaluator::evaluate(&coupon, &ctx);
                CouponOffer { coupon, evaluation }
            })
            .collect())
    }
}
