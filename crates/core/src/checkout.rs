//! Checkout total computation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::round_money;

/// Flat shipping fee waived above a subtotal threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingRule {
    /// Subtotals strictly above this ship free.
    pub free_threshold: Decimal,
    /// Fee charged otherwise.
    pub flat_fee: Decimal,
}

impl Default for ShippingRule {
    fn default() -> Self {
        Self {
            free_threshold: Decimal::from(500),
            flat_fee: Decimal::from(50),
        }
    }
}

impl ShippingRule {
    /// Create a shipping rule.
    #[must_use]
    pub const fn new(free_threshold: Decimal, flat_fee: Decimal) -> Self {
        Self {
            free_threshold,
            flat_fee,
        }
    }

    /// Shipping fee for a subtotal. A subtotal equal to the threshold pays.
    #[must_use]
    pub fn fee(&self, subtotal: Decimal) -> Decimal {
        if subtotal > self.free_threshold {
            Decimal::ZERO
        } else {
            self.flat_fee
        }
    }

    /// Amount still needed for free shipping, if any.
    #[must_use]
    pub fn remaining_for_free(&self, subtotal: Decimal) -> Option<Decimal> {
        (subtotal <= self.free_threshold).then(|| self.free_threshold - subtotal)
    }
}

/// Breakdown of a checkout total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutTotals {
    /// Sum of cart line totals.
    pub subtotal: Decimal,
    /// Shipping fee from the rule.
    pub shipping: Decimal,
    /// Coupon discount applied.
    pub discount: Decimal,
    /// `max(0, subtotal + shipping - discount)`.
    pub total: Decimal,
}

impl CheckoutTotals {
    /// Compute totals. The final amount is never negative.
    #[must_use]
    pub fn compute(subtotal: Decimal, rule: &ShippingRule, discount: Decimal) -> Self {
        let shipping = rule.fee(subtotal);
        let total = (subtotal + shipping - discount).max(Decimal::ZERO);
        Self {
            subtotal,
            shipping,
            discount,
            total: round_money(total),
        }
    }

    /// Whether shipping is waived.
    #[must_use]
    pub fn free_shipping(&self) -> bool {
        self.shipping.is_zero()
    }
}
