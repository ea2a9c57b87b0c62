//! SoleMate Core - commerce domain types and engines.
//!
//! This crate holds everything that can be decided without talking to the
//! backend:
//! - [`variant`] - color x size variant resolution and selection state
//! - [`pricing`] - flash-sale aware effective prices
//! - [`coupon`] - coupon lifecycle and discount evaluation
//! - [`checkout`] - shipping and checkout totals
//! - [`order`] - order snapshots and lifecycle transitions
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no async. Time is always passed in as a `DateTime<Utc>` so every
//! rule can be tested at exact boundaries. The stateful controllers live in
//! `solemate-storefront`.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod checkout;
pub mod coupon;
pub mod order;
pub mod pricing;
pub mod types;
pub mod variant;

pub use checkout::{CheckoutTotals, ShippingRule};
pub use coupon::{
    AppliedDiscount, Coupon, CouponEvaluator, CouponRejection, CouponState, DiscountType,
    EvaluationContext,
};
pub use order::{InvalidTransition, Order, OrderLine, ShippingAddress, TrackingEvent};
pub use pricing::PriceQuote;
pub use types::*;
pub use variant::{SelectionError, VariantMatrix, VariantSelection};
