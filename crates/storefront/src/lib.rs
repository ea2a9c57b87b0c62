//! SoleMate Storefront library.
//!
//! Stateful controllers that keep cart, checkout and order state consistent
//! with authentication state and the commerce backend. The pure rules live in
//! `solemate-core`; this crate adds the backend seam, configuration, error
//! taxonomy and the async coordination around them.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod gate;
pub mod orders;
pub mod product;
pub mod state;

pub use backend::{BackendError, CommerceBackend, RestBackend};
pub use cart::CartStateController;
pub use checkout::{CheckoutQuote, CheckoutSession, CouponOffer};
pub use config::{ConfigError, StorefrontConfig};
pub use error::{CommerceError, ErrorKind};
pub use orders::{OrderLifecycleController, PlacementOutcome};
pub use product::ProductPage;
pub use state::Storefront;
