//! Core types for SoleMate.
//!
//! This module provides type-safe wrappers and data model types for the
//! catalog, cart, wishlist, and identity concepts the engines work with.

pub mod cart;
pub mod catalog;
pub mod id;
pub mod identity;
pub mod price;
pub mod status;

pub use cart::{Cart, CartLine, Wishlist, WishlistItem};
pub use catalog::{CatalogError, Color, FlashSale, Product, Variant, VariantImage};
pub use id::*;
pub use identity::Identity;
pub use price::{CurrencyCode, Price, round_money};
pub use status::*;
