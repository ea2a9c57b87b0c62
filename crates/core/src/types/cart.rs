//! Cart and wishlist data model.
//!
//! Cart lines carry the unit price captured when the line was added. The
//! live variant price is never consulted again, so a later price change does
//! not silently alter an existing line.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{CartLineId, ModelNo, VariantId, WishlistItemId};

/// One entry in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Backend cart line ID.
    pub id: CartLineId,
    /// Referenced variant.
    pub variant_id: VariantId,
    /// Owning product.
    pub model_no: ModelNo,
    /// Product name at add time.
    pub product_name: String,
    /// Variant color name.
    pub color: String,
    /// Variant color hex.
    pub color_hex: String,
    /// Variant size.
    pub size: String,
    /// Quantity, always at least 1.
    pub quantity: u32,
    /// Unit price captured at add time.
    pub unit_price: Decimal,
    /// Thumbnail URL.
    pub image_url: Option<String>,
}

impl CartLine {
    /// `quantity x unit_price`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// A shopper's cart.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cart {
    /// Lines in backend order.
    pub lines: Vec<CartLine>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn empty() -> Self {
        Self { lines: Vec::new() }
    }

    /// Build a cart from lines.
    #[must_use]
    pub const fn from_lines(lines: Vec<CartLine>) -> Self {
        Self { lines }
    }

    /// Sum of `quantity x captured unit price` over all lines.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Total number of units (the cart badge count).
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Find a line by ID.
    #[must_use]
    pub fn line(&self, id: CartLineId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.id == id)
    }
}

/// One entry in a wishlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistItem {
    /// Backend wishlist item ID.
    pub id: WishlistItemId,
    /// Saved product.
    pub model_no: ModelNo,
    /// Product name.
    pub name: String,
    /// Product price when fetched.
    pub price: Decimal,
}

/// A shopper's wishlist.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Wishlist {
    /// Saved products.
    pub items: Vec<WishlistItem>,
}

impl Wishlist {
    /// Whether a product is saved.
    #[must_use]
    pub fn contains(&self, model_no: ModelNo) -> bool {
        self.items.iter().any(|item| item.model_no == model_no)
    }

    /// Number of saved products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing is saved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod fixtures {
    use super::*;

    pub fn line(id: i64, quantity: u32, unit_price: &str) -> CartLine {
        CartLine {
            id: CartLineId::new(id),
            variant_id: VariantId::new(id + 100),
            model_no: ModelNo::new(1001),
            product_name: "Trail Runner".to_string(),
            color: "Black".to_string(),
            color_hex: "#000000".to_string(),
            size: "9".to_string(),
            quantity,
            unit_price: unit_price.parse().unwrap(),
            image_url: None,
        }
    }
}
