//! Product and variant data model.
//!
//! Products are read-only input to the engine. A product owns an unordered
//! set of variants, each a concrete (color, size) SKU.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::id::{ImageId, ModelNo, VariantId};

/// Violations of the catalog invariants.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// A variant claims to belong to a different product.
    #[error("variant {variant} belongs to product {found}, expected {expected}")]
    ForeignVariant {
        variant: VariantId,
        expected: ModelNo,
        found: ModelNo,
    },
    /// Two variants share the same (color, size) pair.
    #[error("duplicate variant for color '{color}' size '{size}'")]
    DuplicateVariant { color: String, size: String },
    /// More than one image on a variant is marked primary.
    #[error("variant {0} has more than one primary image")]
    MultiplePrimaryImages(VariantId),
}

/// Named color with its swatch hex value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    /// Display name (e.g., "Midnight Blue").
    pub name: String,
    /// Swatch hex (e.g., "#191970"). Falls back to the name when unknown.
    pub hex: String,
}

impl Color {
    /// Create a color from a name and hex value.
    #[must_use]
    pub fn new(name: impl Into<String>, hex: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hex: hex.into(),
        }
    }
}

/// Variant image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantImage {
    /// Stable image ID.
    pub id: ImageId,
    /// Image URL.
    pub url: String,
    /// Whether this is the variant's lead image.
    pub primary: bool,
}

/// Time-boxed price override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashSale {
    /// Sale price.
    pub price: Decimal,
    /// The sale is effective strictly before this instant.
    pub ends_at: DateTime<Utc>,
}

/// A concrete purchasable SKU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    /// Variant ID.
    pub id: VariantId,
    /// Stock keeping unit.
    pub sku: String,
    /// Owning product.
    pub model_no: ModelNo,
    /// Variant color.
    pub color: Color,
    /// Variant size label (e.g., "UK 9", "M").
    pub size: String,
    /// Regular unit price.
    pub price: Decimal,
    /// Optional flash-sale override.
    pub flash_sale: Option<FlashSale>,
    /// Units on hand.
    pub quantity_on_hand: u32,
    /// Ordered images.
    pub images: Vec<VariantImage>,
}

impl Variant {
    /// Whether any stock is left.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.quantity_on_hand > 0
    }

    /// The primary image, falling back to the first image.
    #[must_use]
    pub fn primary_image(&self) -> Option<&VariantImage> {
        self.images
            .iter()
            .find(|img| img.primary)
            .or_else(|| self.images.first())
    }
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Model number (the stable product identity).
    pub model_no: ModelNo,
    /// Product name.
    pub name: String,
    /// Brand name.
    pub brand: String,
    /// Long description.
    pub description: String,
    /// Base price (shown when no variant is resolved).
    pub base_price: Decimal,
    /// Variants, in backend order.
    pub variants: Vec<Variant>,
}

impl Product {
    /// Check the catalog invariants.
    ///
    /// # Errors
    ///
    /// Returns the first [`CatalogError`] found: a variant pointing at another
    /// product, a duplicated (color, size) pair, or several primary images.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut seen: HashSet<(&str, &str)> = HashSet::with_capacity(self.variants.len());

        for variant in &self.variants {
            if variant.model_no != self.model_no {
                return Err(CatalogError::ForeignVariant {
                    variant: variant.id,
                    expected: self.model_no,
                    found: variant.model_no,
                });
            }

            if !seen.insert((variant.color.name.as_str(), variant.size.as_str())) {
                return Err(CatalogError::DuplicateVariant {
                    color: variant.color.name.clone(),
                    size: variant.size.clone(),
                });
            }

            if variant.images.iter().filter(|img| img.primary).count() > 1 {
                return Err(CatalogError::MultiplePrimaryImages(variant.id));
            }
        }

        Ok(())
    }

    /// Total units on hand across all variants.
    #[must_use]
    pub fn total_stock(&self) -> u64 {
        self.variants
            .iter()
            .map(|v| u64::from(v.quantity_on_hand))
            .sum()
    }
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_valid_product_passes() {
        assert!(runner().validate().is_ok());
    }

    #[test]
    fn test_duplicate_color_size_rejected() {
        let mut product = runner();
        product.variants.push(variant(9, "Black", "9", "10", 1));
        assert_eq!(
            product.validate(),
            Err(CatalogError::DuplicateVariant {
                color: "Black".to_string(),
                size: "9".to_string()
            })
        );
    }

    #[test]
    fn test_foreign_variant_rejected() {
        let mut product = runner();
        product.variants[0].model_no = ModelNo::new(2002);
        assert!(matches!(
            product.validate(),
            Err(CatalogError::ForeignVariant { .. })
        ));
    }

    #[test]
    fn test_multiple_primary_images_rejected() {
        let mut product = runner();
        product.variants[1].images.push(image(99, true));
        assert_eq!(
            product.validate(),
            Err(CatalogError::MultiplePrimaryImages(VariantId::new(2)))
        );
    }

    #[test]
    fn test_primary_image_falls_back_to_first() {
        let mut v = variant(1, "Black", "8", "10", 1);
        assert_eq!(v.primary_image().unwrap().id, ImageId::new(11));
        v.images.iter_mut().for_each(|img| img.primary = false);
        assert_eq!(v.primary_image().unwrap().id, ImageId::new(10));
        v.images.clear();
        assert!(v.primary_image().is_none());
    }

    #[test]
    fn test_total_stock() {
        assert_eq!(runner().total_stock(), 13);
    }
}
