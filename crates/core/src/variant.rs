//! Color x size variant resolution.
//!
//! [`VariantMatrix`] indexes a product's variants by (color, size) and answers
//! the product-detail page's questions: which colors exist, which sizes a
//! color comes in, which SKU a selection maps to, and whether it can be
//! bought. [`VariantSelection`] is the shopper's current pick.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Color, Product, Variant, VariantImage};

/// Why a selection cannot be turned into a purchasable variant.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SelectionError {
    /// No color picked.
    #[error("select a color to continue")]
    NoColor,
    /// No size picked.
    #[error("select a size to continue")]
    NoSize,
    /// The color has no variant in that size.
    #[error("size '{size}' is not available in '{color}'")]
    UnknownSize { color: String, size: String },
    /// The variant exists but has no stock.
    #[error("'{color}' in size '{size}' is out of stock")]
    OutOfStock { color: String, size: String },
}

/// Index over a product's variants.
#[derive(Debug)]
pub struct VariantMatrix<'a> {
    product: &'a Product,
    by_color: HashMap<&'a str, HashMap<&'a str, &'a Variant>>,
}

impl<'a> VariantMatrix<'a> {
    /// Index a product's variants. For a duplicated (color, size) pair the
    /// first variant in product order wins.
    #[must_use]
    pub fn new(product: &'a Product) -> Self {
        let mut by_color: HashMap<&str, HashMap<&str, &Variant>> = HashMap::new();
        for variant in &product.variants {
            by_color
                .entry(variant.color.name.as_str())
                .or_default()
                .entry(variant.size.as_str())
                .or_insert(variant);
        }
        Self { product, by_color }
    }

    /// The indexed product.
    #[must_use]
    pub const fn product(&self) -> &'a Product {
        self.product
    }

    /// Distinct colors in first-seen order.
    #[must_use]
    pub fn colors(&self) -> Vec<&'a Color> {
        let mut colors: Vec<&Color> = Vec::new();
        for variant in &self.product.variants {
            if !colors.iter().any(|c| c.name == variant.color.name) {
                colors.push(&variant.color);
            }
        }
        colors
    }

    /// Distinct sizes offered in exactly this color, in first-seen order.
    #[must_use]
    pub fn sizes_for(&self, color: &str) -> Vec<&'a str> {
        let mut sizes: Vec<&str> = Vec::new();
        for variant in self.variants_in(color) {
            if !sizes.contains(&variant.size.as_str()) {
                sizes.push(&variant.size);
            }
        }
        sizes
    }

    /// The variant for a (color, size) pair.
    #[must_use]
    pub fn resolve(&self, color: &str, size: &str) -> Option<&'a Variant> {
        self.by_color.get(color)?.get(size).copied()
    }

    /// The first variant in the given color, used to show a price and image
    /// before a size is picked.
    #[must_use]
    pub fn representative(&self, color: &str) -> Option<&'a Variant> {
        self.variants_in(color).next()
    }

    /// The first variant of the product.
    #[must_use]
    pub fn first(&self) -> Option<&'a Variant> {
        self.product.variants.first()
    }

    /// Out of stock when the variant has no units or does not exist at all.
    #[must_use]
    pub fn is_out_of_stock(&self, color: &str, size: &str) -> bool {
        self.resolve(color, size).is_none_or(|v| !v.in_stock())
    }

    /// Swatch hex for a color name, falling back to the name itself.
    #[must_use]
    pub fn color_hex(&self, color: &str) -> String {
        self.representative(color)
            .map_or_else(|| color.to_string(), |v| v.color.hex.clone())
    }

    /// A variant's images, primary image first, remaining order preserved.
    #[must_use]
    pub fn images_for(variant: &'a Variant) -> Vec<&'a VariantImage> {
        let mut images: Vec<&VariantImage> = variant.images.iter().collect();
        if let Some(pos) = images.iter().position(|img| img.primary) {
            let primary = images.remove(pos);
            images.insert(0, primary);
        }
        images
    }

    fn variants_in<'s>(&'s self, color: &'s str) -> impl Iterator<Item = &'a Variant> + 's {
        self.product
            .variants
            .iter()
            .filter(move |v| v.color.name == color)
    }
}

/// The shopper's current (color, size) pick on a product page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSelection {
    color: Option<String>,
    size: Option<String>,
}

impl VariantSelection {
    /// Starting selection: the first variant's color, no size.
    #[must_use]
    pub fn initial(matrix: &VariantMatrix<'_>) -> Self {
        Self {
            color: matrix.first().map(|v| v.color.name.clone()),
            size: None,
        }
    }

    /// Selected color.
    #[must_use]
    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    /// Selected size.
    #[must_use]
    pub fn size(&self) -> Option<&str> {
        self.size.as_deref()
    }

    /// Pick a color. Switching to a different color clears the size so that
    /// a size from the previous color is never carried over.
    pub fn select_color(&mut self, color: impl Into<String>) {
        let color = color.into();
        if self.color.as_deref() != Some(color.as_str()) {
            self.size = None;
        }
        self.color = Some(color);
    }

    /// Pick a size for the selected color.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::NoColor`] when no color is selected and
    /// [`SelectionError::UnknownSize`] when the color is not offered in that
    /// size. The selection is unchanged on error.
    pub fn select_size(
        &mut self,
        matrix: &VariantMatrix<'_>,
        size: impl Into<String>,
    ) -> Result<(), SelectionError> {
        let size = size.into();
        let color = self.color.as_deref().ok_or(SelectionError::NoColor)?;
        if matrix.resolve(color, &size).is_none() {
            return Err(SelectionError::UnknownSize {
                color: color.to_string(),
                size,
            });
        }
        self.size = Some(size);
        Ok(())
    }

    /// Drop the size pick.
    pub fn clear_size(&mut self) {
        self.size = None;
    }

    /// The exact variant for a complete selection.
    #[must_use]
    pub fn selected_variant<'a>(&self, matrix: &VariantMatrix<'a>) -> Option<&'a Variant> {
        matrix.resolve(self.color.as_deref()?, self.size.as_deref()?)
    }

    /// The variant whose price and images should be shown.
    ///
    /// - no color: the product's first variant
    /// - color and size: the exact variant (if any)
    /// - color only: the first variant in that color
    #[must_use]
    pub fn display_variant<'a>(&self, matrix: &VariantMatrix<'a>) -> Option<&'a Variant> {
        match (self.color.as_deref(), self.size.as_deref()) {
            (None, _) => matrix.first(),
            (Some(color), Some(size)) => matrix.resolve(color, size),
            (Some(color), None) => matrix.representative(color),
        }
    }

    /// Sizes available for the selected color (empty without a color).
    #[must_use]
    pub fn available_sizes<'a>(&self, matrix: &VariantMatrix<'a>) -> Vec<&'a str> {
        self.color
            .as_deref()
            .map(|c| matrix.sizes_for(c))
            .unwrap_or_default()
    }

    /// The in-stock variant this selection buys.
    ///
    /// # Errors
    ///
    /// Returns a [`SelectionError`] when the color or size is missing, the
    /// pair does not exist, or the variant has no stock.
    pub fn require_variant<'a>(
        &self,
        matrix: &VariantMatrix<'a>,
    ) -> Result<&'a Variant, SelectionError> {
        let color = self.color.as_deref().ok_or(SelectionError::NoColor)?;
        let size = self.size.as_deref().ok_or(SelectionError::NoSize)?;
        let variant = matrix
            .resolve(color, size)
            .ok_or_else(|| SelectionError::UnknownSize {
                color: color.to_string(),
                size: size.to_string(),
            })?;
        if !variant.in_stock() {
            return Err(SelectionError::OutOfStock {
                color: color.to_string(),
                size: size.to_string(),
            });
        }
        Ok(variant)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::VariantId;
    use crate::types::catalog::fixtures::{runner, variant};

    #[test]
    fn test_colors_distinct_in_order() {
        let product = runner();
        let matrix = VariantMatrix::new(&product);
        let names: Vec<&str> = matrix.colors().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Black", "Red", "White"]);
    }

    #[test]
    fn test_sizes_only_for_exact_color() {
        let product = runner();
        let matrix = VariantMatrix::new(&product);
        assert_eq!(matrix.sizes_for("Black"), vec!["8", "9", "10"]);
        assert_eq!(matrix.sizes_for("Red"), vec!["9"]);
        assert_eq!(matrix.sizes_for("White"), vec!["11"]);
        assert!(matrix.sizes_for("black").is_empty());
        assert!(matrix.sizes_for("Green").is_empty());
    }

    #[test]
    fn test_sizes_never_leak_across_colors() {
        let product = runner();
        let matrix = VariantMatrix::new(&product);
        for color in matrix.colors() {
            for size in matrix.sizes_for(&color.name) {
                let v = matrix.resolve(&color.name, size).unwrap();
                assert_eq!(v.color.name, color.name);
            }
        }
    }

    #[test]
    fn test_resolve_and_not_found() {
        let product = runner();
        let matrix = VariantMatrix::new(&product);
        assert_eq!(matrix.resolve("Black", "9").unwrap().id, VariantId::new(2));
        assert!(matrix.resolve("White", "9").is_none());
    }

    #[test]
    fn test_duplicate_pair_first_wins() {
        let mut product = runner();
        product.variants.push(variant(9, "Black", "8", "1", 1));
        let matrix = VariantMatrix::new(&product);
        assert_eq!(matrix.resolve("Black", "8").unwrap().id, VariantId::new(1));
    }

    #[test]
    fn test_out_of_stock_is_fail_safe() {
        let product = runner();
        let matrix = VariantMatrix::new(&product);
        assert!(matrix.is_out_of_stock("Red", "9"));
        assert!(matrix.is_out_of_stock("Red", "10"));
        assert!(matrix.is_out_of_stock("Purple", "9"));
        assert!(!matrix.is_out_of_stock("Black", "10"));
    }

    #[test]
    fn test_representative_is_first_of_color() {
        let product = runner();
        let matrix = VariantMatrix::new(&product);
        assert_eq!(matrix.representative("Black").unwrap().id, VariantId::new(1));
        assert!(matrix.representative("Green").is_none());
    }

    #[test]
    fn test_images_primary_first() {
        let product = runner();
        let v = &product.variants[0];
        let ids: Vec<i64> = VariantMatrix::images_for(v)
            .iter()
            .map(|img| img.id.as_i64())
            .collect();
        assert_eq!(ids, vec![11, 10]);
    }

    #[test]
    fn test_color_hex_fallback() {
        let product = runner();
        let matrix = VariantMatrix::new(&product);
        assert_eq!(matrix.color_hex("Black"), "#Black");
        assert_eq!(matrix.color_hex("Teal"), "Teal");
    }

    #[test]
    fn test_initial_selection_uses_first_color() {
        let product = runner();
        let matrix = VariantMatrix::new(&product);
        let selection = VariantSelection::initial(&matrix);
        assert_eq!(selection.color(), Some("Black"));
        assert_eq!(selection.size(), None);
    }

    #[test]
    fn test_changing_color_resets_size() {
        let product = runner();
        let matrix = VariantMatrix::new(&product);
        let mut selection = VariantSelection::initial(&matrix);
        selection.select_size(&matrix, "10").unwrap();
        assert_eq!(selection.size(), Some("10"));

        selection.select_color("White");
        assert_eq!(selection.size(), None);
        assert_eq!(selection.available_sizes(&matrix), vec!["11"]);
    }

    #[test]
    fn test_reselecting_same_color_keeps_size() {
        let product = runner();
        let matrix = VariantMatrix::new(&product);
        let mut selection = VariantSelection::initial(&matrix);
        selection.select_size(&matrix, "9").unwrap();
        selection.select_color("Black");
        assert_eq!(selection.size(), Some("9"));
    }

    #[test]
    fn test_select_size_from_other_color_rejected() {
        let product = runner();
        let matrix = VariantMatrix::new(&product);
        let mut selection = VariantSelection::default();
        assert_eq!(
            selection.select_size(&matrix, "9"),
            Err(SelectionError::NoColor)
        );

        selection.select_color("White");
        let err = selection.select_size(&matrix, "8").unwrap_err();
        assert!(matches!(err, SelectionError::UnknownSize { .. }));
        assert_eq!(selection.size(), None);
    }

    #[test]
    fn test_display_variant_rules() {
        let product = runner();
        let matrix = VariantMatrix::new(&product);
        let mut selection = VariantSelection::default();
        assert_eq!(
            selection.display_variant(&matrix).unwrap().id,
            VariantId::new(1)
        );

        selection.select_color("White");
        assert_eq!(
            selection.display_variant(&matrix).unwrap().id,
            VariantId::new(5)
        );

        selection.select_color("Black");
        selection.select_size(&matrix, "10").unwrap();
        assert_eq!(
            selection.display_variant(&matrix).unwrap().id,
            VariantId::new(4)
        );
        assert_eq!(
            selection.selected_variant(&matrix).unwrap().id,
            VariantId::new(4)
        );
    }

    #[test]
    fn test_require_variant_errors() {
        let product = runner();
        let matrix = VariantMatrix::new(&product);
        let mut selection = VariantSelection::default();
        assert_eq!(
            selection.require_variant(&matrix),
            Err(SelectionError::NoColor)
        );

        selection.select_color("Red");
        assert_eq!(
            selection.require_variant(&matrix),
            Err(SelectionError::NoSize)
        );

        selection.select_size(&matrix, "9").unwrap();
        assert!(matches!(
            selection.require_variant(&matrix),
            Err(SelectionError::OutOfStock { .. })
        ));

        selection.select_color("Black");
        selection.select_size(&matrix, "8").unwrap();
        assert_eq!(
            selection.require_variant(&matrix).unwrap().id,
            VariantId::new(1)
        );
    }
}
