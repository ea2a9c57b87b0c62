//! Product detail page state.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use solemate_core::{
    Cart, ModelNo, PriceQuote, Product, SelectionError, Variant, VariantImage, VariantMatrix,
    VariantSelection, pricing,
};
use tracing::instrument;

use crate::backend::{AddToCart, CommerceBackend};
use crate::cart::CartStateController;
use crate::error::{CommerceError, Result};

/// A loaded product and the shopper's current variant pick.
#[derive(Debug, Clone)]
pub struct ProductPage {
    product: Product,
    selection: VariantSelection,
}

impl ProductPage {
    /// Wrap a product with the initial selection (first color, no size).
    #[must_use]
    pub fn new(product: Product) -> Self {
        let selection = VariantSelection::initial(&VariantMatrix::new(&product));
        Self { product, selection }
    }

    /// Fetch a product and open its page.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    #[instrument(skip(backend))]
    pub async fn load<B: CommerceBackend>(backend: &B, model_no: ModelNo) -> Result<Self> {
        let product = backend
            .fetch_product(model_no)
            .await
            .map_err(|e| CommerceError::from(e).reported())?;
        Ok(Self::new(product))
    }

    #[must_use]
    pub const fn product(&self) -> &Product {
        &self.product
    }

    #[must_use]
    pub const fn selection(&self) -> &VariantSelection {
        &self.selection
    }

    #[must_use]
    pub fn matrix(&self) -> VariantMatrix<'_> {
        VariantMatrix::new(&self.product)
    }

    pub fn select_color(&mut self, color: impl Into<String>) {
        self.selection.select_color(color);
    }

    /// # Errors
    ///
    /// Returns a [`SelectionError`] when the size is not offered in the
    /// selected color.
    pub fn select_size(&mut self, size: impl Into<String>) -> std::result::Result<(), SelectionError> {
        let matrix = VariantMatrix::new(&self.product);
        self.selection.select_size(&matrix, size)
    }

    /// Sizes offered in the selected color.
    #[must_use]
    pub fn available_sizes(&self) -> Vec<&str> {
        self.selection.available_sizes(&self.matrix())
    }

    /// Variant whose price and images are shown.
    #[must_use]
    pub fn display_variant(&self) -> Option<&Variant> {
        self.selection.display_variant(&self.matrix())
    }

    /// Images for the shown variant, primary first.
    #[must_use]
    pub fn images(&self) -> Vec<&VariantImage> {
        self.display_variant()
            .map(VariantMatrix::images_for)
            .unwrap_or_default()
    }

    /// Price breakdown for the shown variant, or the base price when no
    /// variant resolves.
    #[must_use]
    pub fn quote(&self, now: DateTime<Utc>) -> PriceQuote {
        self.display_variant().map_or(
            PriceQuote {
                base: self.product.base_price,
                effective: self.product.base_price,
                discount_percent: 0,
                on_sale: false,
            },
            |variant| pricing::quote_variant(variant, now),
        )
    }

    /// Price shown on the page.
    #[must_use]
    pub fn display_price(&self, now: DateTime<Utc>) -> Decimal {
        pricing::display_price(&self.product, self.display_variant(), now)
    }

    /// Build an add-to-cart request for the current selection.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuantity` for zero, or a `Selection` error when the
    /// selection is incomplete or out of stock.
    pub fn add_to_cart_request(&self, quantity: u32) -> Result<AddToCart> {
        if quantity == 0 {
            return Err(CommerceError::InvalidQuantity(quantity));
        }
        let variant = self.selection.require_variant(&self.matrix())?;
        Ok(AddToCart {
            model_no: self.product.model_no,
            color: variant.color.name.clone(),
            size: variant.size.clone(),
            quantity,
        })
    }

    /// Add the current selection to the cart.
    ///
    /// # Errors
    ///
    /// As [`Self::add_to_cart_request`] and [`CartStateController::add`].
    pub async fn add_to_cart<B: CommerceBackend>(
        &self,
        cart: &CartStateController<B>,
        quantity: u32,
    ) -> Result<Cart> {
        let request = self.add_to_cart_request(quantity)?;
        cart.add(request).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use solemate_core::{Color, FlashSale, ImageId, VariantId, VariantImage};

    use super::*;

    fn variant(id: i64, color: &str, size: &str, qty: u32) -> Variant {
        Variant {
            id: VariantId::new(id),
            sku: format!("SKU-{id}"),
            model_no: ModelNo::new(1001),
            color: Color::new(color, "#000000"),
            size: size.to_string(),
            price: Decimal::from(2999),
            flash_sale: None,
            quantity_on_hand: qty,
            images: vec![VariantImage {
                id: ImageId::new(id),
                url: format!("https://cdn.example.test/{id}.jpg"),
                primary: true,
            }],
        }
    }

    fn page() -> ProductPage {
        ProductPage::new(Product {
            model_no: ModelNo::new(1001),
            name: "Trail Runner".to_string(),
            brand: "Stride".to_string(),
            description: String::new(),
            base_price: Decimal::from(2999),
            variants: vec![
                variant(1, "Black", "9", 3),
                variant(2, "Black", "10", 0),
                variant(3, "Red", "8", 2),
            ],
        })
    }

    #[test]
    fn test_initial_selection_is_first_color() {
        let page = page();
        assert_eq!(page.selection().color(), Some("Black"));
        assert_eq!(page.selection().size(), None);
        assert_eq!(page.available_sizes(), vec!["9", "10"]);
    }

    #[test]
    fn test_switching_color_clears_size() {
        let mut page = page();
        page.select_size("9").unwrap();
        page.select_color("Red");
        assert_eq!(page.selection().size(), None);
        assert_eq!(page.available_sizes(), vec!["8"]);
        assert!(page.select_size("9").is_err());
    }

    #[test]
    fn test_add_to_cart_request_requires_stock() {
        let mut page = page();
        assert!(matches!(
            page.add_to_cart_request(1),
            Err(CommerceError::Selection(SelectionError::NoSize))
        ));

        page.select_size("10").unwrap();
        assert!(matches!(
            page.add_to_cart_request(1),
            Err(CommerceError::Selection(SelectionError::OutOfStock { .. }))
        ));

        page.select_size("9").unwrap();
        let request = page.add_to_cart_request(2).unwrap();
        assert_eq!(request.color, "Black");
        assert_eq!(request.size, "9");
        assert_eq!(request.quantity, 2);
        assert!(matches!(
            page.add_to_cart_request(0),
            Err(CommerceError::InvalidQuantity(0))
        ));
    }

    #[test]
    fn test_quote_follows_flash_sale() {
        let ends_at = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();
        let mut product = page().product().clone();
        product.variants[0].flash_sale = Some(FlashSale {
            price: Decimal::from(1999),
            ends_at,
        });
        let page = ProductPage::new(product);

        let before = page.quote(ends_at - chrono::Duration::minutes(1));
        assert!(before.on_sale);
        assert_eq!(before.effective, Decimal::from(1999));
        assert_eq!(before.discount_percent, 33);

        let at_end = page.quote(ends_at);
        assert!(!at_end.on_sale);
        assert_eq!(page.display_price(ends_at), Decimal::from(2999));
    }
}
