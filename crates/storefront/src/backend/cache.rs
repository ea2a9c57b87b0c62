//! Product cache for backend responses.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use solemate_core::{ModelNo, Product};

/// Read-through cache of products keyed by model number.
///
/// Carts, wishlists, coupons and orders are mutable state and never cached.
#[derive(Clone)]
pub struct ProductCache {
    inner: Cache<ModelNo, Arc<Product>>,
}

impl ProductCache {
    /// Create a cache with the given TTL.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Cache::builder().max_capacity(1000).time_to_live(ttl).build(),
        }
    }

    pub async fn get(&self, model_no: ModelNo) -> Option<Arc<Product>> {
        self.inner.get(&model_no).await
    }

    pub async fn insert(&self, product: Product) -> Arc<Product> {
        let product = Arc::new(product);
        self.inner.insert(product.model_no, Arc::clone(&product)).await;
        product
    }

    pub async fn invalidate(&self, model_no: ModelNo) {
        self.inner.invalidate(&model_no).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn product(model_no: i64) -> Product {
        Product {
            model_no: ModelNo::new(model_no),
            name: "Trail Runner".to_string(),
            brand: "SoleMate".to_string(),
            description: String::new(),
            base_price: Decimal::from(2999),
            variants: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let cache = ProductCache::new(Duration::from_secs(300));
        assert!(cache.get(ModelNo::new(1)).await.is_none());

        cache.insert(product(1)).await;
        let hit = cache.get(ModelNo::new(1)).await.unwrap();
        assert_eq!(hit.name, "Trail Runner");

        cache.invalidate(ModelNo::new(1)).await;
        assert!(cache.get(ModelNo::new(1)).await.is_none());
    }
}
