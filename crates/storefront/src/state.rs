//! Storefront state shared across callers.

use std::sync::Arc;

use solemate_core::{Identity, ModelNo};

use crate::backend::{BackendError, CommerceBackend, RestBackend};
use crate::cart::CartStateController;
use crate::checkout::CheckoutSession;
use crate::config::StorefrontConfig;
use crate::error::Result;
use crate::orders::OrderLifecycleController;
use crate::product::ProductPage;

/// Controllers wired to one backend.
///
/// This struct is cheaply cloneable via `Arc`; clones share the cart and
/// the order registry.
pub struct Storefront<B> {
    inner: Arc<StorefrontInner<B>>,
}

struct StorefrontInner<B> {
    config: StorefrontConfig,
    backend: Arc<B>,
    cart: CartStateController<B>,
    orders: OrderLifecycleController<B>,
}

impl<B> Clone for Storefront<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Storefront<RestBackend> {
    /// Connect to the REST backend named in the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn connect(config: StorefrontConfig) -> std::result::Result<Self, BackendError> {
        let backend = RestBackend::new(&config)?;
        Ok(Self::new(config, backend))
    }
}

impl<B: CommerceBackend> Storefront<B> {
    /// Wire controllers to a backend.
    #[must_use]
    pub fn new(config: StorefrontConfig, backend: B) -> Self {
        let backend = Arc::new(backend);
        let cart = CartStateController::new(Arc::clone(&backend));
        let orders = OrderLifecycleController::new(Arc::clone(&backend), cart.clone());
        Self {
            inner: Arc::new(StorefrontInner {
                config,
                backend,
                cart,
                orders,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.inner.backend
    }

    #[must_use]
    pub fn cart(&self) -> &CartStateController<B> {
        &self.inner.cart
    }

    #[must_use]
    pub fn orders(&self) -> &OrderLifecycleController<B> {
        &self.inner.orders
    }

    /// Start a checkout session over the shared cart.
    #[must_use]
    pub fn checkout(&self) -> CheckoutSession<B> {
        CheckoutSession::new(
            Arc::clone(&self.inner.backend),
            self.inner.cart.clone(),
            self.inner.config.shipping,
        )
    }

    /// Forward an identity signal to the cart controller.
    ///
    /// # Errors
    ///
    /// As [`CartStateController::on_identity_change`].
    pub async fn sign_in(&self, identity: Option<Identity>) -> Result<()> {
        self.inner.cart.on_identity_change(identity).await
    }

    /// Open a product page.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn product(&self, model_no: ModelNo) -> Result<ProductPage> {
        ProductPage::load(self.inner.backend.as_ref(), model_no).await
    }
}
