//! Cart and wishlist state controller.
//!
//! Holds the authoritative in-memory [`Cart`] and [`Wishlist`] for the
//! current identity and publishes them through `watch` channels.
//!
//! # Identity reaction
//!
//! | Signal                  | Cart                      | Wishlist                  |
//! |-------------------------|---------------------------|---------------------------|
//! | absent                  | reset, no network call    | reset, no network call    |
//! | administrative identity | reset, no network call    | fetched                   |
//! | shopper identity        | fetched                   | fetched                   |
//!
//! Repeating the identity that was last loaded successfully is a no-op. Each
//! identity change bumps an epoch; a response that arrives for an older
//! epoch is discarded instead of published. Switching to a different
//! identity empties both collections before fetching, so a failed fetch never
//! leaves the previous identity's data on display.
//!
//! # Mutations
//!
//! Mutations validate locally, pass through the [`MutationGate`], call the
//! backend and only on success replace local state with the backend's
//! response. A failed call leaves local state untouched.

use std::sync::{Arc, Mutex};

use solemate_core::{Cart, CartLineId, Identity, ModelNo, Role, UserId, Wishlist};
use tokio::sync::watch;
use tracing::{debug, info, instrument};

use crate::backend::{AddToCart, CommerceBackend};
use crate::error::{self, CommerceError, Result};
use crate::gate::{MutationGate, lock};

/// Identity key used for idempotency checks.
type IdentityKey = (UserId, Role);

#[derive(Debug, Default)]
struct Session {
    identity: Option<Identity>,
    epoch: u64,
    /// Identity whose state was last loaded without error.
    loaded: Option<Option<IdentityKey>>,
}

/// Cart and wishlist controller.
///
/// Cheap to clone; clones share state.
pub struct CartStateController<B> {
    inner: Arc<CartInner<B>>,
}

struct CartInner<B> {
    backend: Arc<B>,
    gate: MutationGate,
    session: Mutex<Session>,
    cart: watch::Sender<Cart>,
    wishlist: watch::Sender<Wishlist>,
}

impl<B> Clone for CartStateController<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: CommerceBackend> CartStateController<B> {
    /// Create a controller with an empty cart and no identity.
    #[must_use]
    pub fn new(backend: Arc<B>) -> Self {
        let (cart, _) = watch::channel(Cart::empty());
        let (wishlist, _) = watch::channel(Wishlist::default());
        Self {
            inner: Arc::new(CartInner {
                backend,
                gate: MutationGate::new(),
                session: Mutex::new(Session::default()),
                cart,
                wishlist,
            }),
        }
    }

    // =========================================================================
    // Outputs
    // =========================================================================

    /// Current cart.
    #[must_use]
    pub fn cart(&self) -> Cart {
        self.inner.cart.borrow().clone()
    }

    /// Current wishlist.
    #[must_use]
    pub fn wishlist(&self) -> Wishlist {
        self.inner.wishlist.borrow().clone()
    }

    /// Subscribe to cart changes. Receivers are only notified on change.
    #[must_use]
    pub fn subscribe_cart(&self) -> watch::Receiver<Cart> {
        self.inner.cart.subscribe()
    }

    /// Subscribe to wishlist changes.
    #[must_use]
    pub fn subscribe_wishlist(&self) -> watch::Receiver<Wishlist> {
        self.inner.wishlist.subscribe()
    }

    /// Current identity.
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        lock(&self.inner.session).identity.clone()
    }

    /// Whether a mutation is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.inner.gate.is_busy()
    }

    // =========================================================================
    // Identity
    // =========================================================================

    /// React to a new identity signal.
    ///
    /// # Errors
    ///
    /// Returns the backend error if a fetch fails; that collection stays
    /// empty after a switch (or keeps its state on a same-identity retry)
    /// and the next signal retries.
    #[instrument(skip(self, identity), fields(user_id = ?identity.as_ref().map(|i| i.user_id)))]
    pub async fn on_identity_change(&self, identity: Option<Identity>) -> Result<()> {
        let key = identity.as_ref().map(|i| (i.user_id, i.role));

        let (epoch, switched) = {
            let mut session = lock(&self.inner.session);
            if session.loaded == Some(key) {
                debug!("Identity unchanged, skipping reload");
                return Ok(());
            }
            let previous = session.identity.as_ref().map(|i| (i.user_id, i.role));
            session.epoch += 1;
            session.identity.clone_from(&identity);
            session.loaded = None;
            (session.epoch, previous != key)
        };

        // A retry for the same identity keeps what is already shown.
        if switched {
            self.reset_cart();
            self.reset_wishlist();
        }

        let Some(identity) = identity else {
            info!("Signed out, resetting cart and wishlist");
            error::clear_sentry_user();
            self.reset_cart();
            self.reset_wishlist();
            self.mark_loaded(epoch, key);
            return Ok(());
        };

        error::set_sentry_user(&identity.user_id, identity.email.as_deref());

        if identity.is_shopper() {
            let backend = &self.inner.backend;
            let (cart, wishlist) = tokio::join!(backend.fetch_cart(), backend.fetch_wishlist());
            let cart = cart.map_err(|e| CommerceError::from(e).reported());
            let wishlist = wishlist.map_err(|e| CommerceError::from(e).reported());

            if let Ok(cart) = &cart {
                self.publish_cart(epoch, cart.clone()).ok();
            }
            if let Ok(wishlist) = &wishlist {
                self.publish_wishlist(epoch, wishlist.clone()).ok();
            }
            cart?;
            wishlist?;
        } else {
            debug!(role = %identity.role, "Administrative identity has no cart");
            self.reset_cart();
            let wishlist = self
                .inner
                .backend
                .fetch_wishlist()
                .await
                .map_err(|e| CommerceError::from(e).reported())?;
            self.publish_wishlist(epoch, wishlist).ok();
        }

        self.mark_loaded(epoch, key);
        Ok(())
    }

    // =========================================================================
    // Cart mutations
    // =========================================================================

    /// Add a variant to the cart.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuantity` for zero, `NotSignedIn` without a shopper,
    /// or the backend error.
    #[instrument(skip(self, request), fields(model_no = %request.model_no, quantity = request.quantity))]
    pub async fn add(&self, request: AddToCart) -> Result<Cart> {
        if request.quantity == 0 {
            return Err(CommerceError::InvalidQuantity(0));
        }
        let epoch = self.require_shopper()?;
        let _pass = self.inner.gate.enter(None).await?;

        let model_no = request.model_no.to_string();
        error::add_breadcrumb(
            "cart",
            "Add to cart",
            Some(&[
                ("model_no", &model_no),
                ("color", &request.color),
                ("size", &request.size),
            ]),
        );

        let cart = self
            .inner
            .backend
            .add_to_cart(&request)
            .await
            .map_err(|e| CommerceError::from(e).reported())?;
        self.publish_cart(epoch, cart)
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns `NotSignedIn` without a shopper, or the backend error.
    #[instrument(skip(self), fields(cart_line_id = %line_id))]
    pub async fn remove(&self, line_id: CartLineId) -> Result<Cart> {
        let epoch = self.require_shopper()?;
        let _pass = self.inner.gate.enter(None).await?;

        error::add_breadcrumb(
            "cart",
            "Remove from cart",
            Some(&[("cart_line_id", &line_id.to_string())]),
        );

        let cart = self
            .inner
            .backend
            .remove_cart_line(line_id)
            .await
            .map_err(|e| CommerceError::from(e).reported())?;
        self.publish_cart(epoch, cart)
    }

    /// Change a line's quantity.
    ///
    /// Rapid changes to the same line coalesce: a queued change is dropped
    /// with `Superseded` when a newer one for that line arrives behind it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuantity` for zero, `NotSignedIn` without a shopper,
    /// `Superseded`, or the backend error.
    #[instrument(skip(self), fields(cart_line_id = %line_id))]
    pub async fn set_quantity(&self, line_id: CartLineId, quantity: u32) -> Result<Cart> {
        if quantity == 0 {
            return Err(CommerceError::InvalidQuantity(0));
        }
        let epoch = self.require_shopper()?;
        let _pass = self.inner.gate.enter(Some(line_id)).await?;

        error::add_breadcrumb(
            "cart",
            "Update quantity",
            Some(&[
                ("cart_line_id", &line_id.to_string()),
                ("quantity", &quantity.to_string()),
            ]),
        );

        let cart = self
            .inner
            .backend
            .update_cart_line(line_id, quantity)
            .await
            .map_err(|e| CommerceError::from(e).reported())?;
        self.publish_cart(epoch, cart)
    }

    /// Clear the cart on the backend, then locally.
    ///
    /// Clearing an already empty cart still makes the call but does not
    /// notify subscribers.
    ///
    /// # Errors
    ///
    /// Returns `NotSignedIn` without a shopper, or the backend error.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<()> {
        let epoch = self.require_shopper()?;
        let _pass = self.inner.gate.enter(None).await?;

        error::add_breadcrumb("cart", "Clear cart", None);

        self.inner
            .backend
            .clear_cart()
            .await
            .map_err(|e| CommerceError::from(e).reported())?;
        self.publish_cart(epoch, Cart::empty()).map(|_| ())
    }

    // =========================================================================
    // Wishlist mutations
    // =========================================================================

    /// Save a product to the wishlist.
    ///
    /// # Errors
    ///
    /// Returns `NotSignedIn` without an identity, or the backend error.
    #[instrument(skip(self), fields(model_no = %model_no))]
    pub async fn add_to_wishlist(&self, model_no: ModelNo) -> Result<Wishlist> {
        let epoch = self.require_identity()?;
        let _pass = self.inner.gate.enter(None).await?;

        error::add_breadcrumb(
            "wishlist",
            "Add to wishlist",
            Some(&[("model_no", &model_no.to_string())]),
        );

        let wishlist = self
            .inner
            .backend
            .add_to_wishlist(model_no)
            .await
            .map_err(|e| CommerceError::from(e).reported())?;
        self.publish_wishlist(epoch, wishlist)
    }

    /// Remove a product from the wishlist.
    ///
    /// # Errors
    ///
    /// Returns `NotSignedIn` without an identity, or the backend error.
    #[instrument(skip(self), fields(model_no = %model_no))]
    pub async fn remove_from_wishlist(&self, model_no: ModelNo) -> Result<Wishlist> {
        let epoch = self.require_identity()?;
        let _pass = self.inner.gate.enter(None).await?;

        let wishlist = self
            .inner
            .backend
            .remove_from_wishlist(model_no)
            .await
            .map_err(|e| CommerceError::from(e).reported())?;
        self.publish_wishlist(epoch, wishlist)
    }

    /// Add or remove depending on current membership.
    ///
    /// # Errors
    ///
    /// Same as [`Self::add_to_wishlist`].
    pub async fn toggle_wishlist(&self, model_no: ModelNo) -> Result<Wishlist> {
        if self.inner.wishlist.borrow().contains(model_no) {
            self.remove_from_wishlist(model_no).await
        } else {
            self.add_to_wishlist(model_no).await
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn require_identity(&self) -> Result<u64> {
        let session = lock(&self.inner.session);
        session
            .identity
            .as_ref()
            .map(|_| session.epoch)
            .ok_or(CommerceError::NotSignedIn)
    }

    fn require_shopper(&self) -> Result<u64> {
        let session = lock(&self.inner.session);
        match &session.identity {
            Some(identity) if identity.is_shopper() => Ok(session.epoch),
            _ => Err(CommerceError::NotSignedIn),
        }
    }

    fn current_epoch(&self) -> u64 {
        lock(&self.inner.session).epoch
    }

    fn mark_loaded(&self, epoch: u64, key: Option<IdentityKey>) {
        let mut session = lock(&self.inner.session);
        if session.epoch == epoch {
            session.loaded = Some(key);
        }
    }

    /// Replace the cart if `epoch` is still current.
    fn publish_cart(&self, epoch: u64, cart: Cart) -> Result<Cart> {
        if self.current_epoch() != epoch {
            debug!("Discarding cart response for a previous identity");
            return Err(CommerceError::Superseded);
        }
        self.inner.cart.send_if_modified(|current| {
            if *current == cart {
                false
            } else {
                current.clone_from(&cart);
                true
            }
        });
        Ok(cart)
    }

    /// Replace the wishlist if `epoch` is still current.
    fn publish_wishlist(&self, epoch: u64, wishlist: Wishlist) -> Result<Wishlist> {
        if self.current_epoch() != epoch {
            debug!("Discarding wishlist response for a previous identity");
            return Err(CommerceError::Superseded);
        }
        self.inner.wishlist.send_if_modified(|current| {
            if *current == wishlist {
                false
            } else {
                current.clone_from(&wishlist);
                true
            }
        });
        Ok(wishlist)
    }

    fn reset_cart(&self) {
        self.inner.cart.send_if_modified(|current| {
            if current.is_empty() {
                false
            } else {
                *current = Cart::empty();
                true
            }
        });
    }

    fn reset_wishlist(&self) {
        self.inner.wishlist.send_if_modified(|current| {
            if current.is_empty() {
                false
            } else {
                *current = Wishlist::default();
                true
            }
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use rust_decimal::Decimal;
    use solemate_core::{
        CartLine, Coupon, OrderId, PaymentId, PaymentStatus, Product, VariantId, WishlistItem,
        WishlistItemId,
    };

    use super::*;
    use crate::backend::{BackendError, CouponValidation, OrderRecord, PaymentRecord, PlaceOrder};

    /// Backend that serves scripted carts and counts calls.
    #[derive(Default)]
    struct ScriptedBackend {
        calls: AtomicUsize,
        carts: Mutex<VecDeque<std::result::Result<Cart, BackendError>>>,
    }

    impl ScriptedBackend {
        fn with_carts(carts: Vec<std::result::Result<Cart, BackendError>>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                carts: Mutex::new(carts.into()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn next_cart(&self) -> std::result::Result<Cart, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            lock(&self.carts).pop_front().unwrap_or_else(|| Ok(Cart::empty()))
        }

        fn unused<T>(&self) -> std::result::Result<T, BackendError> {
            Err(BackendError::NotFound("unused".to_string()))
        }
    }

    impl CommerceBackend for ScriptedBackend {
        async fn fetch_cart(&self) -> std::result::Result<Cart, BackendError> {
            self.next_cart()
        }
        async fn add_to_cart(&self, _: &AddToCart) -> std::result::Result<Cart, BackendError> {
            self.next_cart()
        }
        async fn remove_cart_line(&self, _: CartLineId) -> std::result::Result<Cart, BackendError> {
            self.next_cart()
        }
        async fn update_cart_line(
            &self,
            _: CartLineId,
            _: u32,
        ) -> std::result::Result<Cart, BackendError> {
            self.next_cart()
        }
        async fn clear_cart(&self) -> std::result::Result<(), BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn fetch_wishlist(&self) -> std::result::Result<Wishlist, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Wishlist {
                items: vec![WishlistItem {
                    id: WishlistItemId::new(1),
                    model_no: ModelNo::new(1001),
                    name: "Trail Runner".to_string(),
                    price: Decimal::from(2999),
                }],
            })
        }
        async fn add_to_wishlist(&self, _: ModelNo) -> std::result::Result<Wishlist, BackendError> {
            self.unused()
        }
        async fn remove_from_wishlist(
            &self,
            _: ModelNo,
        ) -> std::result::Result<Wishlist, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Wishlist::default())
        }
        async fn validate_coupon(
            &self,
            _: &str,
            _: Decimal,
        ) -> std::result::Result<CouponValidation, BackendError> {
            self.unused()
        }
        async fn active_coupons(&self) -> std::result::Result<Vec<Coupon>, BackendError> {
            self.unused()
        }
        async fn is_first_order(&self) -> std::result::Result<bool, BackendError> {
            self.unused()
        }
        async fn place_order(&self, _: &PlaceOrder) -> std::result::Result<OrderRecord, BackendError> {
            self.unused()
        }
        async fn fetch_order(&self, _: OrderId) -> std::result::Result<OrderRecord, BackendError> {
            self.unused()
        }
        async fn my_orders(&self) -> std::result::Result<Vec<OrderRecord>, BackendError> {
            self.unused()
        }
        async fn cancel_order(&self, _: OrderId) -> std::result::Result<(), BackendError> {
            self.unused()
        }
        async fn initiate_payment(
            &self,
            _: OrderId,
        ) -> std::result::Result<PaymentRecord, BackendError> {
            self.unused()
        }
        async fn verify_payment(
            &self,
            _: PaymentId,
            _: &str,
        ) -> std::result::Result<PaymentStatus, BackendError> {
            self.unused()
        }
        async fn fetch_product(&self, _: ModelNo) -> std::result::Result<Product, BackendError> {
            self.unused()
        }
    }

    fn shopper() -> Identity {
        Identity::new(UserId::new(7), "Asha", Role::User)
    }

    fn one_line_cart(quantity: u32) -> Cart {
        Cart::from_lines(vec![CartLine {
            id: CartLineId::new(1),
            variant_id: VariantId::new(101),
            model_no: ModelNo::new(1001),
            product_name: "Trail Runner".to_string(),
            color: "Black".to_string(),
            color_hex: "#000000".to_string(),
            size: "9".to_string(),
            quantity,
            unit_price: Decimal::from(2999),
            image_url: None,
        }])
    }

    fn add_request(quantity: u32) -> AddToCart {
        AddToCart {
            model_no: ModelNo::new(1001),
            color: "Black".to_string(),
            size: "9".to_string(),
            quantity,
        }
    }

    #[tokio::test]
    async fn test_shopper_identity_fetches_cart_and_wishlist() {
        let backend = ScriptedBackend::with_carts(vec![Ok(one_line_cart(2))]);
        let controller = CartStateController::new(Arc::clone(&backend));

        controller.on_identity_change(Some(shopper())).await.unwrap();
        assert_eq!(controller.cart().item_count(), 2);
        assert_eq!(controller.wishlist().len(), 1);
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_repeated_identity_is_idempotent() {
        let backend = ScriptedBackend::with_carts(vec![Ok(one_line_cart(2))]);
        let controller = CartStateController::new(Arc::clone(&backend));

        controller.on_identity_change(Some(shopper())).await.unwrap();
        controller.on_identity_change(Some(shopper())).await.unwrap();
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_retries_on_next_signal() {
        let backend = ScriptedBackend::with_carts(vec![
            Err(BackendError::Status {
                status: 503,
                body: String::new(),
            }),
            Ok(one_line_cart(1)),
        ]);
        let controller = CartStateController::new(Arc::clone(&backend));

        let err = controller.on_identity_change(Some(shopper())).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NetworkFailure);
        assert!(controller.cart().is_empty());

        controller.on_identity_change(Some(shopper())).await.unwrap();
        assert_eq!(controller.cart().item_count(), 1);
    }

    #[tokio::test]
    async fn test_sign_out_resets_without_network() {
        let backend = ScriptedBackend::with_carts(vec![Ok(one_line_cart(2))]);
        let controller = CartStateController::new(Arc::clone(&backend));
        controller.on_identity_change(Some(shopper())).await.unwrap();
        let calls = backend.calls();

        controller.on_identity_change(None).await.unwrap();
        assert!(controller.cart().is_empty());
        assert_eq!(controller.cart().total(), Decimal::ZERO);
        assert!(controller.wishlist().is_empty());
        assert_eq!(backend.calls(), calls);
    }

    #[tokio::test]
    async fn test_switching_shopper_drops_previous_cart_before_fetch() {
        let backend = ScriptedBackend::with_carts(vec![
            Ok(one_line_cart(2)),
            Err(BackendError::Status {
                status: 503,
                body: String::new(),
            }),
        ]);
        let controller = CartStateController::new(Arc::clone(&backend));
        controller.on_identity_change(Some(shopper())).await.unwrap();
        let mut rx = controller.subscribe_cart();

        let other = Identity::new(UserId::new(99), "Ravi", Role::User);
        controller.on_identity_change(Some(other)).await.unwrap_err();

        assert!(controller.cart().is_empty());
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_empty());
        assert_eq!(controller.identity().unwrap().user_id, UserId::new(99));
    }

    #[tokio::test]
    async fn test_admin_has_no_cart() {
        let backend = ScriptedBackend::with_carts(vec![Ok(one_line_cart(2))]);
        let controller = CartStateController::new(Arc::clone(&backend));

        let admin = Identity::new(UserId::new(1), "Ops", Role::Admin);
        controller.on_identity_change(Some(admin)).await.unwrap();
        assert!(controller.cart().is_empty());
        assert_eq!(controller.wishlist().len(), 1);
        // Only the wishlist was fetched.
        assert_eq!(backend.calls(), 1);

        let err = controller.add(add_request(1)).await.unwrap_err();
        assert!(matches!(err, CommerceError::NotSignedIn));
    }

    #[tokio::test]
    async fn test_zero_quantity_rejected_locally() {
        let backend = ScriptedBackend::with_carts(vec![]);
        let controller = CartStateController::new(Arc::clone(&backend));
        controller.on_identity_change(Some(shopper())).await.unwrap();
        let calls = backend.calls();

        assert!(matches!(
            controller.add(add_request(0)).await,
            Err(CommerceError::InvalidQuantity(0))
        ));
        assert!(matches!(
            controller.set_quantity(CartLineId::new(1), 0).await,
            Err(CommerceError::InvalidQuantity(0))
        ));
        assert_eq!(backend.calls(), calls);
    }

    #[tokio::test]
    async fn test_failed_mutation_keeps_state() {
        let backend = ScriptedBackend::with_carts(vec![
            Ok(one_line_cart(1)),
            Err(BackendError::Rejected("Insufficient stock".to_string())),
        ]);
        let controller = CartStateController::new(Arc::clone(&backend));
        controller.on_identity_change(Some(shopper())).await.unwrap();

        let err = controller.set_quantity(CartLineId::new(1), 9).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ValidationRejection);
        assert_eq!(controller.cart(), one_line_cart(1));
    }

    #[tokio::test]
    async fn test_mutation_replaces_cart_with_response() {
        let backend =
            ScriptedBackend::with_carts(vec![Ok(Cart::empty()), Ok(one_line_cart(3))]);
        let controller = CartStateController::new(Arc::clone(&backend));
        controller.on_identity_change(Some(shopper())).await.unwrap();

        let mut rx = controller.subscribe_cart();
        let cart = controller.add(add_request(3)).await.unwrap();
        assert_eq!(cart.item_count(), 3);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().item_count(), 3);
    }

    #[tokio::test]
    async fn test_clearing_empty_cart_does_not_notify() {
        let backend = ScriptedBackend::with_carts(vec![Ok(Cart::empty())]);
        let controller = CartStateController::new(Arc::clone(&backend));
        controller.on_identity_change(Some(shopper())).await.unwrap();
        let calls = backend.calls();

        let rx = controller.subscribe_cart();
        controller.clear().await.unwrap();
        assert!(controller.cart().is_empty());
        assert!(!rx.has_changed().unwrap());
        assert_eq!(backend.calls(), calls + 1);
    }

    #[tokio::test]
    async fn test_wishlist_requires_identity() {
        let backend = ScriptedBackend::with_carts(vec![]);
        let controller = CartStateController::new(Arc::clone(&backend));
        assert!(matches!(
            controller.add_to_wishlist(ModelNo::new(1001)).await,
            Err(CommerceError::NotSignedIn)
        ));
    }

    #[tokio::test]
    async fn test_toggle_wishlist_removes_saved_product() {
        let backend = ScriptedBackend::with_carts(vec![]);
        let controller = CartStateController::new(Arc::clone(&backend));
        controller.on_identity_change(Some(shopper())).await.unwrap();
        assert!(controller.wishlist().contains(ModelNo::new(1001)));

        let wishlist = controller.toggle_wishlist(ModelNo::new(1001)).await.unwrap();
        assert!(wishlist.is_empty());
        assert!(controller.wishlist().is_empty());
    }
}
