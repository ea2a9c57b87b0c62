//! Unified error handling with Sentry integration.
//!
//! Every controller operation returns `Result<T, CommerceError>`. Transport
//! failures are captured to Sentry; business rejections only leave a
//! breadcrumb trail.

use solemate_core::{
    CouponRejection, InvalidTransition, OrderId, PaymentStatus, SelectionError,
};
use thiserror::Error;

use crate::backend::BackendError;

/// Engine-level error type for the storefront.
#[derive(Debug, Error)]
pub enum CommerceError {
    /// Backend request failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Coupon was not accepted.
    #[error("Coupon rejected: {0}")]
    Coupon(#[from] CouponRejection),

    /// Variant selection is incomplete or unavailable.
    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),

    /// Quantity must be at least one.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(u32),

    /// Checkout attempted with no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// Operation needs a signed-in shopper.
    #[error("Not signed in as a shopper")]
    NotSignedIn,

    /// Order is unknown locally and to the backend.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// Lifecycle edge not allowed.
    #[error("Invalid transition: {0}")]
    InvalidTransition(#[from] InvalidTransition),

    /// Payment did not complete.
    #[error("Payment for order {order_id} is {status:?}")]
    PaymentIncomplete {
        order_id: OrderId,
        status: PaymentStatus,
    },

    /// Dropped because a newer request replaced it, or the identity changed
    /// while it was in flight.
    #[error("Superseded by a newer request")]
    Superseded,
}

/// Coarse classification used by callers to decide how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transport or server failure; local state was left unchanged.
    NetworkFailure,
    /// The request was understood and refused.
    ValidationRejection,
    /// The resource does not exist. Terminal for the operation.
    NotFound,
    /// A newer request took over.
    Superseded,
}

impl CommerceError {
    /// Classify the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Backend(err) => match err {
                BackendError::NotFound(_) => ErrorKind::NotFound,
                BackendError::Rejected(_) => ErrorKind::ValidationRejection,
                BackendError::Http(_)
                | BackendError::Status { .. }
                | BackendError::Parse(_)
                | BackendError::RateLimited(_)
                | BackendError::InvalidPayload(_) => ErrorKind::NetworkFailure,
            },
            Self::OrderNotFound(_) => ErrorKind::NotFound,
            Self::Superseded => ErrorKind::Superseded,
            Self::Coupon(_)
            | Self::Selection(_)
            | Self::InvalidQuantity(_)
            | Self::EmptyCart
            | Self::NotSignedIn
            | Self::InvalidTransition(_)
            | Self::PaymentIncomplete { .. } => ErrorKind::ValidationRejection,
        }
    }

    /// Capture network failures to Sentry and log them.
    ///
    /// Returns `self` so it can sit inside `map_err`.
    #[must_use]
    pub fn reported(self) -> Self {
        if self.kind() == ErrorKind::NetworkFailure {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Backend request failed"
            );
        }
        self
    }
}

/// Result type alias for `CommerceError`.
pub type Result<T> = std::result::Result<T, CommerceError>;

/// Set the Sentry user context from a user ID.
///
/// Called when a signed-in identity appears.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Called on sign-out to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for cart and order actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Add to cart", Some(&[("model_no", "1001")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_commerce_error_display() {
        let err = CommerceError::OrderNotFound(OrderId::new(42));
        assert_eq!(err.to_string(), "Order not found: 42");

        let err = CommerceError::Coupon(CouponRejection::Expired);
        assert_eq!(err.to_string(), "Coupon rejected: coupon has expired");
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            CommerceError::Backend(BackendError::RateLimited(3)).kind(),
            ErrorKind::NetworkFailure
        );
        assert_eq!(
            CommerceError::Backend(BackendError::Status {
                status: 502,
                body: String::new(),
            })
            .kind(),
            ErrorKind::NetworkFailure
        );
        assert_eq!(
            CommerceError::Backend(BackendError::NotFound("/orders/9".to_string())).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            CommerceError::Backend(BackendError::Rejected("out of stock".to_string())).kind(),
            ErrorKind::ValidationRejection
        );
        assert_eq!(
            CommerceError::Coupon(CouponRejection::MinimumNotMet {
                minimum: Decimal::from(200),
                shortfall: Decimal::from(50),
            })
            .kind(),
            ErrorKind::ValidationRejection
        );
        assert_eq!(CommerceError::Superseded.kind(), ErrorKind::Superseded);
        assert_eq!(
            CommerceError::OrderNotFound(OrderId::new(1)).kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_reported_passes_through() {
        let err = CommerceError::EmptyCart.reported();
        assert!(matches!(err, CommerceError::EmptyCart));
    }
}
