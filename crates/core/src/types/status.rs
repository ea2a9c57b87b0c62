//! Status and classification enums shared across the engine.

use serde::{Deserialize, Serialize};

/// Lifecycle status of an order.
///
/// ```text
/// Placed ──► AwaitingPayment ──► Confirmed ──► Shipped ──► Delivered ──► Returned / Refunded
///   │              │                 │
///   └──────────────┴─────────────────┴──► Cancelled
/// ```
///
/// `Placed` may also move straight to `Confirmed` for synchronous payment
/// methods. The allowed edges live in [`OrderStatus::can_transition_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Placed,
    AwaitingPayment,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
    Returned,
    Refunded,
}

impl OrderStatus {
    /// Whether the order can still be cancelled (nothing has shipped yet).
    #[must_use]
    pub const fn is_cancellable(self) -> bool {
        matches!(self, Self::Placed | Self::AwaitingPayment | Self::Confirmed)
    }

    /// Whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Refunded)
    }

    /// Whether `self -> next` is an allowed lifecycle edge.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Placed, Self::AwaitingPayment | Self::Confirmed)
            | (Self::AwaitingPayment, Self::Confirmed)
            | (Self::Confirmed, Self::Shipped)
            | (Self::Shipped, Self::Delivered)
            | (Self::Delivered, Self::Returned)
            | (Self::Returned, Self::Refunded) => true,
            (from, Self::Cancelled) => from.is_cancellable(),
            _ => false,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Placed => "placed",
            Self::AwaitingPayment => "awaiting_payment",
            Self::Confirmed => "confirmed",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Returned => "returned",
            Self::Refunded => "refunded",
        };
        f.write_str(label)
    }
}

/// How the shopper pays for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// Card on file or entered at checkout.
    #[serde(rename = "card", alias = "saved-card")]
    Card,
    /// Cash on delivery.
    #[serde(rename = "cod")]
    CashOnDelivery,
    /// UPI via QR code / interactive payment dialog.
    #[serde(rename = "upi", alias = "qr")]
    Upi,
}

/// Whether a payment method settles at placement or later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentCompletion {
    /// Settled as part of placement.
    Synchronous,
    /// Settled by a later payment-completion (or dialog-closed) event.
    Asynchronous,
}

impl PaymentMethod {
    /// Completion style for this method.
    #[must_use]
    pub const fn completion(self) -> PaymentCompletion {
        match self {
            Self::Card | Self::CashOnDelivery => PaymentCompletion::Synchronous,
            Self::Upi => PaymentCompletion::Asynchronous,
        }
    }

    /// Wire name of the method.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::CashOnDelivery => "cod",
            Self::Upi => "upi",
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "card" | "saved-card" => Ok(Self::Card),
            "cod" => Ok(Self::CashOnDelivery),
            "upi" | "qr" => Ok(Self::Upi),
            other => Err(format!("invalid payment method: {other}")),
        }
    }
}

/// Status of a payment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

/// Canonical role of an authenticated identity.
///
/// Backends report roles in several shapes (`"ADMIN"`, `"ROLE_ADMIN"`, a
/// `roles` array); [`Role::normalize`] collapses them to one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SuperAdmin,
    Admin,
    Moderator,
    Employee,
    User,
}

impl Role {
    /// Precedence used when an identity carries several roles.
    const PRECEDENCE: [Self; 5] = [
        Self::SuperAdmin,
        Self::Admin,
        Self::Moderator,
        Self::Employee,
        Self::User,
    ];

    /// Administrative identities run the back office and never shop.
    #[must_use]
    pub const fn is_administrative(self) -> bool {
        !matches!(self, Self::User)
    }

    /// Pick the highest-precedence known role out of raw role strings.
    ///
    /// Unknown or missing roles normalize to [`Role::User`].
    #[must_use]
    pub fn normalize<'a, I>(raw: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let parsed: Vec<Self> = raw.into_iter().filter_map(|r| r.parse().ok()).collect();
        Self::PRECEDENCE
            .into_iter()
            .find(|role| parsed.contains(role))
            .unwrap_or(Self::User)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SuperAdmin => write!(f, "super_admin"),
            Self::Admin => write!(f, "admin"),
            Self::Moderator => write!(f, "moderator"),
            Self::Employee => write!(f, "employee"),
            Self::User => write!(f, "user"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let bare = upper.strip_prefix("ROLE_").unwrap_or(&upper);
        match bare {
            "SUPER_ADMIN" => Ok(Self::SuperAdmin),
            "ADMIN" => Ok(Self::Admin),
            "MODERATOR" => Ok(Self::Moderator),
            "EMPLOYEE" => Ok(Self::Employee),
            "USER" => Ok(Self::User),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellable_only_before_shipment() {
        assert!(OrderStatus::Placed.is_cancellable());
        assert!(OrderStatus::AwaitingPayment.is_cancellable());
        assert!(OrderStatus::Confirmed.is_cancellable());
        assert!(!OrderStatus::Shipped.is_cancellable());
        assert!(!OrderStatus::Delivered.is_cancellable());
        assert!(!OrderStatus::Cancelled.is_cancellable());
    }

    #[test]
    fn test_transition_edges() {
        assert!(OrderStatus::Placed.can_transition_to(OrderStatus::Confirmed));
        assert!(OrderStatus::Placed.can_transition_to(OrderStatus::AwaitingPayment));
        assert!(OrderStatus::AwaitingPayment.can_transition_to(OrderStatus::Confirmed));
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Delivered));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Placed.can_transition_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Placed));
    }

    #[test]
    fn test_payment_method_completion() {
        assert_eq!(
            PaymentMethod::Card.completion(),
            PaymentCompletion::Synchronous
        );
        assert_eq!(
            PaymentMethod::Upi.completion(),
            PaymentCompletion::Asynchronous
        );
        assert_eq!("saved-card".parse::<PaymentMethod>().unwrap(), PaymentMethod::Card);
    }

    #[test]
    fn test_payment_method_wire_names() {
        assert_eq!(serde_json::to_string(&PaymentMethod::Upi).unwrap(), "\"upi\"");
        let method: PaymentMethod = serde_json::from_str("\"saved-card\"").unwrap();
        assert_eq!(method, PaymentMethod::Card);
    }

    #[test]
    fn test_role_parse_strips_prefix() {
        assert_eq!("ROLE_ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("user".parse::<Role>().unwrap(), Role::User);
        assert!("ROLE_GUEST".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_normalize_picks_highest_precedence() {
        assert_eq!(Role::normalize(["ROLE_USER", "ROLE_MODERATOR"]), Role::Moderator);
        assert_eq!(Role::normalize(["USER"]), Role::User);
        assert_eq!(Role::normalize(Vec::<&str>::new()), Role::User);
        assert_eq!(Role::normalize(["SOMETHING_ELSE"]), Role::User);
    }

    #[test]
    fn test_role_administrative() {
        assert!(Role::Admin.is_administrative());
        assert!(Role::Employee.is_administrative());
        assert!(!Role::User.is_administrative());
    }
}
