//! Authenticated identity as seen by the engine.

use serde::{Deserialize, Serialize};

use super::id::UserId;
use super::status::Role;

/// The signed-in identity, already normalized to a single [`Role`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// User ID.
    pub user_id: UserId,
    /// Display name.
    pub name: String,
    /// Email, when the backend provides one.
    pub email: Option<String>,
    /// Canonical role.
    pub role: Role,
}

impl Identity {
    /// Create an identity.
    #[must_use]
    pub fn new(user_id: UserId, name: impl Into<String>, role: Role) -> Self {
        Self {
            user_id,
            name: name.into(),
            email: None,
            role,
        }
    }

    /// Whether this identity shops (has a cart).
    #[must_use]
    pub const fn is_shopper(&self) -> bool {
        !self.role.is_administrative()
    }
}
