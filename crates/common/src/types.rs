use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a cart.
///
/// Wraps a UUID to provide type safety and prevent mixing up
/// cart IDs with item IDs or other UUID-based identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartId(Uuid);

impl CartId {
    /// Creates a new random cart ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a cart ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for CartId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CartId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for CartId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<CartId> for Uuid {
    fn from(id: CartId) -> Self {
        id.0
    }
}

/// Unique identifier for a line item inside a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartItemId(Uuid);

impl CartItemId {
    /// Creates a new random item ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for CartItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CartItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for CartItemId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Coupon identifier.
///
/// Coupons are seeded externally with human-assigned keys such as `cpn_001`,
/// so unlike carts the identifier is an opaque string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CouponId(String);

impl CouponId {
    /// Creates a coupon ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the coupon ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CouponId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for CouponId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CouponId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
