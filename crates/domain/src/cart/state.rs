//! Cart state machine.

use serde::{Deserialize, Serialize};

/// The status of a cart in its lifecycle.
///
/// State transitions:
/// ```text
/// Active ──► CheckingOut ──► CheckedOut
///   │              │
///   └──────────────┴──► Abandoned
///
/// any status ──(validation failure)──► Active
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CartStatus {
    /// Cart is open; items and coupon can be changed.
    #[default]
    Active,

    /// Checkout has started, awaiting order placement.
    CheckingOut,

    /// An order has been placed from this cart.
    CheckedOut,

    /// Cart was abandoned by the customer.
    Abandoned,
}

impl CartStatus {
    /// Returns true if items and coupon can be modified in this status.
    pub fn can_modify(&self) -> bool {
        matches!(self, CartStatus::Active)
    }

    /// Returns true if checkout can be initiated in this status.
    pub fn can_initiate_checkout(&self) -> bool {
        matches!(self, CartStatus::Active)
    }

    /// Returns true if an order can be placed in this status.
    pub fn can_place_order(&self) -> bool {
        matches!(self, CartStatus::CheckingOut)
    }

    /// Returns true if payment can be triggered in this status.
    pub fn can_trigger_payment(&self) -> bool {
        matches!(self, CartStatus::CheckedOut)
    }

    /// Returns true if the cart can be abandoned in this status.
    pub fn can_abandon(&self) -> bool {
        matches!(self, CartStatus::Active | CartStatus::CheckingOut)
    }

    /// Returns the status name as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            CartStatus::Active => "active",
            CartStatus::CheckingOut => "checking_out",
            CartStatus::CheckedOut => "checked_out",
            CartStatus::Abandoned => "abandoned",
        }
    }

    /// Parses a status name, returning None for unknown values.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(CartStatus::Active),
            "checking_out" => Some(CartStatus::CheckingOut),
            "checked_out" => Some(CartStatus::CheckedOut),
            "abandoned" => Some(CartStatus::Abandoned),
            _ => None,
        }
    }
}

impl std::fmt::Display for CartStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
