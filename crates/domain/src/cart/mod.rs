//! Cart aggregate and related types.

mod aggregate;
mod commands;
mod coupon;
mod pricing;
mod service;
mod state;
mod value_objects;

pub use aggregate::Cart;
pub use commands::*;
pub use coupon::{Coupon, DiscountType};
pub use pricing::{recalculate, Totals};
pub use service::CartService;
pub use state::CartStatus;
pub use value_objects::{CartItem, CurrencyCode, CustomerId, Money, NewItem, ProductId};

use thiserror::Error;

/// The three kinds of failure a cart operation can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or missing input.
    Validation,
    /// A referenced cart, item or coupon does not exist.
    NotFound,
    /// Well-formed request that breaks a domain rule.
    BusinessRule,
}

/// Errors that can occur during cart operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// Input failed validation.
    #[error("{message}")]
    Validation { field: &'static str, message: String },

    /// Referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Operation violates a business rule.
    #[error("{0}")]
    BusinessRule(String),
}

impl CartError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        CartError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        CartError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn business_rule(reason: impl Into<String>) -> Self {
        CartError::BusinessRule(reason.into())
    }

    /// Returns which of the three error kinds this is.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CartError::Validation { .. } => ErrorKind::Validation,
            CartError::NotFound { .. } => ErrorKind::NotFound,
            CartError::BusinessRule(_) => ErrorKind::BusinessRule,
        }
    }
}
