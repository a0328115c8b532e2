//! Domain error types.

use cart_store::StoreError;
use thiserror::Error;

use crate::cart::{CartError, ErrorKind};

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A cart operation was rejected.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// An error occurred in the store.
    #[error("Store error: {0}")]
    Store(StoreError),

    /// A stored record could not be turned back into a domain object.
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),
}

impl DomainError {
    /// Returns the error kind for cart rejections, None for infrastructure failures.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            DomainError::Cart(e) => Some(e.kind()),
            DomainError::Store(_) | DomainError::CorruptRecord(_) => None,
        }
    }
}

impl From<StoreError> for DomainError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::CartNotFound(id) => DomainError::Cart(CartError::not_found("Cart", id)),
            StoreError::CouponNotFound(id) => {
                DomainError::Cart(CartError::not_found("Coupon", id))
            }
            other => DomainError::Store(other),
        }
    }
}
