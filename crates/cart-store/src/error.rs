use thiserror::Error;

use crate::{CartId, CouponId};

/// Errors that can occur when interacting with the cart and coupon stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An update targeted a cart that was never saved.
    #[error("Cart not found: {0}")]
    CartNotFound(CartId),

    /// A usage increment targeted an unknown coupon.
    #[error("Coupon not found: {0}")]
    CouponNotFound(CouponId),

    /// An initial insert collided with an existing cart.
    #[error("Cart already exists: {0}")]
    DuplicateCart(CartId),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
