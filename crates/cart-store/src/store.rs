use async_trait::async_trait;

use crate::{CartId, CartQuery, CartRecord, CouponId, CouponRecord, Result};

/// Persistence contract for carts.
///
/// A cart is always read and written as a whole: the record carries its
/// items and applied coupon. All implementations must be thread-safe
/// (Send + Sync).
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Loads a cart by ID.
    ///
    /// Returns None if the cart doesn't exist.
    async fn find_by_id(&self, id: CartId) -> Result<Option<CartRecord>>;

    /// Lists a customer's carts, newest `created_at` first.
    async fn find_by_customer(&self, query: CartQuery) -> Result<Vec<CartRecord>>;

    /// Inserts a new cart.
    ///
    /// Fails with `DuplicateCart` if the ID is already taken.
    async fn save(&self, cart: CartRecord) -> Result<()>;

    /// Replaces a cart and all of its items.
    ///
    /// Fails with `CartNotFound` if the cart was never saved.
    async fn update(&self, cart: CartRecord) -> Result<()>;

    /// Replaces a cart and counts one use of `used_coupon` as a single unit.
    ///
    /// Either both writes land or neither does. Fails with `CartNotFound`
    /// or `CouponNotFound` when either side is missing.
    async fn commit_order(&self, cart: CartRecord, used_coupon: Option<CouponId>) -> Result<()>;
}

/// Persistence contract for coupons.
#[async_trait]
pub trait CouponStore: Send + Sync {
    /// Looks up a coupon by its human-facing code.
    async fn find_by_code(&self, code: &str) -> Result<Option<CouponRecord>>;

    /// Atomically increments the coupon's usage counter by one.
    async fn increment_usage(&self, id: &CouponId) -> Result<()>;
}
