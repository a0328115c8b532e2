//! Identifier types shared across the cart service crates.

mod types;

pub use types::{CartId, CartItemId, CouponId};
