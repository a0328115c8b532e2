//! Row-shaped persistence records.
//!
//! Records mirror the `carts`, `cart_items` and `coupons` tables one-to-one.
//! Enumerations (cart status, discount type) are kept as their stored string
//! names; the domain layer is responsible for parsing them back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CartId, CartItemId, CouponId};

/// A persisted cart together with its items and applied coupon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartRecord {
    pub id: CartId,
    pub customer_id: String,
    pub status: String,
    pub currency: String,
    pub subtotal: i64,
    pub discount_amount: i64,
    pub total_amount: i64,
    pub item_count: i64,
    pub coupon: Option<CouponRecord>,
    pub items: Vec<CartItemRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartRecord {
    /// Returns the ID of the applied coupon, if any.
    pub fn coupon_id(&self) -> Option<&CouponId> {
        self.coupon.as_ref().map(|c| &c.id)
    }
}

/// A persisted cart line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItemRecord {
    pub id: CartItemId,
    pub product_id: String,
    pub product_name: String,
    pub unit_price: i64,
    pub quantity: i64,
    pub subtotal: i64,
    pub added_at: DateTime<Utc>,
}

/// A persisted coupon definition and its usage counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponRecord {
    pub id: CouponId,
    pub code: String,
    pub discount_type: String,
    pub discount_value: i64,
    pub min_order_amount: i64,
    /// Zero means unlimited.
    pub max_uses: i64,
    pub current_uses: i64,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
}
