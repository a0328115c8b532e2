//! Pricing recalculation.

use serde::{Deserialize, Serialize};

use super::{CartItem, Coupon, Money};

/// Derived monetary totals of a cart.
///
/// Always recomputed in full from the item list and coupon; never updated
/// incrementally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: Money,
    pub discount_amount: Money,
    pub total_amount: Money,
    pub item_count: u64,
}

/// Recomputes cart totals from its items and optional coupon.
///
/// Returns None if any sum overflows.
pub fn recalculate(items: &[CartItem], coupon: Option<&Coupon>) -> Option<Totals> {
    let mut subtotal = Money::zero();
    let mut item_count: u64 = 0;

    for item in items {
        subtotal = subtotal.checked_add(item.subtotal)?;
        item_count = item_count.checked_add(u64::from(item.quantity))?;
    }

    let discount_amount = match coupon {
        Some(coupon) => coupon.discount_for(subtotal)?,
        None => Money::zero(),
    };

    Some(Totals {
        subtotal,
        discount_amount,
        total_amount: subtotal - discount_amount,
        item_count,
    })
}
