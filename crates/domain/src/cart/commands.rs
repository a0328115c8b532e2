//! Cart commands.
//!
//! Operations that only need a cart ID (validate, checkout, abandon, ...)
//! take the `CartId` directly instead of a command struct.

use common::{CartId, CartItemId};

use super::NewItem;

/// Command to create a new cart.
#[derive(Debug, Clone)]
pub struct CreateCart {
    pub customer_id: String,
    pub currency: String,
}

impl CreateCart {
    pub fn new(customer_id: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            customer_id: customer_id.into(),
            currency: currency.into(),
        }
    }
}

/// Command to add one or more items to a cart.
#[derive(Debug, Clone)]
pub struct AddItems {
    pub cart_id: CartId,
    pub items: Vec<NewItem>,
}

impl AddItems {
    pub fn new(cart_id: CartId, items: Vec<NewItem>) -> Self {
        Self { cart_id, items }
    }

    /// Creates an AddItems command for a single line.
    pub fn single(cart_id: CartId, item: NewItem) -> Self {
        Self {
            cart_id,
            items: vec![item],
        }
    }
}

/// Command to remove an item from a cart.
#[derive(Debug, Clone)]
pub struct RemoveItem {
    pub cart_id: CartId,
    pub item_id: CartItemId,
}

impl RemoveItem {
    pub fn new(cart_id: CartId, item_id: CartItemId) -> Self {
        Self { cart_id, item_id }
    }
}

/// Command to set the quantity of a cart item.
#[derive(Debug, Clone)]
pub struct UpdateItemQuantity {
    pub cart_id: CartId,
    pub item_id: CartItemId,

    /// Raw requested quantity; must be at least 1.
    pub quantity: i64,
}

impl UpdateItemQuantity {
    pub fn new(cart_id: CartId, item_id: CartItemId, quantity: i64) -> Self {
        Self {
            cart_id,
            item_id,
            quantity,
        }
    }
}

/// Command to apply a coupon code to a cart.
#[derive(Debug, Clone)]
pub struct ApplyCoupon {
    pub cart_id: CartId,
    pub coupon_code: String,
}

impl ApplyCoupon {
    pub fn new(cart_id: CartId, coupon_code: impl Into<String>) -> Self {
        Self {
            cart_id,
            coupon_code: coupon_code.into(),
        }
    }
}

/// Command to place an order from a cart in checkout.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub cart_id: CartId,
    pub payment_method_id: String,
}

impl PlaceOrder {
    pub fn new(cart_id: CartId, payment_method_id: impl Into<String>) -> Self {
        Self {
            cart_id,
            payment_method_id: payment_method_id.into(),
        }
    }
}

/// Command to trigger payment for a checked-out cart.
#[derive(Debug, Clone)]
pub struct TriggerPayment {
    pub cart_id: CartId,
    pub order_id: String,
    pub payment_method_id: String,
}

impl TriggerPayment {
    pub fn new(
        cart_id: CartId,
        order_id: impl Into<String>,
        payment_method_id: impl Into<String>,
    ) -> Self {
        Self {
            cart_id,
            order_id: order_id.into(),
            payment_method_id: payment_method_id.into(),
        }
    }
}
