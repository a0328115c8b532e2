//! Domain layer for the cart service.
//!
//! This crate provides:
//! - The cart aggregate with its line-item rules
//! - The checkout state machine
//! - Coupon evaluation and pricing recalculation
//! - `CartService`, which runs operations against injected stores

pub mod cart;
pub mod error;

pub use cart::{
    AddItems, ApplyCoupon, Cart, CartError, CartItem, CartService, CartStatus, Coupon,
    CreateCart, CurrencyCode, CustomerId, DiscountType, ErrorKind, Money, NewItem, PlaceOrder,
    ProductId, RemoveItem, Totals, TriggerPayment, UpdateItemQuantity,
};
pub use error::DomainError;
