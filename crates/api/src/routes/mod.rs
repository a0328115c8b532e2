pub mod carts;
pub mod checkout;
pub mod coupons;
pub mod health;
pub mod metrics;

use common::{CartId, CartItemId};

use crate::error::ApiError;

fn parse_uuid(raw: &str, what: &str) -> Result<uuid::Uuid, ApiError> {
    uuid::Uuid::parse_str(raw).map_err(|e| ApiError::BadRequest(format!("Invalid {what}: {e}")))
}

pub(crate) fn parse_cart_id(raw: &str) -> Result<CartId, ApiError> {
    parse_uuid(raw, "cart id").map(CartId::from_uuid)
}

pub(crate) fn parse_item_id(raw: &str) -> Result<CartItemId, ApiError> {
    parse_uuid(raw, "cart item id").map(CartItemId::from_uuid)
}
