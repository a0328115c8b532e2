//! Coupon endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use cart_store::{CartStore, CouponStore};
use domain::ApplyCoupon;
use serde::Deserialize;

use super::carts::{AppState, CartResponse};
use super::parse_cart_id;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct ApplyCouponRequest {
    #[serde(default)]
    pub coupon_code: String,
}

/// POST /carts/{id}/coupon: apply a coupon code, replacing any previous coupon.
#[tracing::instrument(skip(state, payload))]
pub async fn apply<S: CartStore + CouponStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    payload: Result<Json<ApplyCouponRequest>, JsonRejection>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart_id = parse_cart_id(&id)?;
    let Json(req) = payload?;

    let cart = state
        .cart_service
        .apply_coupon(ApplyCoupon::new(cart_id, req.coupon_code))
        .await?;
    Ok(Json(cart.into()))
}
