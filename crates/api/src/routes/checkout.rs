//! Checkout flow endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use cart_store::{CartStore, CouponStore};
use domain::{PlaceOrder, TriggerPayment};
use serde::Deserialize;

use super::carts::{AppState, CartResponse};
use super::parse_cart_id;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct PlaceOrderRequest {
    #[serde(default)]
    pub payment_method_id: String,
}

#[derive(Deserialize)]
pub struct TriggerPaymentRequest {
    #[serde(default)]
    pub order_id: String,
    #[serde(default)]
    pub payment_method_id: String,
}

/// POST /carts/{id}/validate: check the cart has items; status is unchanged.
#[tracing::instrument(skip(state))]
pub async fn validate<S: CartStore + CouponStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state.cart_service.validate_cart(parse_cart_id(&id)?).await?;
    Ok(Json(cart.into()))
}

/// POST /carts/{id}/checkout: move an active cart into checkout.
#[tracing::instrument(skip(state))]
pub async fn initiate<S: CartStore + CouponStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state
        .cart_service
        .initiate_checkout(parse_cart_id(&id)?)
        .await?;
    Ok(Json(cart.into()))
}

/// POST /carts/{id}/order: place the order.
#[tracing::instrument(skip(state, payload))]
pub async fn place_order<S: CartStore + CouponStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    payload: Result<Json<PlaceOrderRequest>, JsonRejection>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart_id = parse_cart_id(&id)?;
    let Json(req) = payload?;

    let cart = state
        .cart_service
        .place_order(PlaceOrder::new(cart_id, req.payment_method_id))
        .await?;
    Ok(Json(cart.into()))
}

/// POST /carts/{id}/payment: trigger payment for a checked-out cart.
#[tracing::instrument(skip(state, payload))]
pub async fn trigger_payment<S: CartStore + CouponStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    payload: Result<Json<TriggerPaymentRequest>, JsonRejection>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart_id = parse_cart_id(&id)?;
    let Json(req) = payload?;

    let cart = state
        .cart_service
        .trigger_payment(TriggerPayment::new(
            cart_id,
            req.order_id,
            req.payment_method_id,
        ))
        .await?;
    Ok(Json(cart.into()))
}

/// POST /carts/{id}/validation-failure: reset the cart to active.
#[tracing::instrument(skip(state))]
pub async fn validation_failure<S: CartStore + CouponStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state
        .cart_service
        .handle_validation_failure(parse_cart_id(&id)?)
        .await?;
    Ok(Json(cart.into()))
}
