//! Cart CRUD and line-item endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use cart_store::{CartStore, CouponStore};
use chrono::{DateTime, Utc};
use domain::{
    AddItems, Cart, CartItem, CartService, Coupon, CreateCart, NewItem, RemoveItem,
    UpdateItemQuantity,
};
use serde::{Deserialize, Serialize};

use super::{parse_cart_id, parse_item_id};
use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: CartStore + CouponStore> {
    pub cart_service: CartService<S, S>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CreateCartRequest {
    #[serde(default)]
    pub customer_id: String,
    #[serde(default)]
    pub currency: String,
}

#[derive(Deserialize)]
pub struct ListCartsQuery {
    pub customer_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct AddItemsRequest {
    #[serde(default)]
    pub items: Vec<CartItemRequest>,
}

#[derive(Deserialize)]
pub struct CartItemRequest {
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub product_name: String,
    pub unit_price: Option<i64>,
    pub quantity: Option<i64>,
}

#[derive(Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: Option<i64>,
}

// -- Response types --

#[derive(Serialize)]
pub struct CartResponse {
    pub id: String,
    pub customer_id: String,
    pub status: String,
    pub currency: String,
    pub subtotal: i64,
    pub discount_amount: i64,
    pub total_amount: i64,
    pub item_count: u64,
    pub coupon: Option<CouponResponse>,
    pub items: Vec<CartItemResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct CartItemResponse {
    pub id: String,
    pub product_id: String,
    pub product_name: String,
    pub unit_price: i64,
    pub quantity: u32,
    pub subtotal: i64,
    pub added_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct CouponResponse {
    pub id: String,
    pub code: String,
    pub discount_type: String,
    pub discount_value: i64,
    pub min_order_amount: i64,
    pub max_uses: i64,
    pub current_uses: i64,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
}

impl From<&CartItem> for CartItemResponse {
    fn from(item: &CartItem) -> Self {
        Self {
            id: item.id.to_string(),
            product_id: item.product_id.to_string(),
            product_name: item.product_name.clone(),
            unit_price: item.unit_price.cents(),
            quantity: item.quantity,
            subtotal: item.subtotal.cents(),
            added_at: item.added_at,
        }
    }
}

impl From<&Coupon> for CouponResponse {
    fn from(coupon: &Coupon) -> Self {
        Self {
            id: coupon.id.to_string(),
            code: coupon.code.clone(),
            discount_type: coupon.discount_type.to_string(),
            discount_value: coupon.discount_value,
            min_order_amount: coupon.min_order_amount.cents(),
            max_uses: coupon.max_uses,
            current_uses: coupon.current_uses,
            expires_at: coupon.expires_at,
            is_active: coupon.is_active,
        }
    }
}

impl From<&Cart> for CartResponse {
    fn from(cart: &Cart) -> Self {
        Self {
            id: cart.id().to_string(),
            customer_id: cart.customer_id().to_string(),
            status: cart.status().to_string(),
            currency: cart.currency().to_string(),
            subtotal: cart.subtotal().cents(),
            discount_amount: cart.discount_amount().cents(),
            total_amount: cart.total_amount().cents(),
            item_count: cart.item_count(),
            coupon: cart.coupon().map(CouponResponse::from),
            items: cart.items().iter().map(CartItemResponse::from).collect(),
            created_at: cart.created_at(),
            updated_at: cart.updated_at(),
        }
    }
}

impl From<Cart> for CartResponse {
    fn from(cart: Cart) -> Self {
        Self::from(&cart)
    }
}

// -- Handlers --

/// POST /carts: create a new empty cart.
#[tracing::instrument(skip(state, payload))]
pub async fn create<S: CartStore + CouponStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<CreateCartRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CartResponse>), ApiError> {
    let Json(req) = payload?;
    let cart = state
        .cart_service
        .create_cart(CreateCart::new(req.customer_id, req.currency))
        .await?;

    Ok((StatusCode::CREATED, Json(cart.into())))
}

/// GET /carts?customer_id=&status=: list a customer's carts, newest first.
#[tracing::instrument(skip(state, query))]
pub async fn list<S: CartStore + CouponStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<ListCartsQuery>,
) -> Result<Json<Vec<CartResponse>>, ApiError> {
    let carts = state
        .cart_service
        .get_carts_by_customer(
            query.customer_id.as_deref().unwrap_or_default(),
            query.status.as_deref(),
        )
        .await?;

    Ok(Json(carts.iter().map(CartResponse::from).collect()))
}

/// GET /carts/{id}: load a cart by ID.
#[tracing::instrument(skip(state))]
pub async fn get<S: CartStore + CouponStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state.cart_service.get_cart(parse_cart_id(&id)?).await?;
    Ok(Json(cart.into()))
}

/// POST /carts/{id}/items: add items, merging products already in the cart.
#[tracing::instrument(skip(state, payload))]
pub async fn add_items<S: CartStore + CouponStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    payload: Result<Json<AddItemsRequest>, JsonRejection>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart_id = parse_cart_id(&id)?;
    let Json(req) = payload?;

    let items = req
        .items
        .into_iter()
        .map(|item| NewItem {
            product_id: item.product_id,
            product_name: item.product_name,
            unit_price: item.unit_price,
            quantity: item.quantity.unwrap_or(0),
        })
        .collect();

    let cart = state
        .cart_service
        .add_items(AddItems::new(cart_id, items))
        .await?;
    Ok(Json(cart.into()))
}

/// PATCH /carts/{id}/items/{item_id}: set an item's quantity.
#[tracing::instrument(skip(state, payload))]
pub async fn update_item<S: CartStore + CouponStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((id, item_id)): Path<(String, String)>,
    payload: Result<Json<UpdateQuantityRequest>, JsonRejection>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart_id = parse_cart_id(&id)?;
    let item_id = parse_item_id(&item_id)?;
    let Json(req) = payload?;

    let cart = state
        .cart_service
        .update_item_quantity(UpdateItemQuantity::new(
            cart_id,
            item_id,
            req.quantity.unwrap_or(0),
        ))
        .await?;
    Ok(Json(cart.into()))
}

/// DELETE /carts/{id}/items/{item_id}: remove an item.
#[tracing::instrument(skip(state))]
pub async fn remove_item<S: CartStore + CouponStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((id, item_id)): Path<(String, String)>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart_id = parse_cart_id(&id)?;
    let item_id = parse_item_id(&item_id)?;

    let cart = state
        .cart_service
        .remove_item(RemoveItem::new(cart_id, item_id))
        .await?;
    Ok(Json(cart.into()))
}

/// POST /carts/{id}/abandon: abandon a cart that has not been checked out.
#[tracing::instrument(skip(state))]
pub async fn abandon<S: CartStore + CouponStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state.cart_service.abandon_cart(parse_cart_id(&id)?).await?;
    Ok(Json(cart.into()))
}
