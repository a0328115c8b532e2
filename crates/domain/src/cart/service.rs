//! Cart service running aggregate operations against injected stores.

use cart_store::{CartQuery, CartStore, CouponStore};
use chrono::Utc;
use common::CartId;

use crate::error::DomainError;

use super::{
    AddItems, ApplyCoupon, Cart, CartError, CartStatus, Coupon, CreateCart, ErrorKind, PlaceOrder,
    RemoveItem, TriggerPayment, UpdateItemQuantity,
};

/// Records a rejected operation before handing the error back.
fn rejected(operation: &'static str, err: CartError) -> DomainError {
    if err.kind() == ErrorKind::BusinessRule {
        metrics::counter!("cart_rule_violations_total", "operation" => operation).increment(1);
        tracing::warn!(operation, reason = %err, "business rule violation");
    }
    DomainError::Cart(err)
}

/// Service for managing carts.
///
/// Every operation loads the full cart, runs one aggregate command on the
/// in-memory copy and writes the result back through the cart store.
/// Concurrent writes to the same cart are last-write-wins.
pub struct CartService<C: CartStore, P: CouponStore> {
    carts: C,
    coupons: P,
}

impl<C: CartStore, P: CouponStore> CartService<C, P> {
    /// Creates a new cart service with the given stores.
    pub fn new(carts: C, coupons: P) -> Self {
        Self { carts, coupons }
    }

    /// Returns a reference to the cart store.
    pub fn carts(&self) -> &C {
        &self.carts
    }

    /// Returns a reference to the coupon store.
    pub fn coupons(&self) -> &P {
        &self.coupons
    }

    /// Creates a new empty cart.
    #[tracing::instrument(skip(self))]
    pub async fn create_cart(&self, cmd: CreateCart) -> Result<Cart, DomainError> {
        let cart = Cart::create(&cmd.customer_id, &cmd.currency, Utc::now())
            .map_err(|e| rejected("create_cart", e))?;

        self.carts.save(cart.to_record()).await?;

        metrics::counter!("carts_created_total").increment(1);
        tracing::info!(cart_id = %cart.id(), customer_id = %cart.customer_id(), "cart created");
        Ok(cart)
    }

    /// Loads a cart by ID.
    #[tracing::instrument(skip(self))]
    pub async fn get_cart(&self, cart_id: CartId) -> Result<Cart, DomainError> {
        self.load(cart_id).await
    }

    /// Lists a customer's carts, newest first, optionally filtered by status.
    #[tracing::instrument(skip(self))]
    pub async fn get_carts_by_customer(
        &self,
        customer_id: &str,
        status: Option<&str>,
    ) -> Result<Vec<Cart>, DomainError> {
        let customer_id = customer_id.trim();
        if customer_id.is_empty() {
            return Err(CartError::validation("customer_id", "customer_id is required").into());
        }

        let mut query = CartQuery::for_customer(customer_id);
        if let Some(status) = status.map(str::trim).filter(|s| !s.is_empty()) {
            let status = CartStatus::parse(status).ok_or_else(|| {
                CartError::validation("status", format!("Unknown cart status: {status}"))
            })?;
            query = query.status(status.as_str());
        }

        self.carts
            .find_by_customer(query)
            .await?
            .into_iter()
            .map(Cart::try_from)
            .collect()
    }

    /// Adds items to an active cart.
    #[tracing::instrument(skip(self))]
    pub async fn add_items(&self, cmd: AddItems) -> Result<Cart, DomainError> {
        let mut cart = self.load(cmd.cart_id).await?;
        let added: i64 = cmd.items.iter().map(|i| i.quantity.max(0)).sum();

        cart.add_items(cmd.items, Utc::now())
            .map_err(|e| rejected("add_items", e))?;
        self.persist(&cart).await?;

        metrics::counter!("cart_items_added_total").increment(u64::try_from(added).unwrap_or(0));
        Ok(cart)
    }

    /// Removes an item from an active cart.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(&self, cmd: RemoveItem) -> Result<Cart, DomainError> {
        let mut cart = self.load(cmd.cart_id).await?;

        cart.remove_item(cmd.item_id, Utc::now())
            .map_err(|e| rejected("remove_item", e))?;
        self.persist(&cart).await?;

        Ok(cart)
    }

    /// Sets the quantity of an item in an active cart.
    #[tracing::instrument(skip(self))]
    pub async fn update_item_quantity(&self, cmd: UpdateItemQuantity) -> Result<Cart, DomainError> {
        let mut cart = self.load(cmd.cart_id).await?;

        cart.update_item_quantity(cmd.item_id, cmd.quantity, Utc::now())
            .map_err(|e| rejected("update_item_quantity", e))?;
        self.persist(&cart).await?;

        Ok(cart)
    }

    /// Looks up a coupon by code and applies it to an active cart.
    #[tracing::instrument(skip(self))]
    pub async fn apply_coupon(&self, cmd: ApplyCoupon) -> Result<Cart, DomainError> {
        let mut cart = self.load(cmd.cart_id).await?;
        cart.ensure_active()
            .map_err(|e| rejected("apply_coupon", e))?;

        let code = cmd.coupon_code.trim();
        if code.is_empty() {
            return Err(CartError::validation("coupon_code", "coupon_code is required").into());
        }

        let record = self
            .coupons
            .find_by_code(code)
            .await?
            .ok_or_else(|| CartError::not_found("Coupon", code))?;
        let coupon = Coupon::try_from(record)?;

        cart.apply_coupon(coupon, Utc::now())
            .map_err(|e| rejected("apply_coupon", e))?;
        self.persist(&cart).await?;

        metrics::counter!("coupons_applied_total").increment(1);
        tracing::info!(cart_id = %cart.id(), coupon = code, "coupon applied");
        Ok(cart)
    }

    /// Checks that a cart has at least one item. Does not change the cart.
    #[tracing::instrument(skip(self))]
    pub async fn validate_cart(&self, cart_id: CartId) -> Result<Cart, DomainError> {
        let cart = self.load(cart_id).await?;
        cart.validate().map_err(|e| rejected("validate_cart", e))?;
        Ok(cart)
    }

    /// Moves an active cart into checkout.
    #[tracing::instrument(skip(self))]
    pub async fn initiate_checkout(&self, cart_id: CartId) -> Result<Cart, DomainError> {
        let mut cart = self.load(cart_id).await?;

        cart.initiate_checkout(Utc::now())
            .map_err(|e| rejected("initiate_checkout", e))?;
        self.persist(&cart).await?;

        tracing::info!(%cart_id, status = %cart.status(), "checkout initiated");
        Ok(cart)
    }

    /// Places the order and counts one use of the applied coupon.
    ///
    /// The cart write and the coupon increment are committed together; if
    /// either fails neither is applied and the cart stays in checkout.
    #[tracing::instrument(skip(self))]
    pub async fn place_order(&self, cmd: PlaceOrder) -> Result<Cart, DomainError> {
        let mut cart = self.load(cmd.cart_id).await?;

        let used_coupon = cart
            .place_order(&cmd.payment_method_id, Utc::now())
            .map_err(|e| rejected("place_order", e))?;

        self.carts
            .commit_order(cart.to_record(), used_coupon.clone())
            .await?;

        metrics::counter!("orders_placed_total").increment(1);
        tracing::info!(
            cart_id = %cart.id(),
            total = %cart.total_amount(),
            coupon = ?used_coupon.as_ref().map(|c| c.as_str()),
            "order placed"
        );
        Ok(cart)
    }

    /// Checks that payment may be triggered for a checked-out cart.
    ///
    /// Payment gateway integration is not wired up; the cart is returned unchanged.
    #[tracing::instrument(skip(self))]
    pub async fn trigger_payment(&self, cmd: TriggerPayment) -> Result<Cart, DomainError> {
        let cart = self.load(cmd.cart_id).await?;

        cart.trigger_payment(&cmd.order_id, &cmd.payment_method_id)
            .map_err(|e| rejected("trigger_payment", e))?;

        tracing::info!(cart_id = %cart.id(), order_id = %cmd.order_id, "payment triggered");
        Ok(cart)
    }

    /// Resets a cart to active after a downstream failure, whatever its status.
    #[tracing::instrument(skip(self))]
    pub async fn handle_validation_failure(&self, cart_id: CartId) -> Result<Cart, DomainError> {
        let mut cart = self.load(cart_id).await?;
        let previous = cart.status();

        cart.handle_validation_failure(Utc::now());
        self.persist(&cart).await?;

        tracing::info!(%cart_id, from = %previous, "cart reset to active");
        Ok(cart)
    }

    /// Abandons a cart that has not been checked out.
    #[tracing::instrument(skip(self))]
    pub async fn abandon_cart(&self, cart_id: CartId) -> Result<Cart, DomainError> {
        let mut cart = self.load(cart_id).await?;

        cart.abandon(Utc::now())
            .map_err(|e| rejected("abandon_cart", e))?;
        self.persist(&cart).await?;

        metrics::counter!("carts_abandoned_total").increment(1);
        tracing::info!(%cart_id, "cart abandoned");
        Ok(cart)
    }

    async fn load(&self, cart_id: CartId) -> Result<Cart, DomainError> {
        let record = self
            .carts
            .find_by_id(cart_id)
            .await?
            .ok_or_else(|| CartError::not_found("Cart", cart_id))?;
        Cart::try_from(record)
    }

    async fn persist(&self, cart: &Cart) -> Result<(), DomainError> {
        self.carts.update(cart.to_record()).await?;
        Ok(())
    }
}
