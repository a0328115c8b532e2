use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    CartId, CartQuery, CartRecord, CouponId, CouponRecord, Result, StoreError,
    seed::default_coupons,
    store::{CartStore, CouponStore},
};

/// In-memory cart and coupon store.
///
/// Used by tests and by the API server when no database is configured.
/// Clones share the same underlying maps.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    carts: Arc<RwLock<HashMap<CartId, CartRecord>>>,
    coupons: Arc<RwLock<HashMap<CouponId, CouponRecord>>>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-loaded with the default coupon catalogue.
    pub async fn with_default_coupons() -> Self {
        let store = Self::new();
        for coupon in default_coupons() {
            store.insert_coupon(coupon).await;
        }
        store
    }

    /// Inserts or replaces a coupon.
    pub async fn insert_coupon(&self, coupon: CouponRecord) {
        self.coupons.write().await.insert(coupon.id.clone(), coupon);
    }

    /// Returns a coupon by ID.
    pub async fn coupon_by_id(&self, id: &CouponId) -> Option<CouponRecord> {
        self.coupons.read().await.get(id).cloned()
    }

    /// Returns the total number of carts stored.
    pub async fn cart_count(&self) -> usize {
        self.carts.read().await.len()
    }
}

#[async_trait]
impl CartStore for InMemoryStore {
    async fn find_by_id(&self, id: CartId) -> Result<Option<CartRecord>> {
        Ok(self.carts.read().await.get(&id).cloned())
    }

    async fn find_by_customer(&self, query: CartQuery) -> Result<Vec<CartRecord>> {
        let carts = self.carts.read().await;
        let mut matching: Vec<_> = carts
            .values()
            .filter(|c| query.matches(&c.customer_id, &c.status))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    async fn save(&self, cart: CartRecord) -> Result<()> {
        let mut carts = self.carts.write().await;
        if carts.contains_key(&cart.id) {
            return Err(StoreError::DuplicateCart(cart.id));
        }
        carts.insert(cart.id, cart);
        Ok(())
    }

    async fn update(&self, cart: CartRecord) -> Result<()> {
        let mut carts = self.carts.write().await;
        match carts.get_mut(&cart.id) {
            Some(existing) => {
                *existing = cart;
                Ok(())
            }
            None => Err(StoreError::CartNotFound(cart.id)),
        }
    }

    async fn commit_order(&self, cart: CartRecord, used_coupon: Option<CouponId>) -> Result<()> {
        // Lock order: carts, then coupons.
        let mut carts = self.carts.write().await;
        let mut coupons = self.coupons.write().await;

        if !carts.contains_key(&cart.id) {
            return Err(StoreError::CartNotFound(cart.id));
        }
        if let Some(id) = &used_coupon {
            let coupon = coupons
                .get_mut(id)
                .ok_or_else(|| StoreError::CouponNotFound(id.clone()))?;
            coupon.current_uses += 1;
        }
        carts.insert(cart.id, cart);
        Ok(())
    }
}

#[async_trait]
impl CouponStore for InMemoryStore {
    async fn find_by_code(&self, code: &str) -> Result<Option<CouponRecord>> {
        let coupons = self.coupons.read().await;
        Ok(coupons.values().find(|c| c.code == code).cloned())
    }

    async fn increment_usage(&self, id: &CouponId) -> Result<()> {
        let mut coupons = self.coupons.write().await;
        let coupon = coupons
            .get_mut(id)
            .ok_or_else(|| StoreError::CouponNotFound(id.clone()))?;
        coupon.current_uses += 1;
        Ok(())
    }
}
