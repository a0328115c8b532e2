//! Cart aggregate implementation.

use cart_store::{CartItemRecord, CartRecord};
use chrono::{DateTime, Utc};
use common::{CartId, CartItemId, CouponId};
use serde::Serialize;

use super::{
    CartError, CartItem, CartStatus, Coupon, CurrencyCode, CustomerId, Money, NewItem, ProductId,
    Totals, recalculate,
};
use crate::error::DomainError;

/// Cart aggregate root.
///
/// Owns its items and applied coupon. Every mutation validates first, builds
/// the candidate item list and totals, and only then commits, so a failed
/// operation leaves the cart exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cart {
    id: CartId,
    customer_id: CustomerId,
    status: CartStatus,
    currency: CurrencyCode,

    /// Derived from `items` and `coupon`.
    totals: Totals,

    /// Snapshot taken when the coupon was applied.
    coupon: Option<Coupon>,

    /// Line items in insertion order.
    items: Vec<CartItem>,

    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn amount_out_of_range(field: &'static str) -> CartError {
    CartError::validation(field, format!("{field} exceeds the supported range"))
}

// Query methods
impl Cart {
    pub fn id(&self) -> CartId {
        self.id
    }

    pub fn customer_id(&self) -> &CustomerId {
        &self.customer_id
    }

    pub fn status(&self) -> CartStatus {
        self.status
    }

    pub fn currency(&self) -> &CurrencyCode {
        &self.currency
    }

    pub fn totals(&self) -> Totals {
        self.totals
    }

    pub fn subtotal(&self) -> Money {
        self.totals.subtotal
    }

    pub fn discount_amount(&self) -> Money {
        self.totals.discount_amount
    }

    pub fn total_amount(&self) -> Money {
        self.totals.total_amount
    }

    /// Returns the total quantity across all items.
    pub fn item_count(&self) -> u64 {
        self.totals.item_count
    }

    pub fn coupon(&self) -> Option<&Coupon> {
        self.coupon.as_ref()
    }

    /// Returns all items in insertion order.
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Returns an item by its ID.
    pub fn get_item(&self, item_id: CartItemId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.id == item_id)
    }

    pub fn has_items(&self) -> bool {
        !self.items.is_empty()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

// Command methods
impl Cart {
    /// Creates a new, empty, active cart.
    pub fn create(customer_id: &str, currency: &str, now: DateTime<Utc>) -> Result<Self, CartError> {
        let customer_id = customer_id.trim();
        if customer_id.is_empty() {
            return Err(CartError::validation("customer_id", "customer_id is required"));
        }

        let currency = currency.trim();
        if currency.is_empty() {
            return Err(CartError::validation("currency", "currency is required"));
        }

        Ok(Self {
            id: CartId::new(),
            customer_id: CustomerId::new(customer_id),
            status: CartStatus::Active,
            currency: CurrencyCode::new(currency),
            totals: Totals::default(),
            coupon: None,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Fails unless the cart is active.
    pub fn ensure_active(&self) -> Result<(), CartError> {
        if !self.status.can_modify() {
            return Err(self.not_active());
        }
        Ok(())
    }

    fn not_active(&self) -> CartError {
        CartError::business_rule(format!(
            "Cart is not active. Current status: {}",
            self.status
        ))
    }

    /// Adds items to the cart.
    ///
    /// A product already in the cart has its quantity increased instead of
    /// getting a second line. The existing line keeps its position and
    /// `added_at`, and its unit price wins over the new one. Every entry is
    /// validated before any is applied.
    pub fn add_items(&mut self, new_items: Vec<NewItem>, now: DateTime<Utc>) -> Result<(), CartError> {
        self.ensure_active()?;

        if new_items.is_empty() {
            return Err(CartError::validation("items", "At least one item is required"));
        }

        let mut validated = Vec::with_capacity(new_items.len());
        for item in new_items {
            validated.push(validate_new_item(item)?);
        }

        let mut items = self.items.clone();
        for (product_id, product_name, unit_price, quantity) in validated {
            if let Some(existing) = items.iter_mut().find(|i| i.product_id == product_id) {
                let new_quantity = existing
                    .quantity
                    .checked_add(quantity)
                    .ok_or_else(|| amount_out_of_range("quantity"))?;
                existing.subtotal = existing
                    .unit_price
                    .checked_multiply(new_quantity)
                    .ok_or_else(|| amount_out_of_range("subtotal"))?;
                existing.quantity = new_quantity;
            } else {
                let subtotal = unit_price
                    .checked_multiply(quantity)
                    .ok_or_else(|| amount_out_of_range("subtotal"))?;
                items.push(CartItem {
                    id: CartItemId::new(),
                    product_id,
                    product_name,
                    unit_price,
                    quantity,
                    subtotal,
                    added_at: now,
                });
            }
        }

        self.commit_items(items, now)
    }

    /// Removes an item from the cart.
    pub fn remove_item(&mut self, item_id: CartItemId, now: DateTime<Utc>) -> Result<(), CartError> {
        self.ensure_active()?;

        let position = self
            .items
            .iter()
            .position(|item| item.id == item_id)
            .ok_or_else(|| CartError::not_found("CartItem", item_id))?;

        let mut items = self.items.clone();
        items.remove(position);
        self.commit_items(items, now)
    }

    /// Sets the quantity of a single item. Use `remove_item` to delete it.
    pub fn update_item_quantity(
        &mut self,
        item_id: CartItemId,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> Result<(), CartError> {
        self.ensure_active()?;

        if quantity < 1 {
            return Err(CartError::validation("quantity", "quantity must be >= 1"));
        }
        let quantity = u32::try_from(quantity).map_err(|_| amount_out_of_range("quantity"))?;

        let mut items = self.items.clone();
        let item = items
            .iter_mut()
            .find(|item| item.id == item_id)
            .ok_or_else(|| CartError::not_found("CartItem", item_id))?;

        item.subtotal = item
            .unit_price
            .checked_multiply(quantity)
            .ok_or_else(|| amount_out_of_range("subtotal"))?;
        item.quantity = quantity;

        self.commit_items(items, now)
    }

    /// Applies a coupon, replacing any previously applied one.
    ///
    /// Usage is not counted here; that happens once, when the order is placed.
    pub fn apply_coupon(&mut self, coupon: Coupon, now: DateTime<Utc>) -> Result<(), CartError> {
        self.ensure_active()?;
        coupon.ensure_applicable(self.totals.subtotal, now)?;

        let totals = recalculate(&self.items, Some(&coupon))
            .ok_or_else(|| amount_out_of_range("discount"))?;

        self.coupon = Some(coupon);
        self.totals = totals;
        self.updated_at = now;
        Ok(())
    }

    /// Read-only check that the cart has something to buy. Valid in any status.
    pub fn validate(&self) -> Result<(), CartError> {
        if !self.has_items() {
            return Err(CartError::business_rule(
                "Cart must have at least one item to validate",
            ));
        }
        Ok(())
    }

    /// Moves an active, non-empty cart into checkout.
    pub fn initiate_checkout(&mut self, now: DateTime<Utc>) -> Result<(), CartError> {
        if !self.status.can_initiate_checkout() {
            return Err(self.not_active());
        }

        if !self.has_items() {
            return Err(CartError::business_rule(
                "Cart must have at least one item to checkout",
            ));
        }

        self.transition(CartStatus::CheckingOut, now);
        Ok(())
    }

    /// Places the order for a cart in checkout.
    ///
    /// Returns the ID of the applied coupon, whose usage the caller must
    /// count exactly once.
    pub fn place_order(
        &mut self,
        payment_method_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<CouponId>, CartError> {
        if payment_method_id.trim().is_empty() {
            return Err(CartError::validation(
                "payment_method_id",
                "payment_method_id is required",
            ));
        }

        if !self.status.can_place_order() {
            return Err(CartError::business_rule(
                "Cart must be in checking_out status to place an order",
            ));
        }

        self.transition(CartStatus::CheckedOut, now);
        Ok(self.coupon.as_ref().map(|c| c.id.clone()))
    }

    /// Checks that payment may be triggered. Leaves the cart unchanged.
    pub fn trigger_payment(&self, order_id: &str, payment_method_id: &str) -> Result<(), CartError> {
        if order_id.trim().is_empty() {
            return Err(CartError::validation("order_id", "order_id is required"));
        }

        if payment_method_id.trim().is_empty() {
            return Err(CartError::validation(
                "payment_method_id",
                "payment_method_id is required",
            ));
        }

        if !self.status.can_trigger_payment() {
            return Err(CartError::business_rule(
                "Cart must be in checked_out status to trigger payment",
            ));
        }

        Ok(())
    }

    /// Resets the cart to active after a downstream validation or payment failure.
    pub fn handle_validation_failure(&mut self, now: DateTime<Utc>) {
        self.transition(CartStatus::Active, now);
    }

    /// Abandons the cart.
    pub fn abandon(&mut self, now: DateTime<Utc>) -> Result<(), CartError> {
        if !self.status.can_abandon() {
            let message = match self.status {
                CartStatus::Abandoned => "Cart is already abandoned",
                _ => "Cannot abandon a cart that has already been checked out",
            };
            return Err(CartError::business_rule(message));
        }

        self.transition(CartStatus::Abandoned, now);
        Ok(())
    }

    fn transition(&mut self, to: CartStatus, now: DateTime<Utc>) {
        self.status = to;
        self.updated_at = now;
    }

    fn commit_items(&mut self, items: Vec<CartItem>, now: DateTime<Utc>) -> Result<(), CartError> {
        let totals = recalculate(&items, self.coupon.as_ref())
            .ok_or_else(|| amount_out_of_range("subtotal"))?;

        self.items = items;
        self.totals = totals;
        self.updated_at = now;
        Ok(())
    }
}

fn validate_new_item(item: NewItem) -> Result<(ProductId, String, Money, u32), CartError> {
    let product_id = item.product_id.trim();
    if product_id.is_empty() {
        return Err(CartError::validation(
            "product_id",
            "product_id is required for each item",
        ));
    }

    let product_name = item.product_name.trim();
    if product_name.is_empty() {
        return Err(CartError::validation(
            "product_name",
            "product_name is required for each item",
        ));
    }

    let unit_price = match item.unit_price {
        None => {
            return Err(CartError::validation(
                "unit_price",
                "unit_price is required for each item",
            ));
        }
        Some(cents) if cents < 0 => {
            return Err(CartError::validation("unit_price", "unit_price must be >= 0"));
        }
        Some(cents) => Money::from_cents(cents),
    };

    if item.quantity <= 0 {
        return Err(CartError::validation(
            "quantity",
            "quantity must be greater than 0",
        ));
    }
    let quantity = u32::try_from(item.quantity).map_err(|_| amount_out_of_range("quantity"))?;

    Ok((
        ProductId::new(product_id),
        product_name.to_string(),
        unit_price,
        quantity,
    ))
}

// Persistence mapping
impl Cart {
    /// Converts the aggregate into its persistence record.
    pub fn to_record(&self) -> CartRecord {
        CartRecord {
            id: self.id,
            customer_id: self.customer_id.as_str().to_string(),
            status: self.status.as_str().to_string(),
            currency: self.currency.as_str().to_string(),
            subtotal: self.totals.subtotal.cents(),
            discount_amount: self.totals.discount_amount.cents(),
            total_amount: self.totals.total_amount.cents(),
            item_count: i64::try_from(self.totals.item_count).unwrap_or(i64::MAX),
            coupon: self.coupon.as_ref().map(Coupon::to_record),
            items: self
                .items
                .iter()
                .map(|item| CartItemRecord {
                    id: item.id,
                    product_id: item.product_id.as_str().to_string(),
                    product_name: item.product_name.clone(),
                    unit_price: item.unit_price.cents(),
                    quantity: i64::from(item.quantity),
                    subtotal: item.subtotal.cents(),
                    added_at: item.added_at,
                })
                .collect(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl TryFrom<CartRecord> for Cart {
    type Error = DomainError;

    /// Rebuilds the aggregate from storage.
    ///
    /// Stored totals are kept as written; the coupon snapshot is never
    /// re-evaluated. Totals that disagree with the items are rejected.
    fn try_from(record: CartRecord) -> Result<Self, Self::Error> {
        let cart_id = record.id;
        let corrupt = |what: String| DomainError::CorruptRecord(format!("cart {cart_id}: {what}"));

        let status = CartStatus::parse(&record.status)
            .ok_or_else(|| corrupt(format!("unknown status '{}'", record.status)))?;

        let coupon = record.coupon.map(Coupon::try_from).transpose()?;

        let mut items = Vec::with_capacity(record.items.len());
        for item in record.items {
            if item.unit_price < 0 {
                return Err(corrupt(format!("item {} has a negative unit price", item.id)));
            }
            let quantity = u32::try_from(item.quantity)
                .ok()
                .filter(|q| *q >= 1)
                .ok_or_else(|| corrupt(format!("item {} has quantity {}", item.id, item.quantity)))?;
            let unit_price = Money::from_cents(item.unit_price);
            let subtotal = unit_price
                .checked_multiply(quantity)
                .filter(|subtotal| subtotal.cents() == item.subtotal)
                .ok_or_else(|| corrupt(format!("item {} subtotal mismatch", item.id)))?;

            items.push(CartItem {
                id: item.id,
                product_id: ProductId::new(item.product_id),
                product_name: item.product_name,
                unit_price,
                quantity,
                subtotal,
                added_at: item.added_at,
            });
        }

        let from_items = recalculate(&items, None)
            .ok_or_else(|| corrupt("totals overflow".to_string()))?;
        if from_items.subtotal.cents() != record.subtotal
            || i64::try_from(from_items.item_count).ok() != Some(record.item_count)
        {
            return Err(corrupt("subtotal or item count does not match items".to_string()));
        }

        let subtotal = Money::from_cents(record.subtotal);
        let discount_amount = Money::from_cents(record.discount_amount);
        let discount_in_range = match coupon {
            Some(_) => !discount_amount.is_negative() && discount_amount <= subtotal,
            None => discount_amount.is_zero(),
        };
        if !discount_in_range || subtotal - discount_amount != Money::from_cents(record.total_amount)
        {
            return Err(corrupt(format!(
                "discount {} and total {} do not add up",
                record.discount_amount, record.total_amount
            )));
        }

        let totals = Totals {
            subtotal,
            discount_amount,
            total_amount: subtotal - discount_amount,
            item_count: from_items.item_count,
        };

        Ok(Cart {
            id: record.id,
            customer_id: CustomerId::new(record.customer_id),
            status,
            currency: CurrencyCode::new(record.currency),
            totals,
            coupon,
            items,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::cart::{DiscountType, ErrorKind};

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn active_cart() -> Cart {
        Cart::create("cust_1", "USD", now()).unwrap()
    }

    fn cart_with_widgets() -> Cart {
        let mut cart = active_cart();
        cart.add_items(vec![NewItem::new("prod_1", "Widget", 1000, 3)], now())
            .unwrap();
        cart
    }

    fn coupon(discount_type: DiscountType, value: i64, min_order: i64) -> Coupon {
        Coupon {
            id: CouponId::new("cpn_test"),
            code: "TEST".to_string(),
            discount_type,
            discount_value: value,
            min_order_amount: Money::from_cents(min_order),
            max_uses: 0,
            current_uses: 0,
            expires_at: now() + Duration::days(7),
            is_active: true,
        }
    }

    fn assert_invariants(cart: &Cart) {
        let subtotal: i64 = cart.items().iter().map(|i| i.subtotal.cents()).sum();
        let count: u64 = cart.items().iter().map(|i| u64::from(i.quantity)).sum();
        assert_eq!(cart.subtotal().cents(), subtotal);
        assert_eq!(cart.item_count(), count);
        assert_eq!(cart.total_amount(), cart.subtotal() - cart.discount_amount());
        assert!(cart.discount_amount() <= cart.subtotal());
        for item in cart.items() {
            assert_eq!(
                item.subtotal.cents(),
                item.unit_price.cents() * i64::from(item.quantity)
            );
        }
    }

    #[test]
    fn test_create_cart() {
        let cart = active_cart();

        assert_eq!(cart.customer_id().as_str(), "cust_1");
        assert_eq!(cart.currency().as_str(), "USD");
        assert_eq!(cart.status(), CartStatus::Active);
        assert_eq!(cart.totals(), Totals::default());
        assert!(cart.coupon().is_none());
        assert!(!cart.has_items());
        assert_eq!(cart.created_at(), cart.updated_at());
    }

    #[test]
    fn test_create_requires_customer_and_currency() {
        let err = Cart::create("  ", "USD", now()).unwrap_err();
        assert!(matches!(err, CartError::Validation { field: "customer_id", .. }));

        let err = Cart::create("cust_1", "", now()).unwrap_err();
        assert!(matches!(err, CartError::Validation { field: "currency", .. }));
    }

    #[test]
    fn test_add_items() {
        let cart = cart_with_widgets();

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.subtotal(), Money::from_cents(3000));
        assert_eq!(cart.total_amount(), Money::from_cents(3000));
        assert_eq!(cart.item_count(), 3);
        assert_invariants(&cart);
    }

    #[test]
    fn test_add_existing_product_merges_quantity() {
        let mut cart = cart_with_widgets();
        let first = cart.items()[0].clone();

        cart.add_items(
            vec![
                NewItem::new("prod_2", "Gadget", 250, 1),
                NewItem::new("prod_1", "Widget", 1000, 2),
            ],
            now() + Duration::seconds(5),
        )
        .unwrap();

        assert_eq!(cart.items().len(), 2);
        let merged = &cart.items()[0];
        assert_eq!(merged.id, first.id);
        assert_eq!(merged.added_at, first.added_at);
        assert_eq!(merged.quantity, 5);
        assert_eq!(merged.subtotal, Money::from_cents(5000));
        assert_eq!(cart.items()[1].product_id.as_str(), "prod_2");
        assert_eq!(cart.item_count(), 6);
        assert_invariants(&cart);
    }

    #[test]
    fn test_merge_within_one_request() {
        let mut cart = active_cart();
        cart.add_items(
            vec![
                NewItem::new("prod_1", "Widget", 100, 1),
                NewItem::new("prod_1", "Widget", 100, 4),
            ],
            now(),
        )
        .unwrap();

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 5);
        assert_invariants(&cart);
    }

    #[test]
    fn test_add_items_validation() {
        let mut cart = active_cart();

        let cases = [
            (NewItem::new("", "Widget", 100, 1), "product_id"),
            (NewItem::new("p", " ", 100, 1), "product_name"),
            (NewItem::new("p", "Widget", -1, 1), "unit_price"),
            (
                NewItem {
                    unit_price: None,
                    ..NewItem::new("p", "Widget", 0, 1)
                },
                "unit_price",
            ),
            (NewItem::new("p", "Widget", 100, 0), "quantity"),
            (NewItem::new("p", "Widget", 100, -2), "quantity"),
        ];

        for (item, expected_field) in cases {
            let err = cart.add_items(vec![item], now()).unwrap_err();
            match err {
                CartError::Validation { field, .. } => assert_eq!(field, expected_field),
                other => panic!("expected validation error, got {other:?}"),
            }
        }

        let err = cart.add_items(vec![], now()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_add_items_is_all_or_nothing() {
        let mut cart = cart_with_widgets();
        let before = cart.clone();

        let err = cart
            .add_items(
                vec![
                    NewItem::new("prod_2", "Gadget", 100, 1),
                    NewItem::new("prod_1", "Widget", 1000, 1),
                    NewItem::new("prod_3", "Broken", 100, 0),
                ],
                now(),
            )
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(cart, before);
    }

    #[test]
    fn test_add_items_overflow_leaves_cart_unchanged() {
        let mut cart = active_cart();
        cart.add_items(vec![NewItem::new("big", "Big", i64::MAX / 2, 1)], now())
            .unwrap();
        let before = cart.clone();

        let err = cart
            .add_items(vec![NewItem::new("big2", "Big", i64::MAX / 2, 3)], now())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(cart, before);
    }

    #[test]
    fn test_free_item_allowed() {
        let mut cart = active_cart();
        cart.add_items(vec![NewItem::new("gift", "Gift", 0, 1)], now())
            .unwrap();
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.subtotal(), Money::zero());
    }

    #[test]
    fn test_remove_item() {
        let mut cart = cart_with_widgets();
        cart.add_items(vec![NewItem::new("prod_2", "Gadget", 500, 2)], now())
            .unwrap();
        let widget_id = cart.items()[0].id;

        cart.remove_item(widget_id, now()).unwrap();

        assert_eq!(cart.items().len(), 1);
        assert!(cart.get_item(widget_id).is_none());
        assert_eq!(cart.subtotal(), Money::from_cents(1000));
        assert_invariants(&cart);
    }

    #[test]
    fn test_remove_unknown_item() {
        let mut cart = cart_with_widgets();
        let err = cart.remove_item(CartItemId::new(), now()).unwrap_err();
        assert!(matches!(err, CartError::NotFound { entity: "CartItem", .. }));
    }

    #[test]
    fn test_update_quantity() {
        let mut cart = cart_with_widgets();
        let item_id = cart.items()[0].id;

        cart.update_item_quantity(item_id, 7, now()).unwrap();

        assert_eq!(cart.items()[0].quantity, 7);
        assert_eq!(cart.subtotal(), Money::from_cents(7000));
        assert_eq!(cart.item_count(), 7);
        assert_invariants(&cart);
    }

    #[test]
    fn test_update_quantity_rejects_zero_and_unknown_item() {
        let mut cart = cart_with_widgets();
        let item_id = cart.items()[0].id;

        let err = cart.update_item_quantity(item_id, 0, now()).unwrap_err();
        assert!(matches!(err, CartError::Validation { field: "quantity", .. }));

        let err = cart
            .update_item_quantity(CartItemId::new(), 2, now())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_status_check_precedes_argument_validation() {
        let mut cart = cart_with_widgets();
        cart.initiate_checkout(now()).unwrap();

        let err = cart
            .update_item_quantity(CartItemId::new(), 0, now())
            .unwrap_err();
        assert_eq!(err.to_string(), "Cart is not active. Current status: checking_out");

        let err = cart.remove_item(CartItemId::new(), now()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BusinessRule);

        let unpriced = NewItem {
            unit_price: None,
            ..NewItem::new("prod_2", "Gadget", 0, 1)
        };
        let err = cart.add_items(vec![unpriced], now()).unwrap_err();
        assert_eq!(err.to_string(), "Cart is not active. Current status: checking_out");
    }

    #[test]
    fn test_cannot_modify_items_outside_active() {
        let mut cart = cart_with_widgets();
        cart.initiate_checkout(now()).unwrap();

        let err = cart
            .add_items(vec![NewItem::new("prod_2", "Gadget", 100, 1)], now())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BusinessRule);
    }

    #[test]
    fn test_apply_percentage_coupon() {
        let mut cart = active_cart();
        cart.add_items(vec![NewItem::new("prod_1", "Widget", 2500, 2)], now())
            .unwrap();

        cart.apply_coupon(coupon(DiscountType::Percentage, 10, 0), now())
            .unwrap();

        assert_eq!(cart.discount_amount(), Money::from_cents(500));
        assert_eq!(cart.total_amount(), Money::from_cents(4500));
        assert_invariants(&cart);
    }

    #[test]
    fn test_apply_fixed_coupon_is_capped() {
        let mut cart = active_cart();
        cart.add_items(vec![NewItem::new("prod_1", "Widget", 1500, 1)], now())
            .unwrap();

        cart.apply_coupon(coupon(DiscountType::FixedAmount, 2000, 0), now())
            .unwrap();

        assert_eq!(cart.discount_amount(), Money::from_cents(1500));
        assert_eq!(cart.total_amount(), Money::zero());
    }

    #[test]
    fn test_coupon_replaces_previous_one() {
        let mut cart = cart_with_widgets();
        cart.apply_coupon(coupon(DiscountType::Percentage, 10, 0), now())
            .unwrap();

        let mut second = coupon(DiscountType::FixedAmount, 100, 0);
        second.id = CouponId::new("cpn_second");
        cart.apply_coupon(second, now()).unwrap();

        assert_eq!(cart.coupon().map(|c| c.id.as_str()), Some("cpn_second"));
        assert_eq!(cart.discount_amount(), Money::from_cents(100));
    }

    #[test]
    fn test_coupon_below_minimum_leaves_cart_unchanged() {
        let mut cart = cart_with_widgets();
        let before = cart.clone();

        let err = cart
            .apply_coupon(coupon(DiscountType::Percentage, 10, 5000), now())
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::BusinessRule);
        assert_eq!(cart, before);
    }

    #[test]
    fn test_discount_follows_item_changes() {
        let mut cart = cart_with_widgets();
        cart.apply_coupon(coupon(DiscountType::Percentage, 10, 0), now())
            .unwrap();
        let item_id = cart.items()[0].id;

        cart.update_item_quantity(item_id, 1, now()).unwrap();
        assert_eq!(cart.discount_amount(), Money::from_cents(100));

        cart.remove_item(item_id, now()).unwrap();
        assert_eq!(cart.discount_amount(), Money::zero());
        assert_eq!(cart.total_amount(), Money::zero());
        assert!(cart.coupon().is_some());
    }

    #[test]
    fn test_validate() {
        assert!(cart_with_widgets().validate().is_ok());

        let err = active_cart().validate().unwrap_err();
        assert_eq!(err.to_string(), "Cart must have at least one item to validate");
    }

    #[test]
    fn test_checkout_requires_items() {
        let mut cart = active_cart();
        let err = cart.initiate_checkout(now()).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::BusinessRule);
        assert_eq!(cart.status(), CartStatus::Active);
    }

    #[test]
    fn test_checkout_only_from_active() {
        let mut cart = cart_with_widgets();
        cart.initiate_checkout(now()).unwrap();

        let err = cart.initiate_checkout(now()).unwrap_err();
        assert_eq!(err.to_string(), "Cart is not active. Current status: checking_out");

        cart.abandon(now()).unwrap();
        let err = cart.initiate_checkout(now()).unwrap_err();
        assert_eq!(err.to_string(), "Cart is not active. Current status: abandoned");
    }

    #[test]
    fn test_place_order() {
        let mut cart = cart_with_widgets();
        cart.apply_coupon(coupon(DiscountType::Percentage, 10, 0), now())
            .unwrap();
        cart.initiate_checkout(now()).unwrap();

        let used = cart.place_order("pm_card", now()).unwrap();

        assert_eq!(cart.status(), CartStatus::CheckedOut);
        assert_eq!(used.as_ref().map(CouponId::as_str), Some("cpn_test"));
    }

    #[test]
    fn test_place_order_without_coupon() {
        let mut cart = cart_with_widgets();
        cart.initiate_checkout(now()).unwrap();
        assert_eq!(cart.place_order("pm_card", now()).unwrap(), None);
    }

    #[test]
    fn test_place_order_validates_payment_method_first() {
        let mut cart = cart_with_widgets();

        let err = cart.place_order("", now()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = cart.place_order("pm_card", now()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cart must be in checking_out status to place an order"
        );
        assert_eq!(cart.status(), CartStatus::Active);
    }

    #[test]
    fn test_trigger_payment() {
        let mut cart = cart_with_widgets();
        assert_eq!(
            cart.trigger_payment("ord_1", "pm_card").unwrap_err().kind(),
            ErrorKind::BusinessRule
        );

        cart.initiate_checkout(now()).unwrap();
        cart.place_order("pm_card", now()).unwrap();
        let before = cart.clone();

        cart.trigger_payment("ord_1", "pm_card").unwrap();
        assert_eq!(cart, before);

        assert_eq!(
            cart.trigger_payment("", "pm_card").unwrap_err().kind(),
            ErrorKind::Validation
        );
        assert!(matches!(
            cart.trigger_payment("ord_1", " ").unwrap_err(),
            CartError::Validation { field: "payment_method_id", .. }
        ));
    }

    #[test]
    fn test_validation_failure_resets_any_status() {
        let mut cart = cart_with_widgets();
        cart.initiate_checkout(now()).unwrap();
        cart.place_order("pm_card", now()).unwrap();

        cart.handle_validation_failure(now());
        assert_eq!(cart.status(), CartStatus::Active);

        cart.abandon(now()).unwrap();
        cart.handle_validation_failure(now());
        assert_eq!(cart.status(), CartStatus::Active);
    }

    #[test]
    fn test_abandon() {
        let mut cart = cart_with_widgets();
        cart.abandon(now()).unwrap();
        assert_eq!(cart.status(), CartStatus::Abandoned);

        let err = cart
            .add_items(vec![NewItem::new("prod_2", "Gadget", 100, 1)], now())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BusinessRule);

        let err = cart.abandon(now()).unwrap_err();
        assert_eq!(err.to_string(), "Cart is already abandoned");
    }

    #[test]
    fn test_abandon_during_checkout() {
        let mut cart = cart_with_widgets();
        cart.initiate_checkout(now()).unwrap();
        cart.abandon(now()).unwrap();
        assert_eq!(cart.status(), CartStatus::Abandoned);
    }

    #[test]
    fn test_cannot_abandon_checked_out_cart() {
        let mut cart = cart_with_widgets();
        cart.initiate_checkout(now()).unwrap();
        cart.place_order("pm_card", now()).unwrap();

        let err = cart.abandon(now()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot abandon a cart that has already been checked out"
        );
        assert_eq!(cart.status(), CartStatus::CheckedOut);
    }

    #[test]
    fn test_mutations_stamp_updated_at() {
        let created = now();
        let mut cart = Cart::create("cust_1", "USD", created).unwrap();
        let later = created + Duration::minutes(1);

        cart.add_items(vec![NewItem::new("prod_1", "Widget", 100, 1)], later)
            .unwrap();

        assert_eq!(cart.created_at(), created);
        assert_eq!(cart.updated_at(), later);
        assert_eq!(cart.items()[0].added_at, later);
    }

    #[test]
    fn test_record_round_trip() {
        let mut cart = cart_with_widgets();
        cart.add_items(vec![NewItem::new("prod_2", "Gadget", 333, 2)], now())
            .unwrap();
        cart.apply_coupon(coupon(DiscountType::Percentage, 15, 0), now())
            .unwrap();

        let record = cart.to_record();
        assert_eq!(record.status, "active");
        assert_eq!(record.items.len(), 2);
        assert_eq!(record.item_count, 5);

        let restored = Cart::try_from(record).unwrap();
        assert_eq!(restored, cart);
    }

    #[test]
    fn test_corrupt_record_rejected() {
        let mut record = cart_with_widgets().to_record();
        record.status = "shipped".to_string();
        assert!(matches!(
            Cart::try_from(record),
            Err(DomainError::CorruptRecord(_))
        ));

        let mut record = cart_with_widgets().to_record();
        record.items[0].quantity = 0;
        assert!(matches!(
            Cart::try_from(record),
            Err(DomainError::CorruptRecord(_))
        ));

        let mut record = cart_with_widgets().to_record();
        record.total_amount += 1;
        assert!(matches!(
            Cart::try_from(record),
            Err(DomainError::CorruptRecord(_))
        ));

        let mut record = cart_with_widgets().to_record();
        record.discount_amount = 100;
        record.total_amount -= 100;
        assert!(matches!(
            Cart::try_from(record),
            Err(DomainError::CorruptRecord(_))
        ));

        let mut record = cart_with_widgets().to_record();
        record.items[0].subtotal += 1;
        record.subtotal += 1;
        record.total_amount += 1;
        assert!(matches!(
            Cart::try_from(record),
            Err(DomainError::CorruptRecord(_))
        ));
    }

    #[test]
    fn test_load_keeps_discount_computed_at_apply_time() {
        let mut cart = cart_with_widgets();
        cart.apply_coupon(coupon(DiscountType::Percentage, 10, 0), now())
            .unwrap();
        assert_eq!(cart.discount_amount(), Money::from_cents(300));

        let mut record = cart.to_record();
        if let Some(coupon) = record.coupon.as_mut() {
            coupon.discount_value = 50;
        }

        let restored = Cart::try_from(record).unwrap();
        assert_eq!(restored.discount_amount(), Money::from_cents(300));
        assert_eq!(restored.total_amount(), Money::from_cents(2700));
    }
}
