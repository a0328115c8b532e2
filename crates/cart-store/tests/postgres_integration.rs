//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p cart-store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use cart_store::{
    CartId, CartItemId, CartItemRecord, CartQuery, CartRecord, CartStore, CouponId, CouponStore,
    PostgresStore, StoreError,
};
use chrono::{Duration, DurationRound, Utc};
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Create a temporary pool just for migrations
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            PostgresStore::new(temp_pool.clone())
                .run_migrations()
                .await
                .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared cart tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    // Clear carts for test isolation; reset seeded coupon counters
    sqlx::query("TRUNCATE TABLE cart_items, carts")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("UPDATE coupons SET current_uses = 0")
        .execute(&pool)
        .await
        .unwrap();

    PostgresStore::new(pool)
}

/// Postgres stores microseconds; truncate so round-tripped records compare equal.
fn now() -> chrono::DateTime<Utc> {
    Utc::now()
        .duration_trunc(Duration::microseconds(1))
        .unwrap()
}

fn cart_record(customer_id: &str, created_at: chrono::DateTime<Utc>) -> CartRecord {
    CartRecord {
        id: CartId::new(),
        customer_id: customer_id.to_string(),
        status: "active".to_string(),
        currency: "USD".to_string(),
        subtotal: 0,
        discount_amount: 0,
        total_amount: 0,
        item_count: 0,
        coupon: None,
        items: vec![],
        created_at,
        updated_at: created_at,
    }
}

fn item_record(product_id: &str, unit_price: i64, quantity: i64) -> CartItemRecord {
    CartItemRecord {
        id: CartItemId::new(),
        product_id: product_id.to_string(),
        product_name: format!("Product {product_id}"),
        unit_price,
        quantity,
        subtotal: unit_price * quantity,
        added_at: now(),
    }
}

#[tokio::test]
async fn save_and_load_cart_with_items() {
    let store = get_test_store().await;
    let mut cart = cart_record("cust_1", now());
    cart.items = vec![item_record("prod_1", 1000, 3), item_record("prod_2", 250, 2)];
    cart.subtotal = 3500;
    cart.total_amount = 3500;
    cart.item_count = 5;

    store.save(cart.clone()).await.unwrap();

    let loaded = store.find_by_id(cart.id).await.unwrap().unwrap();
    assert_eq!(loaded, cart);
}

#[tokio::test]
async fn missing_cart_returns_none() {
    let store = get_test_store().await;
    assert!(store.find_by_id(CartId::new()).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_save_is_rejected() {
    let store = get_test_store().await;
    let cart = cart_record("cust_1", now());

    store.save(cart.clone()).await.unwrap();
    let result = store.save(cart).await;

    assert!(matches!(result, Err(StoreError::DuplicateCart(_))));
}

#[tokio::test]
async fn update_replaces_items_and_coupon() {
    let store = get_test_store().await;
    let mut cart = cart_record("cust_1", now());
    cart.items = vec![item_record("prod_1", 1000, 1)];
    store.save(cart.clone()).await.unwrap();

    let coupon = store.find_by_code("WELCOME20").await.unwrap().unwrap();
    cart.items = vec![item_record("prod_2", 3000, 2)];
    cart.subtotal = 6000;
    cart.discount_amount = 2000;
    cart.total_amount = 4000;
    cart.item_count = 2;
    cart.coupon = Some(coupon);
    cart.updated_at = now();
    store.update(cart.clone()).await.unwrap();

    let loaded = store.find_by_id(cart.id).await.unwrap().unwrap();
    assert_eq!(loaded.items.len(), 1);
    assert_eq!(loaded.items[0].product_id, "prod_2");
    assert_eq!(loaded.coupon_id().map(CouponId::as_str), Some("cpn_002"));
    assert_eq!(loaded, cart);
}

#[tokio::test]
async fn update_unknown_cart_fails() {
    let store = get_test_store().await;
    let result = store.update(cart_record("cust_1", now())).await;
    assert!(matches!(result, Err(StoreError::CartNotFound(_))));
}

#[tokio::test]
async fn carts_by_customer_newest_first_with_status_filter() {
    let store = get_test_store().await;
    let base = now();

    let oldest = cart_record("cust_1", base - Duration::minutes(30));
    let mut newest = cart_record("cust_1", base);
    newest.status = "abandoned".to_string();
    let middle = cart_record("cust_1", base - Duration::minutes(10));
    let other = cart_record("cust_2", base);
    for cart in [&oldest, &newest, &middle, &other] {
        store.save((*cart).clone()).await.unwrap();
    }

    let all = store
        .find_by_customer(CartQuery::for_customer("cust_1"))
        .await
        .unwrap();
    let ids: Vec<_> = all.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![newest.id, middle.id, oldest.id]);

    let active = store
        .find_by_customer(CartQuery::for_customer("cust_1").status("active"))
        .await
        .unwrap();
    let ids: Vec<_> = active.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![middle.id, oldest.id]);
}

#[tokio::test]
async fn seeded_coupons_are_available() {
    let store = get_test_store().await;

    let coupon = store.find_by_code("SAVE10").await.unwrap().unwrap();
    assert_eq!(coupon.id.as_str(), "cpn_001");
    assert_eq!(coupon.discount_type, "percentage");
    assert_eq!(coupon.discount_value, 10);
    assert_eq!(coupon.min_order_amount, 5000);
    assert!(coupon.is_active);

    assert!(store.find_by_code("UNKNOWN").await.unwrap().is_none());
}

#[tokio::test]
async fn increment_usage_is_atomic_per_call() {
    let store = get_test_store().await;
    let id = CouponId::from("cpn_003");

    store.increment_usage(&id).await.unwrap();
    store.increment_usage(&id).await.unwrap();

    let coupon = store.find_by_code("SUMMER15").await.unwrap().unwrap();
    assert_eq!(coupon.current_uses, 2);
}

#[tokio::test]
async fn increment_unknown_coupon_fails() {
    let store = get_test_store().await;
    let result = store.increment_usage(&CouponId::from("cpn_404")).await;
    assert!(matches!(result, Err(StoreError::CouponNotFound(_))));
}

#[tokio::test]
async fn applied_coupon_is_loaded_as_snapshot() {
    let store = get_test_store().await;
    let coupon_id = format!("cpn_{}", uuid::Uuid::new_v4().simple());
    sqlx::query(
        r#"
        INSERT INTO coupons (id, code, discount_type, discount_value, min_order_amount, max_uses, current_uses, expires_at, is_active)
        VALUES ($1, $1, 'percentage', 10, 0, 100, 0, $2, TRUE)
        "#,
    )
    .bind(&coupon_id)
    .bind(now() + Duration::days(30))
    .execute(store.pool())
    .await
    .unwrap();

    let coupon = store.find_by_code(&coupon_id).await.unwrap().unwrap();
    let mut cart = cart_record("cust_1", now());
    cart.items = vec![item_record("prod_1", 10000, 1)];
    cart.subtotal = 10000;
    cart.discount_amount = 1000;
    cart.total_amount = 9000;
    cart.item_count = 1;
    cart.coupon = Some(coupon.clone());
    store.save(cart.clone()).await.unwrap();

    sqlx::query("UPDATE coupons SET discount_value = 50, is_active = FALSE WHERE id = $1")
        .bind(&coupon_id)
        .execute(store.pool())
        .await
        .unwrap();

    let loaded = store.find_by_id(cart.id).await.unwrap().unwrap();
    assert_eq!(loaded.coupon, Some(coupon));
    assert_eq!(loaded.discount_amount, 1000);
    assert_eq!(loaded, cart);
}

#[tokio::test]
async fn commit_order_counts_coupon_with_cart_write() {
    let store = get_test_store().await;
    let mut cart = cart_record("cust_1", now());
    cart.status = "checking_out".to_string();
    store.save(cart.clone()).await.unwrap();

    cart.status = "checked_out".to_string();
    cart.updated_at = now();
    store
        .commit_order(cart.clone(), Some(CouponId::from("cpn_002")))
        .await
        .unwrap();

    let loaded = store.find_by_id(cart.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, "checked_out");
    let coupon = store.find_by_code("WELCOME20").await.unwrap().unwrap();
    assert_eq!(coupon.current_uses, 1);
}

#[tokio::test]
async fn commit_order_rolls_back_when_cart_is_missing() {
    let store = get_test_store().await;
    let mut cart = cart_record("cust_1", now());
    cart.status = "checked_out".to_string();

    let result = store
        .commit_order(cart, Some(CouponId::from("cpn_002")))
        .await;

    assert!(matches!(result, Err(StoreError::CartNotFound(_))));
    let coupon = store.find_by_code("WELCOME20").await.unwrap().unwrap();
    assert_eq!(coupon.current_uses, 0);
}

#[tokio::test]
async fn commit_order_rolls_back_when_coupon_is_missing() {
    let store = get_test_store().await;
    let mut cart = cart_record("cust_1", now());
    cart.status = "checking_out".to_string();
    store.save(cart.clone()).await.unwrap();

    let mut placed = cart.clone();
    placed.status = "checked_out".to_string();
    let result = store
        .commit_order(placed, Some(CouponId::from("cpn_404")))
        .await;

    assert!(matches!(result, Err(StoreError::CouponNotFound(_))));
    let loaded = store.find_by_id(cart.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, "checking_out");
}
