use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow, types::Json};
use uuid::Uuid;

use crate::{
    CartId, CartItemId, CartItemRecord, CartQuery, CartRecord, CouponId, CouponRecord, Result,
    StoreError,
    store::{CartStore, CouponStore},
};

const CART_COLUMNS: &str = r#"
    id, customer_id, status, currency, subtotal, discount_amount,
    total_amount, item_count, coupon_snapshot, created_at, updated_at
"#;

/// PostgreSQL-backed cart and coupon store.
///
/// Carts keep a JSONB snapshot of the coupon taken when it was applied,
/// alongside the `coupon_id` reference.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_cart(row: &PgRow) -> Result<CartRecord> {
        let coupon = row
            .try_get::<Option<Json<CouponRecord>>, _>("coupon_snapshot")?
            .map(|snapshot| snapshot.0);

        Ok(CartRecord {
            id: CartId::from_uuid(row.try_get::<Uuid, _>("id")?),
            customer_id: row.try_get("customer_id")?,
            status: row.try_get("status")?,
            currency: row.try_get("currency")?,
            subtotal: row.try_get("subtotal")?,
            discount_amount: row.try_get("discount_amount")?,
            total_amount: row.try_get("total_amount")?,
            item_count: row.try_get("item_count")?,
            coupon,
            items: Vec::new(),
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
        })
    }

    fn row_to_item(row: &PgRow) -> Result<CartItemRecord> {
        Ok(CartItemRecord {
            id: CartItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
            product_id: row.try_get("product_id")?,
            product_name: row.try_get("product_name")?,
            unit_price: row.try_get("unit_price")?,
            quantity: row.try_get("quantity")?,
            subtotal: row.try_get("subtotal")?,
            added_at: row.try_get("added_at")?,
        })
    }

    /// Loads the items of every given cart, grouped by cart ID in position order.
    async fn load_items(&self, cart_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<CartItemRecord>>> {
        let rows = sqlx::query(
            r#"
            SELECT cart_id, id, product_id, product_name, unit_price, quantity, subtotal, added_at
            FROM cart_items
            WHERE cart_id = ANY($1)
            ORDER BY cart_id, position ASC
            "#,
        )
        .bind(cart_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<CartItemRecord>> = HashMap::new();
        for row in &rows {
            let cart_id: Uuid = row.try_get("cart_id")?;
            grouped
                .entry(cart_id)
                .or_default()
                .push(Self::row_to_item(row)?);
        }
        Ok(grouped)
    }

    /// Overwrites the cart row and replaces its items inside `tx`.
    async fn replace_cart(tx: &mut Transaction<'_, Postgres>, cart: &CartRecord) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE carts
            SET customer_id = $2,
                status = $3,
                currency = $4,
                subtotal = $5,
                discount_amount = $6,
                total_amount = $7,
                item_count = $8,
                coupon_id = $9,
                coupon_snapshot = $10,
                updated_at = $11
            WHERE id = $1
            "#,
        )
        .bind(cart.id.as_uuid())
        .bind(&cart.customer_id)
        .bind(&cart.status)
        .bind(&cart.currency)
        .bind(cart.subtotal)
        .bind(cart.discount_amount)
        .bind(cart.total_amount)
        .bind(cart.item_count)
        .bind(cart.coupon_id().map(CouponId::as_str))
        .bind(cart.coupon.as_ref().map(Json))
        .bind(cart.updated_at)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::CartNotFound(cart.id));
        }

        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart.id.as_uuid())
            .execute(&mut **tx)
            .await?;

        Self::insert_items(tx, cart).await
    }

    async fn increment_usage_in(tx: &mut Transaction<'_, Postgres>, id: &CouponId) -> Result<()> {
        let result =
            sqlx::query("UPDATE coupons SET current_uses = current_uses + 1 WHERE id = $1")
                .bind(id.as_str())
                .execute(&mut **tx)
                .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::CouponNotFound(id.clone()));
        }
        Ok(())
    }

    async fn insert_items(tx: &mut Transaction<'_, Postgres>, cart: &CartRecord) -> Result<()> {
        for (position, item) in cart.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO cart_items (id, cart_id, position, product_id, product_name, unit_price, quantity, subtotal, added_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(item.id.as_uuid())
            .bind(cart.id.as_uuid())
            .bind(position as i32)
            .bind(&item.product_id)
            .bind(&item.product_name)
            .bind(item.unit_price)
            .bind(item.quantity)
            .bind(item.subtotal)
            .bind(item.added_at)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl CartStore for PostgresStore {
    async fn find_by_id(&self, id: CartId) -> Result<Option<CartRecord>> {
        let sql = format!(
            "SELECT {CART_COLUMNS} FROM carts WHERE id = $1"
        );
        let row: Option<PgRow> = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut cart = Self::row_to_cart(&row)?;
        let mut items = self.load_items(&[id.as_uuid()]).await?;
        cart.items = items.remove(&id.as_uuid()).unwrap_or_default();
        Ok(Some(cart))
    }

    async fn find_by_customer(&self, query: CartQuery) -> Result<Vec<CartRecord>> {
        let mut sql = format!(
            "SELECT {CART_COLUMNS} FROM carts WHERE customer_id = $1"
        );
        if query.status.is_some() {
            sql.push_str(" AND status = $2");
        }
        sql.push_str(" ORDER BY created_at DESC");

        let mut sqlx_query = sqlx::query(&sql).bind(&query.customer_id);
        if let Some(status) = &query.status {
            sqlx_query = sqlx_query.bind(status);
        }
        let rows = sqlx_query.fetch_all(&self.pool).await?;

        let mut carts = rows
            .iter()
            .map(Self::row_to_cart)
            .collect::<Result<Vec<_>>>()?;
        if carts.is_empty() {
            return Ok(carts);
        }

        let ids: Vec<Uuid> = carts.iter().map(|c| c.id.as_uuid()).collect();
        let mut items = self.load_items(&ids).await?;
        for cart in &mut carts {
            cart.items = items.remove(&cart.id.as_uuid()).unwrap_or_default();
        }
        Ok(carts)
    }

    async fn save(&self, cart: CartRecord) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO carts (id, customer_id, status, currency, subtotal, discount_amount, total_amount, item_count, coupon_id, coupon_snapshot, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(cart.id.as_uuid())
        .bind(&cart.customer_id)
        .bind(&cart.status)
        .bind(&cart.currency)
        .bind(cart.subtotal)
        .bind(cart.discount_amount)
        .bind(cart.total_amount)
        .bind(cart.item_count)
        .bind(cart.coupon_id().map(CouponId::as_str))
        .bind(cart.coupon.as_ref().map(Json))
        .bind(cart.created_at)
        .bind(cart.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return StoreError::DuplicateCart(cart.id);
            }
            StoreError::Database(e)
        })?;

        Self::insert_items(&mut tx, &cart).await?;

        tx.commit().await?;
        tracing::debug!(cart_id = %cart.id, "cart inserted");
        Ok(())
    }

    async fn update(&self, cart: CartRecord) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::replace_cart(&mut tx, &cart).await?;
        tx.commit().await?;
        tracing::debug!(cart_id = %cart.id, status = %cart.status, "cart updated");
        Ok(())
    }

    async fn commit_order(&self, cart: CartRecord, used_coupon: Option<CouponId>) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::replace_cart(&mut tx, &cart).await?;

        if let Some(coupon_id) = &used_coupon {
            Self::increment_usage_in(&mut tx, coupon_id).await?;
        }

        tx.commit().await?;
        tracing::debug!(
            cart_id = %cart.id,
            coupon_id = used_coupon.as_ref().map(CouponId::as_str),
            "order committed"
        );
        Ok(())
    }
}

#[async_trait]
impl CouponStore for PostgresStore {
    async fn find_by_code(&self, code: &str) -> Result<Option<CouponRecord>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT id, code, discount_type, discount_value, min_order_amount,
                   max_uses, current_uses, expires_at, is_active
            FROM coupons
            WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(CouponRecord {
                id: CouponId::new(row.try_get::<String, _>("id")?),
                code: row.try_get("code")?,
                discount_type: row.try_get("discount_type")?,
                discount_value: row.try_get("discount_value")?,
                min_order_amount: row.try_get("min_order_amount")?,
                max_uses: row.try_get("max_uses")?,
                current_uses: row.try_get("current_uses")?,
                expires_at: row.try_get("expires_at")?,
                is_active: row.try_get("is_active")?,
            })),
            None => Ok(None),
        }
    }

    async fn increment_usage(&self, id: &CouponId) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::increment_usage_in(&mut tx, id).await?;
        tx.commit().await?;
        Ok(())
    }
}
