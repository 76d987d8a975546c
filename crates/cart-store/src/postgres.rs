use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use common::CartId;

use crate::{Cart, CartStore, CartStoreError, LineItem, Result, Version};

/// PostgreSQL-backed cart store implementation.
///
/// Each cart is one row; the item list lives in a JSONB column and the
/// whole aggregate is written in a single conditional UPDATE, so the
/// optimistic version check and the write are one atomic statement.
#[derive(Clone)]
pub struct PostgresCartStore {
    pool: PgPool,
}

impl PostgresCartStore {
    /// Creates a new PostgreSQL cart store.
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

    fn row_to_cart(row: PgRow) -> Result<Cart> {
        let items_json: serde_json::Value = row.try_get("items")?;
        let items: Vec<LineItem> = serde_json::from_value(items_json)?;

        Ok(Cart::from_parts(
            CartId::from_uuid(row.try_get::<Uuid, _>("id")?),
            items,
            Version::new(row.try_get("version")?),
            row.try_get("created_at")?,
            row.try_get("updated_at")?,
        ))
    }
}

#[async_trait]
impl CartStore for PostgresCartStore {
    async fn insert(&self, cart: &Cart) -> Result<()> {
        let items_json = serde_json::to_value(cart.lines())?;

        sqlx::query(
            r#"
            INSERT INTO carts (id, items, version, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(cart.id().as_uuid())
        .bind(items_json)
        .bind(Version::first().as_i64())
        .bind(cart.created_at())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("carts_pkey")
            {
                return CartStoreError::AlreadyExists(cart.id());
            }
            CartStoreError::Database(e)
        })?;

        Ok(())
    }

    async fn find_by_id(&self, cart_id: CartId) -> Result<Option<Cart>> {
        let row = sqlx::query(
            r#"
            SELECT id, items, version, created_at, updated_at
            FROM carts
            WHERE id = $1
            "#,
        )
        .bind(cart_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_cart).transpose()
    }

    async fn find_all(&self) -> Result<Vec<Cart>> {
        let rows = sqlx::query(
            r#"
            SELECT id, items, version, created_at, updated_at
            FROM carts
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_cart).collect()
    }

    async fn save(&self, cart: &Cart) -> Result<Version> {
        let items_json = serde_json::to_value(cart.lines())?;
        let new_version = cart.version().next();

        let result = sqlx::query(
            r#"
            UPDATE carts
            SET items = $2, version = $3, updated_at = $4
            WHERE id = $1 AND version = $5
            "#,
        )
        .bind(cart.id().as_uuid())
        .bind(items_json)
        .bind(new_version.as_i64())
        .bind(Utc::now())
        .bind(cart.version().as_i64())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(new_version);
        }

        // The conditional update missed: the row is either gone or was
        // moved forward by another writer. Probe to tell the two apart.
        let actual: Option<i64> = sqlx::query_scalar("SELECT version FROM carts WHERE id = $1")
            .bind(cart.id().as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        match actual {
            Some(actual) => Err(CartStoreError::VersionConflict {
                cart_id: cart.id(),
                expected: cart.version(),
                actual: Version::new(actual),
            }),
            None => Err(CartStoreError::CartNotFound(cart.id())),
        }
    }

    async fn delete(&self, cart_id: CartId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM carts WHERE id = $1")
            .bind(cart_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}
