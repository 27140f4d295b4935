//! Postgres-backed stores.
//!
//! ## Ownership
//!
//! Every item and catalog query carries `owner` in its WHERE clause, so a
//! record is unreachable through another user's scope.
//!
//! ## Concurrency
//!
//! - Item updates are a single conditional `UPDATE ... WHERE version = $n`;
//!   the losing writer sees zero rows and gets `VersionConflict`.
//! - Registration takes a table lock so the user count used for the
//!   first-user-admin rule cannot race with another insert.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use stockroom_auth::{Registration, User};
use stockroom_core::{AggregateRoot, CatalogEntryId, ExpectedVersion, ItemId, Owner, UserId};
use stockroom_inventory::{
    CatalogEntry, CatalogKind, InventoryItem, ItemFilter, ItemRecord, LayawayReservation,
};

use super::{CatalogStore, InventoryStore, StoreError, StoreResult, UserStore};

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

/// Create the schema if it does not exist yet. Idempotent.
pub async fn migrate(pool: &PgPool) -> StoreResult<()> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| map_sqlx_error("migrate", e))?;
    tracing::info!("database schema ready");
    Ok(())
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            if db_err.code().as_deref() == Some("23505") {
                // Unique violation
                return StoreError::Duplicate;
            }
            StoreError::Backend(format!("database error in {operation}: {}", db_err.message()))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {operation}"))
        }
        sqlx::Error::RowNotFound => StoreError::NotFound,
        other => StoreError::Backend(format!("{operation}: {other}")),
    }
}

fn decode_error(err: impl std::error::Error + Send + Sync + 'static) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(err))
}

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

const USER_COLUMNS: &str = "id, username, password_hash, is_admin, created_at";

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: UserId::from_uuid(row.try_get("id")?),
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
        is_admin: row.try_get("is_admin")?,
        created_at: row.try_get("created_at")?,
    })
}

pub struct PostgresUserStore {
    pool: Arc<PgPool>,
}

impl PostgresUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl UserStore for PostgresUserStore {
    #[instrument(skip_all, fields(username = %registration.username), err)]
    async fn register(&self, registration: Registration) -> StoreResult<User> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("register_begin", e))?;

        // Blocks concurrent registrations (but not reads) until commit.
        sqlx::query("LOCK TABLE users IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("register_lock", e))?;

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("register_count", e))?;

        let user = registration.into_user(u64::try_from(existing).unwrap_or(0));

        sqlx::query(
            r#"
            INSERT INTO users (id, username, password_hash, is_admin, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.is_admin)
        .bind(user.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("register_insert", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("register_commit", e))?;

        Ok(user)
    }

    #[instrument(skip(self), err)]
    async fn get(&self, id: UserId) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_user", e))?;

        row.as_ref()
            .map(user_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("get_user", e))
    }

    #[instrument(skip(self), err)]
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let row = sqlx::query(&sql)
            .bind(username)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_username", e))?;

        row.as_ref()
            .map(user_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("find_user_by_username", e))
    }

    #[instrument(skip(self), err)]
    async fn list(&self) -> StoreResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC, id ASC");
        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_users", e))?;

        rows.iter()
            .map(user_from_row)
            .collect::<Result<_, _>>()
            .map_err(|e| map_sqlx_error("list_users", e))
    }

    #[instrument(skip(self), err)]
    async fn toggle_admin(&self, id: UserId) -> StoreResult<User> {
        let sql = format!(
            "UPDATE users SET is_admin = NOT is_admin WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("toggle_admin", e))?
            .ok_or(StoreError::NotFound)?;

        user_from_row(&row).map_err(|e| map_sqlx_error("toggle_admin", e))
    }

    #[instrument(skip(self), err)]
    async fn delete(&self, id: UserId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;
        Ok(result.rows_affected() > 0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Inventory items
// ─────────────────────────────────────────────────────────────────────────────

const ITEM_COLUMNS: &str = "id, owner, item_number, description, available, vendor, warehouse, \
                            notes, reserved, layaways, version, created_at, updated_at";

fn item_from_row(row: &PgRow) -> Result<InventoryItem, sqlx::Error> {
    let available: i32 = row.try_get("available")?;
    let reserved: i32 = row.try_get("reserved")?;
    let version: i64 = row.try_get("version")?;
    let Json(layaways): Json<Vec<LayawayReservation>> = row.try_get("layaways")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

    Ok(InventoryItem::from_record(ItemRecord {
        id: ItemId::from_uuid(row.try_get("id")?),
        owner: Owner::new(row.try_get::<String, _>("owner")?),
        item_number: row.try_get("item_number")?,
        description: row.try_get("description")?,
        available: u32::try_from(available).map_err(decode_error)?,
        vendor: row.try_get("vendor")?,
        warehouse: row.try_get("warehouse")?,
        notes: row.try_get("notes")?,
        reserved: u32::try_from(reserved).map_err(decode_error)?,
        layaways,
        created_at,
        updated_at,
        version: u64::try_from(version).map_err(decode_error)?,
    }))
}

fn to_i32(value: u32, operation: &str) -> StoreResult<i32> {
    i32::try_from(value)
        .map_err(|_| StoreError::Backend(format!("{operation}: quantity {value} out of range")))
}

fn to_i64(value: u64, operation: &str) -> StoreResult<i64> {
    i64::try_from(value)
        .map_err(|_| StoreError::Backend(format!("{operation}: version {value} out of range")))
}

/// `%`, `_` and `\` are literal in search terms.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

pub struct PostgresInventoryStore {
    pool: Arc<PgPool>,
}

impl PostgresInventoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl InventoryStore for PostgresInventoryStore {
    #[instrument(skip_all, fields(owner = %item.owner(), item_id = %item.id_typed()), err)]
    async fn insert(&self, item: InventoryItem) -> StoreResult<InventoryItem> {
        let item = item.with_version(1);
        let sql = format!(
            r#"
            INSERT INTO inventory_items ({ITEM_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#
        );
        sqlx::query(&sql)
            .bind(item.id_typed().as_uuid())
            .bind(item.owner().as_str())
            .bind(item.item_number())
            .bind(item.description())
            .bind(to_i32(item.available(), "insert_item")?)
            .bind(item.vendor())
            .bind(item.warehouse())
            .bind(item.notes())
            .bind(to_i32(item.reserved(), "insert_item")?)
            .bind(Json(item.layaways()))
            .bind(to_i64(item.version(), "insert_item")?)
            .bind(item.created_at())
            .bind(item.updated_at())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_item", e))?;

        Ok(item)
    }

    #[instrument(skip(self), fields(owner = %owner), err)]
    async fn get(&self, owner: &Owner, id: ItemId) -> StoreResult<Option<InventoryItem>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM inventory_items WHERE id = $1 AND owner = $2");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(owner.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_item", e))?;

        row.as_ref()
            .map(item_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("get_item", e))
    }

    #[instrument(skip(self), fields(owner = %owner), err)]
    async fn list(&self, owner: &Owner, filter: &ItemFilter) -> StoreResult<Vec<InventoryItem>> {
        let sql = format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM inventory_items
            WHERE owner = $1
              AND ($2::text IS NULL
                   OR item_number ILIKE $2
                   OR description ILIKE $2
                   OR vendor ILIKE $2
                   OR warehouse ILIKE $2)
              AND ($3::text IS NULL OR vendor = $3)
              AND ($4::text IS NULL OR warehouse = $4)
            ORDER BY created_at DESC, id DESC
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(owner.as_str())
            .bind(filter.search().map(like_pattern))
            .bind(filter.vendor())
            .bind(filter.warehouse())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_items", e))?;

        rows.iter()
            .map(item_from_row)
            .collect::<Result<_, _>>()
            .map_err(|e| map_sqlx_error("list_items", e))
    }

    #[instrument(skip_all, fields(owner = %item.owner(), item_id = %item.id_typed(), expected = ?expected), err)]
    async fn update(
        &self,
        item: InventoryItem,
        expected: ExpectedVersion,
    ) -> StoreResult<InventoryItem> {
        let expected_version = match expected {
            ExpectedVersion::Any => None,
            ExpectedVersion::Exact(v) => Some(to_i64(v, "update_item")?),
        };

        let sql = format!(
            r#"
            UPDATE inventory_items
            SET item_number = $3,
                description = $4,
                available = $5,
                vendor = $6,
                warehouse = $7,
                notes = $8,
                reserved = $9,
                layaways = $10,
                updated_at = $11,
                version = version + 1
            WHERE id = $1 AND owner = $2
              AND ($12::bigint IS NULL OR version = $12)
            RETURNING {ITEM_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(item.id_typed().as_uuid())
            .bind(item.owner().as_str())
            .bind(item.item_number())
            .bind(item.description())
            .bind(to_i32(item.available(), "update_item")?)
            .bind(item.vendor())
            .bind(item.warehouse())
            .bind(item.notes())
            .bind(to_i32(item.reserved(), "update_item")?)
            .bind(Json(item.layaways()))
            .bind(item.updated_at())
            .bind(expected_version)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_item", e))?;

        if let Some(row) = row {
            return item_from_row(&row).map_err(|e| map_sqlx_error("update_item", e));
        }

        // Nothing matched: either the item is gone or its version moved on.
        let actual: Option<i64> =
            sqlx::query_scalar("SELECT version FROM inventory_items WHERE id = $1 AND owner = $2")
                .bind(item.id_typed().as_uuid())
                .bind(item.owner().as_str())
                .fetch_optional(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("update_item_version", e))?;

        match actual {
            None => Err(StoreError::NotFound),
            Some(actual) => Err(StoreError::VersionConflict {
                expected,
                actual: u64::try_from(actual).unwrap_or(0),
            }),
        }
    }

    #[instrument(skip(self), fields(owner = %owner), err)]
    async fn delete(&self, owner: &Owner, id: ItemId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM inventory_items WHERE id = $1 AND owner = $2")
            .bind(id.as_uuid())
            .bind(owner.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_item", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(owner = %owner), err)]
    async fn count(&self, owner: &Owner) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM inventory_items WHERE owner = $1")
            .bind(owner.as_str())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_items", e))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    #[instrument(skip(self), fields(owner = %owner), err)]
    async fn delete_owned(&self, owner: &Owner) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM inventory_items WHERE owner = $1")
            .bind(owner.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_owned_items", e))?;
        Ok(result.rows_affected())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Catalog entries
// ─────────────────────────────────────────────────────────────────────────────

pub struct PostgresCatalogStore {
    pool: Arc<PgPool>,
}

impl PostgresCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl CatalogStore for PostgresCatalogStore {
    #[instrument(skip(self), fields(owner = %owner, kind = kind.as_str()), err)]
    async fn list(&self, owner: &Owner, kind: CatalogKind) -> StoreResult<Vec<CatalogEntry>> {
        // v7 ids sort in creation order.
        let rows = sqlx::query(
            "SELECT id, name FROM catalog_entries WHERE owner = $1 AND kind = $2 ORDER BY id",
        )
        .bind(owner.as_str())
        .bind(kind.as_str())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_catalog", e))?;

        rows.iter()
            .map(|row| {
                Ok(CatalogEntry {
                    id: CatalogEntryId::from_uuid(row.try_get::<Uuid, _>("id")?),
                    kind,
                    name: row.try_get("name")?,
                    owner: owner.clone(),
                })
            })
            .collect::<Result<_, sqlx::Error>>()
            .map_err(|e| map_sqlx_error("list_catalog", e))
    }

    #[instrument(skip_all, fields(owner = %entry.owner, kind = entry.kind.as_str()), err)]
    async fn insert(&self, entry: CatalogEntry) -> StoreResult<CatalogEntry> {
        sqlx::query("INSERT INTO catalog_entries (id, kind, name, owner) VALUES ($1, $2, $3, $4)")
            .bind(entry.id.as_uuid())
            .bind(entry.kind.as_str())
            .bind(&entry.name)
            .bind(entry.owner.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_catalog", e))?;
        Ok(entry)
    }

    #[instrument(skip(self), fields(owner = %owner), err)]
    async fn delete_owned(&self, owner: &Owner) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM catalog_entries WHERE owner = $1")
            .bind(owner.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_owned_catalog", e))?;
        Ok(result.rows_affected())
    }
}
