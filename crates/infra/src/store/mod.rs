//! Owner-scoped storage abstractions.
//!
//! Every item and catalog query takes an [`Owner`]; a record is only ever
//! visible to the username that created it. Users are global.

use async_trait::async_trait;
use thiserror::Error;

use stockroom_auth::{Registration, User};
use stockroom_core::{ExpectedVersion, ItemId, Owner, UserId};
use stockroom_inventory::{CatalogEntry, CatalogKind, InventoryItem, ItemFilter};

pub mod in_memory;
pub mod owner_table;
pub mod postgres;

pub use in_memory::{InMemoryCatalogStore, InMemoryInventoryStore, InMemoryUserStore};
pub use owner_table::OwnerTable;
pub use postgres::{PostgresCatalogStore, PostgresInventoryStore, PostgresUserStore, migrate};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    /// A uniqueness constraint rejected the write (username, catalog name, id).
    #[error("duplicate record")]
    Duplicate,

    #[error("version conflict (expected: {expected:?}, actual: {actual})")]
    VersionConflict {
        expected: ExpectedVersion,
        actual: u64,
    },

    #[error("storage backend failure: {0}")]
    Backend(String),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user. The first-user-is-admin decision is made from the
    /// user count observed inside the same critical section as the insert.
    async fn register(&self, registration: Registration) -> StoreResult<User>;

    async fn get(&self, id: UserId) -> StoreResult<Option<User>>;

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    /// All users, oldest first.
    async fn list(&self) -> StoreResult<Vec<User>>;

    /// Flip the admin flag in one atomic step and return the updated user.
    async fn toggle_admin(&self, id: UserId) -> StoreResult<User>;

    /// Returns `false` when no such user existed.
    async fn delete(&self, id: UserId) -> StoreResult<bool>;
}

#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Insert a freshly created item; the stored copy starts at version 1.
    async fn insert(&self, item: InventoryItem) -> StoreResult<InventoryItem>;

    async fn get(&self, owner: &Owner, id: ItemId) -> StoreResult<Option<InventoryItem>>;

    /// Owner's items matching `filter`, newest first.
    async fn list(&self, owner: &Owner, filter: &ItemFilter) -> StoreResult<Vec<InventoryItem>>;

    /// Replace the stored item (matched by id and owner) when its version
    /// satisfies `expected`; the stored copy's version is bumped by one.
    async fn update(
        &self,
        item: InventoryItem,
        expected: ExpectedVersion,
    ) -> StoreResult<InventoryItem>;

    /// Returns `false` when no owned item matched.
    async fn delete(&self, owner: &Owner, id: ItemId) -> StoreResult<bool>;

    async fn count(&self, owner: &Owner) -> StoreResult<u64>;

    /// Delete every item of `owner`, returning how many were removed.
    async fn delete_owned(&self, owner: &Owner) -> StoreResult<u64>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Owner's custom entries of one kind, in creation order.
    async fn list(&self, owner: &Owner, kind: CatalogKind) -> StoreResult<Vec<CatalogEntry>>;

    /// Fails with `Duplicate` when the owner already has this (kind, name).
    async fn insert(&self, entry: CatalogEntry) -> StoreResult<CatalogEntry>;

    async fn delete_owned(&self, owner: &Owner) -> StoreResult<u64>;
}
