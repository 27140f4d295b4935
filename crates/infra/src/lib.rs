//! Infrastructure layer: persistence backends for users, items and catalogs.

pub mod store;

pub use store::{
    CatalogStore, InMemoryCatalogStore, InMemoryInventoryStore, InMemoryUserStore, InventoryStore,
    PostgresCatalogStore, PostgresInventoryStore, PostgresUserStore, StoreError, StoreResult,
    UserStore,
};
