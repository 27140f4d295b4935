//! In-memory stores for tests and local development.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use stockroom_auth::{Registration, User};
use stockroom_core::{AggregateRoot, CatalogEntryId, ExpectedVersion, ItemId, Owner, UserId};
use stockroom_inventory::{CatalogEntry, CatalogKind, InventoryItem, ItemFilter};

use super::{
    CatalogStore, InventoryStore, OwnerTable, StoreError, StoreResult, UserStore,
};

fn poisoned<T>(_: PoisonError<T>) -> StoreError {
    StoreError::Backend("user table lock poisoned".to_string())
}

#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn register(&self, registration: Registration) -> StoreResult<User> {
        let mut users = self.users.write().map_err(poisoned)?;
        if users.contains_key(&registration.id)
            || users.values().any(|u| u.username == registration.username)
        {
            return Err(StoreError::Duplicate);
        }

        let user = registration.into_user(users.len() as u64);
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get(&self, id: UserId) -> StoreResult<Option<User>> {
        let users = self.users.read().map_err(poisoned)?;
        Ok(users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let users = self.users.read().map_err(poisoned)?;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn list(&self) -> StoreResult<Vec<User>> {
        let users = self.users.read().map_err(poisoned)?;
        let mut out: Vec<User> = users.values().cloned().collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(out)
    }

    async fn toggle_admin(&self, id: UserId) -> StoreResult<User> {
        let mut users = self.users.write().map_err(poisoned)?;
        let user = users.get_mut(&id).ok_or(StoreError::NotFound)?;
        *user = user.toggled_admin();
        Ok(user.clone())
    }

    async fn delete(&self, id: UserId) -> StoreResult<bool> {
        let mut users = self.users.write().map_err(poisoned)?;
        Ok(users.remove(&id).is_some())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryInventoryStore {
    items: OwnerTable<ItemId, InventoryItem>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn insert(&self, item: InventoryItem) -> StoreResult<InventoryItem> {
        let owner = item.owner().clone();
        let id = item.id_typed();
        self.items
            .insert_unique(&owner, id, item.with_version(1), |_| false)
    }

    async fn get(&self, owner: &Owner, id: ItemId) -> StoreResult<Option<InventoryItem>> {
        self.items.get(owner, &id)
    }

    async fn list(&self, owner: &Owner, filter: &ItemFilter) -> StoreResult<Vec<InventoryItem>> {
        let mut items: Vec<InventoryItem> = self
            .items
            .list(owner)?
            .into_iter()
            .filter(|item| filter.matches(item))
            .collect();
        // v7 ids break ties between items created within the same instant.
        items.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then(b.id_typed().cmp(&a.id_typed()))
        });
        Ok(items)
    }

    async fn update(
        &self,
        item: InventoryItem,
        expected: ExpectedVersion,
    ) -> StoreResult<InventoryItem> {
        let owner = item.owner().clone();
        let id = item.id_typed();
        self.items.replace_with(&owner, &id, |stored| {
            let actual = stored.version();
            if !expected.matches(actual) {
                return Err(StoreError::VersionConflict { expected, actual });
            }
            Ok(item.with_version(actual + 1))
        })
    }

    async fn delete(&self, owner: &Owner, id: ItemId) -> StoreResult<bool> {
        self.items.remove(owner, &id)
    }

    async fn count(&self, owner: &Owner) -> StoreResult<u64> {
        self.items.count(owner)
    }

    async fn delete_owned(&self, owner: &Owner) -> StoreResult<u64> {
        self.items.clear_owner(owner)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    entries: OwnerTable<CatalogEntryId, CatalogEntry>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn list(&self, owner: &Owner, kind: CatalogKind) -> StoreResult<Vec<CatalogEntry>> {
        let mut entries: Vec<CatalogEntry> = self
            .entries
            .list(owner)?
            .into_iter()
            .filter(|e| e.kind == kind)
            .collect();
        entries.sort_by_key(|e| e.id);
        Ok(entries)
    }

    async fn insert(&self, entry: CatalogEntry) -> StoreResult<CatalogEntry> {
        let owner = entry.owner.clone();
        let (kind, name) = (entry.kind, entry.name.clone());
        self.entries.insert_unique(&owner, entry.id, entry, |existing| {
            existing.kind == kind && existing.name == name
        })
    }

    async fn delete_owned(&self, owner: &Owner) -> StoreResult<u64> {
        self.entries.clear_owner(owner)
    }
}
