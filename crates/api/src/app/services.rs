//! Application services: use cases wired over the store traits.
//!
//! Handlers stay thin; every rule that touches more than one store (or the
//! password hasher / session tokens) lives here.

use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;

use stockroom_auth::{
    Argon2PasswordHasher, Credentials, Hs256SessionTokens, PasswordHasher, Principal, Registration,
    SessionTokens, User, authorize_user_deletion,
};
use stockroom_core::{
    AggregateRoot, CatalogEntryId, DomainError, ExpectedVersion, ItemId, Owner, ReservationId,
    UserId,
};
use stockroom_infra::store::{
    InMemoryCatalogStore, InMemoryInventoryStore, InMemoryUserStore, PostgresCatalogStore,
    PostgresInventoryStore, PostgresUserStore, migrate,
};
use stockroom_infra::{CatalogStore, InventoryStore, StoreError, UserStore};
use stockroom_inventory::{
    CatalogEntry, CatalogKind, CatalogListing, DashboardStats, InventoryItem, ItemFields,
    ItemFilter, LayawayReservation, NewLayaway, catalog::merge_with_defaults,
};

use crate::app::errors::{ServiceError, ServiceResult};
use crate::config::{ApiConfig, StorageBackend};

const ITEM_NOT_FOUND: &str = "Item not found";
const USER_NOT_FOUND: &str = "User not found";
const INVALID_CREDENTIALS: &str = "Invalid credentials";
const UNAUTHORIZED: &str = "Unauthorized";

pub struct AppServices {
    users: Arc<dyn UserStore>,
    items: Arc<dyn InventoryStore>,
    catalog: Arc<dyn CatalogStore>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<dyn SessionTokens>,
}

/// Result of a successful register/login.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub token: String,
}

/// Wire stores, hasher and token issuer from configuration.
pub async fn build_services(config: &ApiConfig) -> anyhow::Result<AppServices> {
    let hasher = Argon2PasswordHasher::tuned(
        config.password_cost.memory_kib,
        config.password_cost.iterations,
    )
    .context("invalid password hashing parameters")?;
    let tokens = Hs256SessionTokens::new(config.jwt_secret.as_bytes(), config.session_ttl);

    let services = match &config.storage {
        StorageBackend::InMemory => {
            tracing::info!("using in-memory stores");
            AppServices::new(
                Arc::new(InMemoryUserStore::new()),
                Arc::new(InMemoryInventoryStore::new()),
                Arc::new(InMemoryCatalogStore::new()),
                Arc::new(hasher),
                Arc::new(tokens),
            )
        }
        StorageBackend::Postgres { database_url } => {
            tracing::info!("using postgres stores");
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await
                .context("failed to connect to DATABASE_URL")?;
            migrate(&pool).await.context("failed to apply schema")?;

            AppServices::new(
                Arc::new(PostgresUserStore::new(pool.clone())),
                Arc::new(PostgresInventoryStore::new(pool.clone())),
                Arc::new(PostgresCatalogStore::new(pool)),
                Arc::new(hasher),
                Arc::new(tokens),
            )
        }
    };

    Ok(services)
}

impl AppServices {
    pub fn new(
        users: Arc<dyn UserStore>,
        items: Arc<dyn InventoryStore>,
        catalog: Arc<dyn CatalogStore>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<dyn SessionTokens>,
    ) -> Self {
        Self {
            users,
            items,
            catalog,
            hasher,
            tokens,
        }
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        self.tokens.ttl()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Accounts and sessions
    // ─────────────────────────────────────────────────────────────────────

    pub async fn register(
        &self,
        credentials: &Credentials,
        now: DateTime<Utc>,
    ) -> ServiceResult<Session> {
        let (username, password) = credentials.validate_registration()?;

        if self.users.find_by_username(username).await?.is_some() {
            return Err(username_taken());
        }

        let password_hash = self.hash_password(password).await?;
        let registration = Registration {
            id: UserId::new(),
            username: username.to_string(),
            password_hash,
            registered_at: now,
        };

        let user = self.users.register(registration).await.map_err(|e| match e {
            StoreError::Duplicate => username_taken(),
            other => other.into(),
        })?;
        tracing::info!(username = %user.username, is_admin = user.is_admin, "user registered");

        let token = self.tokens.issue(&user, now)?;
        Ok(Session { user, token })
    }

    pub async fn login(
        &self,
        credentials: &Credentials,
        now: DateTime<Utc>,
    ) -> ServiceResult<Session> {
        let (username, password) = credentials.require_present()?;

        let Some(user) = self.users.find_by_username(username).await? else {
            return Err(DomainError::unauthorized(INVALID_CREDENTIALS).into());
        };
        if !self.verify_password(password, &user.password_hash).await? {
            return Err(DomainError::unauthorized(INVALID_CREDENTIALS).into());
        }

        let token = self.tokens.issue(&user, now)?;
        Ok(Session { user, token })
    }

    /// Resolve a session token to the current state of its user.
    ///
    /// The user is re-read on every call, so deleted accounts lose access and
    /// admin changes apply without a new login.
    pub async fn authenticate(&self, token: &str, now: DateTime<Utc>) -> ServiceResult<User> {
        let claims = self.tokens.validate(token, now).map_err(|e| {
            tracing::debug!(error = %e, "rejected session token");
            DomainError::unauthorized(UNAUTHORIZED)
        })?;

        self.users
            .get(claims.sub)
            .await?
            .ok_or_else(|| ServiceError::from(DomainError::unauthorized(UNAUTHORIZED)))
    }

    async fn hash_password(&self, password: &str) -> ServiceResult<String> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_owned();
        let hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))??;
        Ok(hash)
    }

    async fn verify_password(&self, password: &str, hash: &str) -> ServiceResult<bool> {
        let hasher = Arc::clone(&self.hasher);
        let (password, hash) = (password.to_owned(), hash.to_owned());
        let ok = tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))??;
        Ok(ok)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Inventory
    // ─────────────────────────────────────────────────────────────────────

    pub async fn list_items(
        &self,
        principal: &Principal,
        filter: &ItemFilter,
    ) -> ServiceResult<Vec<InventoryItem>> {
        Ok(self.items.list(&principal.owner(), filter).await?)
    }

    pub async fn dashboard_stats(&self, principal: &Principal) -> ServiceResult<DashboardStats> {
        let items = self
            .items
            .list(&principal.owner(), &ItemFilter::default())
            .await?;
        Ok(DashboardStats::from_items(&items))
    }

    pub async fn create_item(
        &self,
        principal: &Principal,
        fields: &ItemFields,
        now: DateTime<Utc>,
    ) -> ServiceResult<InventoryItem> {
        let item = InventoryItem::create(ItemId::new(), principal.owner(), fields, now)?;
        let stored = self.items.insert(item).await?;
        tracing::info!(item_id = %stored.id_typed(), owner = %stored.owner(), "item created");
        Ok(stored)
    }

    pub async fn get_item(&self, principal: &Principal, id: ItemId) -> ServiceResult<InventoryItem> {
        self.owned_item(&principal.owner(), id).await
    }

    /// Edit an item's fields.
    ///
    /// `expected` is the version the client last saw, if it sent one. The
    /// write itself is always conditional on the version read here.
    pub async fn update_item(
        &self,
        principal: &Principal,
        id: ItemId,
        fields: &ItemFields,
        expected: ExpectedVersion,
        now: DateTime<Utc>,
    ) -> ServiceResult<InventoryItem> {
        let current = self.owned_item(&principal.owner(), id).await?;
        if !expected.matches(current.version()) {
            return Err(stale_item(expected, current.version()));
        }

        let next = current.update(fields)?.touched(now);
        self.write_item(next, current.version()).await
    }

    pub async fn delete_item(&self, principal: &Principal, id: ItemId) -> ServiceResult<()> {
        if !self.items.delete(&principal.owner(), id).await? {
            return Err(DomainError::not_found(ITEM_NOT_FOUND).into());
        }
        tracing::info!(item_id = %id, owner = %principal.username, "item deleted");
        Ok(())
    }

    pub async fn add_layaway(
        &self,
        principal: &Principal,
        id: ItemId,
        request: &NewLayaway,
        now: DateTime<Utc>,
    ) -> ServiceResult<(InventoryItem, LayawayReservation)> {
        // Bad input is reported before the item lookup.
        request.validate()?;
        let current = self.owned_item(&principal.owner(), id).await?;
        let (next, reservation) = current.add_layaway(request, now.date_naive())?;
        let stored = self.write_item(next.touched(now), current.version()).await?;
        Ok((stored, reservation))
    }

    pub async fn remove_layaway(
        &self,
        principal: &Principal,
        id: ItemId,
        reservation: ReservationId,
        now: DateTime<Utc>,
    ) -> ServiceResult<InventoryItem> {
        let current = self.owned_item(&principal.owner(), id).await?;
        let next = current.remove_layaway(reservation)?;
        self.write_item(next.touched(now), current.version()).await
    }

    async fn owned_item(&self, owner: &Owner, id: ItemId) -> ServiceResult<InventoryItem> {
        self.items
            .get(owner, id)
            .await?
            .ok_or_else(|| ServiceError::from(DomainError::not_found(ITEM_NOT_FOUND)))
    }

    /// Compare-and-swap against the version the caller read.
    async fn write_item(&self, item: InventoryItem, read_version: u64) -> ServiceResult<InventoryItem> {
        self.items
            .update(item, ExpectedVersion::Exact(read_version))
            .await
            .map_err(|e| match e {
                StoreError::NotFound => DomainError::not_found(ITEM_NOT_FOUND).into(),
                StoreError::VersionConflict { expected, actual } => stale_item(expected, actual),
                other => other.into(),
            })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Vendors and warehouses
    // ─────────────────────────────────────────────────────────────────────

    pub async fn list_catalog(
        &self,
        principal: &Principal,
        kind: CatalogKind,
    ) -> ServiceResult<Vec<CatalogListing>> {
        let custom = self.catalog.list(&principal.owner(), kind).await?;
        Ok(merge_with_defaults(kind, custom))
    }

    pub async fn create_catalog_entry(
        &self,
        principal: &Principal,
        kind: CatalogKind,
        name: Option<&str>,
    ) -> ServiceResult<CatalogEntry> {
        let owner = principal.owner();
        let existing = self.catalog.list(&owner, kind).await?;
        let entry = CatalogEntry::new(CatalogEntryId::new(), kind, owner, name, &existing)?;

        // A concurrent insert of the same name can still win the race.
        self.catalog.insert(entry).await.map_err(|e| match e {
            StoreError::Duplicate => {
                DomainError::conflict(format!("{} already exists", kind.label())).into()
            }
            other => ServiceError::from(other),
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Administration
    // ─────────────────────────────────────────────────────────────────────

    /// Every user with the number of items they own.
    pub async fn list_users_with_item_counts(&self) -> ServiceResult<Vec<(User, u64)>> {
        let users = self.users.list().await?;
        let mut out = Vec::with_capacity(users.len());
        for user in users {
            let count = self.items.count(&user.owner()).await?;
            out.push((user, count));
        }
        Ok(out)
    }

    /// Delete a non-admin user together with their items and catalog entries.
    pub async fn delete_user(&self, actor: &Principal, id: UserId) -> ServiceResult<()> {
        let target = self
            .users
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found(USER_NOT_FOUND))?;
        authorize_user_deletion(actor, &target).map_err(DomainError::from)?;

        let owner = target.owner();
        let items = self.items.delete_owned(&owner).await?;
        let entries = self.catalog.delete_owned(&owner).await?;
        self.users.delete(id).await?;

        tracing::info!(
            actor = %actor.username,
            username = %target.username,
            items,
            catalog_entries = entries,
            "user deleted"
        );
        Ok(())
    }

    pub async fn toggle_admin(&self, actor: &Principal, id: UserId) -> ServiceResult<User> {
        let updated = self
            .users
            .toggle_admin(id)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => DomainError::not_found(USER_NOT_FOUND).into(),
                other => ServiceError::from(other),
            })?;

        tracing::info!(
            actor = %actor.username,
            username = %updated.username,
            is_admin = updated.is_admin,
            "admin flag toggled"
        );
        Ok(updated)
    }
}

fn username_taken() -> ServiceError {
    DomainError::conflict("Username already exists").into()
}

fn stale_item(expected: ExpectedVersion, actual: u64) -> ServiceError {
    tracing::debug!(?expected, actual, "stale item version");
    DomainError::conflict("Item was modified by another request; reload and try again").into()
}
