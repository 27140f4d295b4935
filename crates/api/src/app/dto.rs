use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_auth::User;
use stockroom_core::{AggregateRoot, CatalogEntryId, ItemId, UserId};
use stockroom_inventory::{
    CatalogEntry, CatalogListing, InventoryItem, ItemFields, ItemFilter, ItemStatus,
    LayawayReservation,
};

// -------------------------
// Request DTOs
// -------------------------

/// Body of `PUT /inventory/:id`.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateItemRequest {
    #[serde(flatten)]
    pub fields: ItemFields,
    /// Version the client last saw; a stale value is rejected with 409.
    pub version: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CatalogEntryRequest {
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InventoryQuery {
    pub search: Option<String>,
    pub vendor: Option<String>,
    pub warehouse: Option<String>,
}

impl From<InventoryQuery> for ItemFilter {
    fn from(q: InventoryQuery) -> Self {
        ItemFilter::new(q.search, q.vendor, q.warehouse)
    }
}

// -------------------------
// Response views
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemView {
    pub id: ItemId,
    pub item_number: String,
    pub description: String,
    pub available: u32,
    pub vendor: String,
    pub warehouse: String,
    pub reserved: u32,
    pub status: ItemStatus,
    pub notes: String,
    pub owner: String,
    pub layaways: Vec<LayawayReservation>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl From<&InventoryItem> for ItemView {
    fn from(item: &InventoryItem) -> Self {
        Self {
            id: item.id_typed(),
            item_number: item.item_number().to_string(),
            description: item.description().to_string(),
            available: item.available(),
            vendor: item.vendor().to_string(),
            warehouse: item.warehouse().to_string(),
            reserved: item.reserved(),
            status: item.status(),
            notes: item.notes().to_string(),
            owner: item.owner().to_string(),
            layaways: item.layaways().to_vec(),
            created_at: item.created_at(),
            updated_at: item.updated_at(),
            version: item.version(),
        }
    }
}

pub fn items_to_views(items: &[InventoryItem]) -> Vec<ItemView> {
    items.iter().map(ItemView::from).collect()
}

/// Public identity; never carries the password hash.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: UserId,
    pub username: String,
    pub is_admin: bool,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            is_admin: user.is_admin,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserView {
    pub id: UserId,
    pub username: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub item_count: u64,
}

impl AdminUserView {
    pub fn new(user: &User, item_count: u64) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            is_admin: user.is_admin,
            created_at: user.created_at,
            item_count,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<CatalogEntryId>,
    pub name: String,
    pub is_default: bool,
}

impl From<CatalogListing> for CatalogView {
    fn from(listing: CatalogListing) -> Self {
        Self {
            id: listing.id,
            name: listing.name,
            is_default: listing.is_default,
        }
    }
}

impl From<&CatalogEntry> for CatalogView {
    fn from(entry: &CatalogEntry) -> Self {
        Self {
            id: Some(entry.id),
            name: entry.name.clone(),
            is_default: false,
        }
    }
}
