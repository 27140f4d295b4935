use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{AggregateRoot, DomainError, DomainResult, ItemId, Owner, ReservationId};

use crate::layaway::{LayawayReservation, NewLayaway};
use crate::status::ItemStatus;

/// Upper bound for `available`.
pub const MAX_AVAILABLE: i64 = 999_999;

const REQUIRED_FIELDS: &str = "All required fields must be provided";
const AVAILABLE_RANGE: &str = "Available quantity must be between 0 and 999,999";

/// Unvalidated item fields as supplied by a caller (create and edit).
///
/// `available` is kept wide so out-of-range input reaches validation instead
/// of failing deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemFields {
    pub item_number: Option<String>,
    pub description: Option<String>,
    pub available: Option<i64>,
    pub vendor: Option<String>,
    pub warehouse: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug)]
struct ValidFields {
    item_number: String,
    description: String,
    available: u32,
    vendor: String,
    warehouse: String,
    notes: String,
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

impl ItemFields {
    fn validate(&self) -> DomainResult<ValidFields> {
        let (Some(item_number), Some(description), Some(available), Some(vendor), Some(warehouse)) = (
            trimmed(&self.item_number),
            trimmed(&self.description),
            self.available,
            trimmed(&self.vendor),
            trimmed(&self.warehouse),
        ) else {
            return Err(DomainError::validation(REQUIRED_FIELDS));
        };

        if !(0..=MAX_AVAILABLE).contains(&available) {
            return Err(DomainError::validation(AVAILABLE_RANGE));
        }

        Ok(ValidFields {
            item_number,
            description,
            // Range checked above.
            available: available as u32,
            vendor,
            warehouse,
            notes: trimmed(&self.notes).unwrap_or_default(),
        })
    }
}

/// Aggregate root: InventoryItem.
///
/// # Invariants
/// - `reserved` equals `layaways.len()`; both only change through
///   [`InventoryItem::add_layaway`] / [`InventoryItem::remove_layaway`].
/// - `status` is always `ItemStatus::derive(available, reserved)`.
/// - Operations are all-or-nothing: a rejected operation leaves `self` untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryItem {
    id: ItemId,
    owner: Owner,
    item_number: String,
    description: String,
    available: u32,
    vendor: String,
    warehouse: String,
    notes: String,
    reserved: u32,
    status: ItemStatus,
    layaways: Vec<LayawayReservation>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: u64,
}

/// Flat persisted form of an item, used by stores to rehydrate it.
///
/// Status is not part of the record; it is re-derived on load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRecord {
    pub id: ItemId,
    pub owner: Owner,
    pub item_number: String,
    pub description: String,
    pub available: u32,
    pub vendor: String,
    pub warehouse: String,
    pub notes: String,
    pub reserved: u32,
    pub layaways: Vec<LayawayReservation>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl InventoryItem {
    /// Create a new item. `reserved` starts at 0, so status is one of
    /// `Out of Stock`, `Low Stock` or `Available`.
    pub fn create(
        id: ItemId,
        owner: Owner,
        fields: &ItemFields,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let f = fields.validate()?;
        Ok(Self {
            id,
            owner,
            item_number: f.item_number,
            description: f.description,
            available: f.available,
            vendor: f.vendor,
            warehouse: f.warehouse,
            notes: f.notes,
            reserved: 0,
            status: ItemStatus::derive(f.available, 0),
            layaways: Vec::new(),
            created_at: now,
            updated_at: now,
            version: 0,
        })
    }

    /// Edit the item's fields. Reservations are carried over unchanged and
    /// status is recomputed against the existing `reserved`.
    pub fn update(&self, fields: &ItemFields) -> DomainResult<Self> {
        let f = fields.validate()?;
        Ok(Self {
            item_number: f.item_number,
            description: f.description,
            available: f.available,
            vendor: f.vendor,
            warehouse: f.warehouse,
            notes: f.notes,
            status: ItemStatus::derive(f.available, self.reserved),
            ..self.clone()
        })
    }

    /// Place a reservation with a freshly generated id.
    ///
    /// There is no upper bound on `reserved` relative to `available`.
    pub fn add_layaway(
        &self,
        request: &NewLayaway,
        today: NaiveDate,
    ) -> DomainResult<(Self, LayawayReservation)> {
        self.add_layaway_with_id(self.fresh_reservation_id(), request, today)
    }

    /// Place a reservation under a caller-chosen id (must be unused on this item).
    pub fn add_layaway_with_id(
        &self,
        id: ReservationId,
        request: &NewLayaway,
        today: NaiveDate,
    ) -> DomainResult<(Self, LayawayReservation)> {
        if self.layaway(id).is_some() {
            return Err(DomainError::conflict("Layaway reservation id already in use"));
        }
        let reservation = request.to_reservation(id, today)?;

        let mut next = self.clone();
        next.layaways.push(reservation.clone());
        next.reserved += 1;
        next.status = ItemStatus::derive(next.available, next.reserved);
        Ok((next, reservation))
    }

    /// Remove a reservation by id.
    pub fn remove_layaway(&self, id: ReservationId) -> DomainResult<Self> {
        let Some(pos) = self.layaways.iter().position(|l| l.id == id) else {
            return Err(DomainError::not_found("Layaway reservation not found"));
        };

        let mut next = self.clone();
        next.layaways.remove(pos);
        next.reserved = next.reserved.saturating_sub(1);
        next.status = ItemStatus::derive(next.available, next.reserved);
        Ok(next)
    }

    /// Stamp `updated_at`; called when the new state is persisted.
    pub fn touched(mut self, now: DateTime<Utc>) -> Self {
        self.updated_at = now;
        self
    }

    /// Set the stored revision (stores only).
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    pub fn from_record(record: ItemRecord) -> Self {
        Self {
            status: ItemStatus::derive(record.available, record.reserved),
            id: record.id,
            owner: record.owner,
            item_number: record.item_number,
            description: record.description,
            available: record.available,
            vendor: record.vendor,
            warehouse: record.warehouse,
            notes: record.notes,
            reserved: record.reserved,
            layaways: record.layaways,
            created_at: record.created_at,
            updated_at: record.updated_at,
            version: record.version,
        }
    }

    fn fresh_reservation_id(&self) -> ReservationId {
        loop {
            let id = ReservationId::new();
            if self.layaway(id).is_none() {
                return id;
            }
        }
    }

    pub fn id_typed(&self) -> ItemId {
        self.id
    }

    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    pub fn item_number(&self) -> &str {
        &self.item_number
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn available(&self) -> u32 {
        self.available
    }

    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    pub fn warehouse(&self) -> &str {
        &self.warehouse
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn reserved(&self) -> u32 {
        self.reserved
    }

    pub fn status(&self) -> ItemStatus {
        self.status
    }

    pub fn layaways(&self) -> &[LayawayReservation] {
        &self.layaways
    }

    pub fn layaway(&self, id: ReservationId) -> Option<&LayawayReservation> {
        self.layaways.iter().find(|l| l.id == id)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl AggregateRoot for InventoryItem {
    type Id = ItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}
