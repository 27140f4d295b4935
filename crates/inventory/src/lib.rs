//! Inventory domain module.
//!
//! This crate contains business rules for inventory items, layaway
//! reservations and the vendor/warehouse catalogs, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod catalog;
pub mod filter;
pub mod item;
pub mod layaway;
pub mod stats;
pub mod status;

pub use catalog::{CatalogEntry, CatalogKind, CatalogListing, DEFAULT_VENDORS, DEFAULT_WAREHOUSES};
pub use filter::ItemFilter;
pub use item::{InventoryItem, ItemFields, ItemRecord, MAX_AVAILABLE};
pub use layaway::{LayawayReservation, NewLayaway};
pub use stats::DashboardStats;
pub use status::ItemStatus;
