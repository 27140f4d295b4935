//! Vendor and warehouse catalogs.
//!
//! A catalog is a fixed built-in list unioned, at read time, with the
//! owner's custom entries. Defaults are never persisted.

use serde::{Deserialize, Serialize};

use stockroom_core::{CatalogEntryId, DomainError, DomainResult, Owner};

pub const DEFAULT_VENDORS: [&str; 4] = ["Ashley", "Nationwide", "Coaster", "Global"];
pub const DEFAULT_WAREHOUSES: [&str; 2] = ["Small Warehouse", "Big Warehouse"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogKind {
    Vendor,
    Warehouse,
}

impl CatalogKind {
    pub fn defaults(self) -> &'static [&'static str] {
        match self {
            CatalogKind::Vendor => &DEFAULT_VENDORS,
            CatalogKind::Warehouse => &DEFAULT_WAREHOUSES,
        }
    }

    /// Storage discriminator.
    pub fn as_str(self) -> &'static str {
        match self {
            CatalogKind::Vendor => "vendor",
            CatalogKind::Warehouse => "warehouse",
        }
    }

    /// Capitalised name used in messages ("Vendor", "Warehouse").
    pub fn label(self) -> &'static str {
        match self {
            CatalogKind::Vendor => "Vendor",
            CatalogKind::Warehouse => "Warehouse",
        }
    }

    pub fn is_default(self, name: &str) -> bool {
        self.defaults().contains(&name)
    }
}

/// A custom vendor or warehouse owned by one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: CatalogEntryId,
    pub kind: CatalogKind,
    pub name: String,
    pub owner: Owner,
}

impl CatalogEntry {
    /// Validate a new custom entry against the defaults and the owner's
    /// existing entries of the same kind.
    pub fn new(
        id: CatalogEntryId,
        kind: CatalogKind,
        owner: Owner,
        name: Option<&str>,
        existing: &[CatalogEntry],
    ) -> DomainResult<Self> {
        let label = kind.label();
        let name = name.map(str::trim).unwrap_or_default();
        if name.is_empty() {
            return Err(DomainError::validation(format!("{label} name is required")));
        }

        if kind.is_default(name) {
            return Err(DomainError::conflict(format!(
                "This {} already exists as a default option",
                kind.as_str()
            )));
        }

        if existing
            .iter()
            .any(|e| e.kind == kind && e.owner == owner && e.name == name)
        {
            return Err(DomainError::conflict(format!("{label} already exists")));
        }

        Ok(Self {
            id,
            kind,
            name: name.to_string(),
            owner,
        })
    }
}

/// One row of a merged catalog listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogListing {
    pub id: Option<CatalogEntryId>,
    pub name: String,
    pub is_default: bool,
}

/// Defaults first (in their fixed order), then custom entries.
pub fn merge_with_defaults(kind: CatalogKind, custom: Vec<CatalogEntry>) -> Vec<CatalogListing> {
    kind.defaults()
        .iter()
        .map(|name| CatalogListing {
            id: None,
            name: (*name).to_string(),
            is_default: true,
        })
        .chain(custom.into_iter().filter(|e| e.kind == kind).map(|e| CatalogListing {
            id: Some(e.id),
            name: e.name,
            is_default: false,
        }))
        .collect()
}
