use serde::{Deserialize, Serialize};

/// Display label summarizing an item's availability.
///
/// Always derived from `(available, reserved)`; never stored on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemStatus {
    #[serde(rename = "Available")]
    Available,
    #[serde(rename = "Low Stock")]
    LowStock,
    #[serde(rename = "Out of Stock")]
    OutOfStock,
    #[serde(rename = "Partially Reserved")]
    PartiallyReserved,
}

impl ItemStatus {
    /// Derive the status. First match wins:
    /// `available == 0`, then `available == 1`, then `reserved > 0`.
    pub fn derive(available: u32, reserved: u32) -> Self {
        match (available, reserved) {
            (0, _) => ItemStatus::OutOfStock,
            (1, _) => ItemStatus::LowStock,
            (_, r) if r > 0 => ItemStatus::PartiallyReserved,
            _ => ItemStatus::Available,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Available => "Available",
            ItemStatus::LowStock => "Low Stock",
            ItemStatus::OutOfStock => "Out of Stock",
            ItemStatus::PartiallyReserved => "Partially Reserved",
        }
    }
}

impl core::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
