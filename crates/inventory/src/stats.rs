use serde::Serialize;

use crate::item::InventoryItem;

/// Dashboard summary over one owner's items. Recomputed on demand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_items: u64,
    /// Items with `available > 0`.
    pub in_stock: u64,
    /// Sum of `reserved` across items.
    pub reserved: u64,
    /// Items with exactly one unit available.
    pub low_stock: u64,
}

impl DashboardStats {
    pub fn from_items<'a>(items: impl IntoIterator<Item = &'a InventoryItem>) -> Self {
        items.into_iter().fold(Self::default(), |mut acc, item| {
            acc.total_items += 1;
            if item.available() > 0 {
                acc.in_stock += 1;
            }
            if item.available() == 1 {
                acc.low_stock += 1;
            }
            acc.reserved += u64::from(item.reserved());
            acc
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use stockroom_core::{ItemId, Owner};

    use super::*;
    use crate::{ItemFields, NewLayaway};

    fn item(available: i64) -> InventoryItem {
        let fields = ItemFields {
            item_number: Some("T-1".into()),
            description: Some("Table".into()),
            available: Some(available),
            vendor: Some("Global".into()),
            warehouse: Some("Small Warehouse".into()),
            notes: None,
        };
        InventoryItem::create(ItemId::new(), Owner::new("alice"), &fields, Utc::now()).unwrap()
    }

    #[test]
    fn empty_inventory_is_all_zero() {
        assert_eq!(DashboardStats::from_items(&[]), DashboardStats::default());
    }

    #[test]
    fn counts_stock_and_reservations() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let hold = NewLayaway::new("Dana", "555", None);
        let (reserved_twice, _) = item(4).add_layaway(&hold, today).unwrap();
        let (reserved_twice, _) = reserved_twice.add_layaway(&hold, today).unwrap();
        let (sold_out_held, _) = item(0).add_layaway(&hold, today).unwrap();

        let items = vec![reserved_twice, sold_out_held, item(1), item(9)];
        let stats = DashboardStats::from_items(&items);

        assert_eq!(
            stats,
            DashboardStats {
                total_items: 4,
                in_stock: 3,
                reserved: 3,
                low_stock: 1,
            }
        );
    }
}
