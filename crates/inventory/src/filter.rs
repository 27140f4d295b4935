use crate::item::InventoryItem;

/// Optional list filters for an owner's items.
///
/// `search` is a case-insensitive substring match over item number,
/// description, vendor and warehouse. `vendor` and `warehouse` match exactly.
/// Blank values are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFilter {
    search: Option<String>,
    vendor: Option<String>,
    warehouse: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl ItemFilter {
    pub fn new(search: Option<String>, vendor: Option<String>, warehouse: Option<String>) -> Self {
        Self {
            search: non_blank(search),
            vendor: non_blank(vendor),
            warehouse: non_blank(warehouse),
        }
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn vendor(&self) -> Option<&str> {
        self.vendor.as_deref()
    }

    pub fn warehouse(&self) -> Option<&str> {
        self.warehouse.as_deref()
    }

    pub fn matches(&self, item: &InventoryItem) -> bool {
        if let Some(v) = &self.vendor {
            if item.vendor() != v {
                return false;
            }
        }
        if let Some(w) = &self.warehouse {
            if item.warehouse() != w {
                return false;
            }
        }
        match &self.search {
            None => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                [item.item_number(), item.description(), item.vendor(), item.warehouse()]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use stockroom_core::{ItemId, Owner};

    use super::*;
    use crate::ItemFields;

    fn item(number: &str, description: &str, vendor: &str, warehouse: &str) -> InventoryItem {
        let fields = ItemFields {
            item_number: Some(number.into()),
            description: Some(description.into()),
            available: Some(3),
            vendor: Some(vendor.into()),
            warehouse: Some(warehouse.into()),
            notes: None,
        };
        InventoryItem::create(ItemId::new(), Owner::new("alice"), &fields, Utc::now()).unwrap()
    }

    #[test]
    fn blank_filter_matches_everything() {
        let filter = ItemFilter::new(Some(String::new()), None, Some(String::new()));
        assert_eq!(filter, ItemFilter::default());
        assert!(filter.matches(&item("A1", "Chair", "Ashley", "Big Warehouse")));
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let chair = item("A1", "Oak Chair", "Ashley", "Big Warehouse");
        assert!(ItemFilter::new(Some("oak".into()), None, None).matches(&chair));
        assert!(ItemFilter::new(Some("ASHL".into()), None, None).matches(&chair));
        assert!(ItemFilter::new(Some("big ware".into()), None, None).matches(&chair));
        assert!(!ItemFilter::new(Some("sofa".into()), None, None).matches(&chair));
    }

    #[test]
    fn vendor_and_warehouse_are_exact() {
        let chair = item("A1", "Oak Chair", "Ashley", "Big Warehouse");
        assert!(ItemFilter::new(None, Some("Ashley".into()), None).matches(&chair));
        assert!(!ItemFilter::new(None, Some("ashley".into()), None).matches(&chair));
        assert!(!ItemFilter::new(None, None, Some("Small Warehouse".into())).matches(&chair));
    }
}
