use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, ReservationId};

/// A customer hold against an item's stock.
///
/// Reservations count towards `reserved` but never reduce `available`.
/// They are created by add-layaway, removed by remove-layaway, and never
/// edited in between.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayawayReservation {
    pub id: ReservationId,
    pub customer_name: String,
    pub phone: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub notes: String,
}

/// Unvalidated request to place a reservation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLayaway {
    pub customer_name: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

impl NewLayaway {
    pub fn new(
        customer_name: impl Into<String>,
        phone: impl Into<String>,
        notes: Option<String>,
    ) -> Self {
        Self {
            customer_name: Some(customer_name.into()),
            phone: Some(phone.into()),
            notes,
        }
    }

    /// Customer name and phone must be non-empty after trimming.
    pub fn validate(&self) -> DomainResult<()> {
        self.required().map(|_| ())
    }

    /// Validate and stamp a reservation.
    pub(crate) fn to_reservation(
        &self,
        id: ReservationId,
        date: NaiveDate,
    ) -> DomainResult<LayawayReservation> {
        let (customer_name, phone) = self.required()?;
        Ok(LayawayReservation {
            id,
            customer_name,
            phone,
            date,
            notes: trimmed(&self.notes).unwrap_or_default(),
        })
    }

    fn required(&self) -> DomainResult<(String, String)> {
        match (trimmed(&self.customer_name), trimmed(&self.phone)) {
            (Some(customer_name), Some(phone)) => Ok((customer_name, phone)),
            _ => Err(DomainError::validation("Customer name and phone are required")),
        }
    }
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
    }

    #[test]
    fn trims_fields_and_defaults_notes() {
        let req = NewLayaway::new("  Dana Ortiz ", " 555-0101", None);
        let r = req.to_reservation(ReservationId::new(), today()).unwrap();
        assert_eq!(r.customer_name, "Dana Ortiz");
        assert_eq!(r.phone, "555-0101");
        assert_eq!(r.notes, "");
        assert_eq!(r.date, today());
    }

    #[test]
    fn blank_phone_is_rejected() {
        let req = NewLayaway::new("Dana", "   ", Some("call first".into()));
        let err = req.to_reservation(ReservationId::new(), today()).unwrap_err();
        assert_eq!(err, DomainError::validation("Customer name and phone are required"));
    }

    #[test]
    fn json_uses_camel_case_and_iso_dates() {
        let r = LayawayReservation {
            id: ReservationId::new(),
            customer_name: "Dana".into(),
            phone: "555".into(),
            date: today(),
            notes: String::new(),
        };
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["customerName"], "Dana");
        assert_eq!(v["date"], "2024-03-09");
    }
}
