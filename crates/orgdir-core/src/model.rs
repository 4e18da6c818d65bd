use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::invalid;
use crate::geo::{validate_coordinates, Located};
use crate::taxonomy::Activity;
use crate::Result;

pub const MAX_ADDRESS_LEN: usize = 512;
pub const MAX_ORGANIZATION_NAME_LEN: usize = 256;
pub const MAX_PHONE_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub id: i64,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Located for Building {
    fn id(&self) -> i64 {
        self.id
    }

    fn latitude(&self) -> f64 {
        self.latitude
    }

    fn longitude(&self) -> f64 {
        self.longitude
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewBuilding {
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl NewBuilding {
    #[must_use]
    pub fn new(address: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            address: address.into(),
            latitude,
            longitude,
        }
    }

    /// Trim the address and check the coordinate ranges.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for a blank or oversized address, or a
    /// coordinate outside `[-90, 90]` / `[-180, 180]`.
    pub fn validate(self) -> Result<Self> {
        let address = required_text("address", &self.address, MAX_ADDRESS_LEN)?;
        validate_coordinates(self.latitude, self.longitude)?;
        Ok(Self {
            address,
            latitude: self.latitude,
            longitude: self.longitude,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phone {
    pub id: i64,
    pub phone: String,
}

/// An organization with its building, phones, and activity tags loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Organization {
    pub id: i64,
    pub name: String,
    pub building: Building,
    pub phones: Vec<Phone>,
    pub activities: Vec<Activity>,
}

impl Organization {
    #[must_use]
    pub fn activity_ids(&self) -> BTreeSet<i64> {
        self.activities.iter().map(|a| a.id).collect()
    }
}

impl Located for Organization {
    fn id(&self) -> i64 {
        self.id
    }

    fn latitude(&self) -> f64 {
        self.building.latitude
    }

    fn longitude(&self) -> f64 {
        self.building.longitude
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrganization {
    pub name: String,
    pub building_id: i64,
    pub phones: Vec<String>,
    pub activity_ids: Vec<i64>,
}

impl NewOrganization {
    #[must_use]
    pub fn new(name: impl Into<String>, building_id: i64) -> Self {
        Self {
            name: name.into(),
            building_id,
            phones: Vec::new(),
            activity_ids: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_phones<I, S>(mut self, phones: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.phones = phones.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_activities(mut self, activity_ids: impl IntoIterator<Item = i64>) -> Self {
        self.activity_ids = activity_ids.into_iter().collect();
        self
    }

    /// Trim the name and phones, drop duplicate phones and activity ids.
    ///
    /// Phone order is kept (first occurrence wins); activity ids come back
    /// sorted. Whether the building and activities exist is the backend's
    /// concern.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for a blank or oversized name or phone.
    pub fn validate(self) -> Result<Self> {
        let name = required_text("organization name", &self.name, MAX_ORGANIZATION_NAME_LEN)?;

        let mut seen = BTreeSet::new();
        let mut phones = Vec::with_capacity(self.phones.len());
        for raw in &self.phones {
            let phone = normalize_phone(raw)?;
            if seen.insert(phone.clone()) {
                phones.push(phone);
            }
        }

        let activity_ids: BTreeSet<i64> = self.activity_ids.into_iter().collect();

        Ok(Self {
            name,
            building_id: self.building_id,
            phones,
            activity_ids: activity_ids.into_iter().collect(),
        })
    }
}

/// Trimmed phone number.
///
/// # Errors
///
/// Returns `InvalidParameter` for a blank phone or one longer than
/// [`MAX_PHONE_LEN`] characters.
pub fn normalize_phone(raw: &str) -> Result<String> {
    required_text("phone", raw, MAX_PHONE_LEN)
}

fn required_text(field: &str, raw: &str, max_len: usize) -> Result<String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(invalid(format!("{field} must not be empty")));
    }
    if value.chars().count() > max_len {
        return Err(invalid(format!(
            "{field} must be at most {max_len} characters"
        )));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn new_building_trims_address() {
        let b = NewBuilding::new("  г. Казань, ул. Баумана 5 ", 55.7963, 49.1088)
            .validate()
            .unwrap();
        assert_eq!(b.address, "г. Казань, ул. Баумана 5");
    }

    #[test]
    fn new_building_rejects_out_of_range_coordinates() {
        for (lat, lon) in [(90.5, 0.0), (-91.0, 0.0), (0.0, 180.1), (0.0, f64::NAN)] {
            let err = NewBuilding::new("x", lat, lon).validate().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidParameter, "{lat},{lon}");
        }
        assert!(NewBuilding::new("pole", 90.0, -180.0).validate().is_ok());
    }

    #[test]
    fn new_building_rejects_blank_address() {
        assert!(NewBuilding::new("   ", 0.0, 0.0).validate().is_err());
    }

    #[test]
    fn new_organization_dedupes_phones_and_activities() {
        let org = NewOrganization::new(" Кафе \"У дома\" ", 1)
            .with_phones([" 8-495-777-77-77", "8-495-777-77-77 ", "2-222-222"])
            .with_activities([3, 1, 3])
            .validate()
            .unwrap();
        assert_eq!(org.name, "Кафе \"У дома\"");
        assert_eq!(org.phones, vec!["8-495-777-77-77", "2-222-222"]);
        assert_eq!(org.activity_ids, vec![1, 3]);
    }

    #[test]
    fn new_organization_rejects_blank_phone() {
        let err = NewOrganization::new("Acme", 1)
            .with_phones(["  "])
            .validate()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn organization_is_located_at_its_building() {
        let org = Organization {
            id: 7,
            name: "Acme".to_string(),
            building: Building {
                id: 1,
                address: "a".to_string(),
                latitude: 10.0,
                longitude: 20.0,
            },
            phones: Vec::new(),
            activities: Vec::new(),
        };
        assert_eq!(Located::id(&org), 7);
        assert_eq!(org.latitude(), 10.0);
        assert_eq!(org.longitude(), 20.0);
    }
}
