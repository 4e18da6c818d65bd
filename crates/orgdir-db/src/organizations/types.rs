//! Row types for `organizations`, `organization_phones` and
//! `organization_activity`.

use orgdir_core::membership::{OrganizationRecord, PhoneRecord, TagRecord};
use orgdir_core::Activity;

use crate::activities::ActivityRow;

/// A row from the `organizations` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrganizationRow {
    pub id: i64,
    pub name: String,
    pub building_id: i64,
}

impl From<OrganizationRow> for OrganizationRecord {
    fn from(row: OrganizationRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            building_id: row.building_id,
        }
    }
}

/// A row from the `organization_phones` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PhoneRow {
    pub id: i64,
    pub organization_id: i64,
    pub phone: String,
}

impl From<PhoneRow> for PhoneRecord {
    fn from(row: PhoneRow) -> Self {
        Self {
            organization_id: row.organization_id,
            id: row.id,
            phone: row.phone,
        }
    }
}

/// An `organization_activity` link joined with its activity.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TagRow {
    pub organization_id: i64,
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    pub depth: i16,
}

impl From<TagRow> for TagRecord {
    fn from(row: TagRow) -> Self {
        Self {
            organization_id: row.organization_id,
            activity: Activity::from(ActivityRow {
                id: row.id,
                name: row.name,
                parent_id: row.parent_id,
                depth: row.depth,
            }),
        }
    }
}
