//! Organization to activity linkage and aggregate assembly.
//!
//! Backends fetch organizations first, then batch-fetch their buildings,
//! phones and tags by id set; [`assemble_organizations`] stitches the pieces
//! back into [`Organization`] aggregates.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{Building, Organization, Phone};
use crate::taxonomy::{Activity, ActivityTree};
use crate::{DirectoryError, Result};

/// Activity ids an activity query should match.
///
/// With `include_descendants` this is the activity's whole subtree (empty for
/// an unknown id); otherwise just the activity itself.
#[must_use]
pub fn resolve_activity_ids(
    tree: &ActivityTree,
    activity_id: i64,
    include_descendants: bool,
) -> BTreeSet<i64> {
    if include_descendants {
        tree.subtree_ids(activity_id, true)
    } else {
        BTreeSet::from([activity_id])
    }
}

/// True if any of `tags` is in `node_ids`.
#[must_use]
pub fn tagged_with_any(tags: &BTreeSet<i64>, node_ids: &BTreeSet<i64>) -> bool {
    !tags.is_disjoint(node_ids)
}

/// Organization row without its associations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationRecord {
    pub id: i64,
    pub name: String,
    pub building_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneRecord {
    pub organization_id: i64,
    pub id: i64,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRecord {
    pub organization_id: i64,
    pub activity: Activity,
}

/// Join organization rows with their batch-loaded associations.
///
/// Output order follows `records`. Phones and activities are ordered by id.
///
/// # Errors
///
/// Returns `NotFound` if a record references a building missing from
/// `buildings`.
pub fn assemble_organizations(
    records: Vec<OrganizationRecord>,
    buildings: &BTreeMap<i64, Building>,
    phones: Vec<PhoneRecord>,
    tags: Vec<TagRecord>,
) -> Result<Vec<Organization>> {
    let mut phones_by_org: BTreeMap<i64, Vec<Phone>> = BTreeMap::new();
    for p in phones {
        phones_by_org.entry(p.organization_id).or_default().push(Phone {
            id: p.id,
            phone: p.phone,
        });
    }

    let mut tags_by_org: BTreeMap<i64, Vec<Activity>> = BTreeMap::new();
    for t in tags {
        tags_by_org
            .entry(t.organization_id)
            .or_default()
            .push(t.activity);
    }

    records
        .into_iter()
        .map(|record| {
            let building = buildings
                .get(&record.building_id)
                .cloned()
                .ok_or(DirectoryError::NotFound {
                    entity: "building",
                    id: record.building_id,
                })?;

            let mut phones = phones_by_org.remove(&record.id).unwrap_or_default();
            phones.sort_by_key(|p| p.id);
            let mut activities = tags_by_org.remove(&record.id).unwrap_or_default();
            activities.sort_by_key(|a| a.id);
            activities.dedup_by_key(|a| a.id);

            Ok(Organization {
                id: record.id,
                name: record.name,
                building,
                phones,
                activities,
            })
        })
        .collect()
}
