//! In-process directory backend.
//!
//! `MemoryDirectory` keeps the whole dataset behind one `Arc<RwLock<_>>`.
//! Writers take the write lock for the full validate-then-apply step, so
//! every mutation is atomic; readers share the read lock. Cloning the handle
//! shares the same state.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::demo;
use crate::geo::{GeoMatch, GeoQuery};
use crate::membership::{
    assemble_organizations, resolve_activity_ids, tagged_with_any, OrganizationRecord,
    PhoneRecord, TagRecord,
};
use crate::model::{normalize_phone, Building, NewBuilding, NewOrganization, Organization, Phone};
use crate::search::{matches_name, normalize_query, validate_search_limit};
use crate::taxonomy::{Activity, ActivityTree, ActivityTreeNode, NodeUpdate};
use crate::{DirectoryError, Result};

#[derive(Debug, Clone, Default)]
struct State {
    activities: ActivityTree,
    buildings: BTreeMap<i64, Building>,
    organizations: BTreeMap<i64, OrganizationRecord>,
    phones: BTreeMap<i64, PhoneRecord>,
    /// `(organization_id, activity_id)`
    tags: BTreeSet<(i64, i64)>,
    next_building_id: i64,
    next_organization_id: i64,
    next_phone_id: i64,
}

impl State {
    fn next_id(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }

    fn require_organization(&self, id: i64) -> Result<()> {
        if self.organizations.contains_key(&id) {
            Ok(())
        } else {
            Err(not_found("organization", id))
        }
    }

    fn tags_of(&self, organization_id: i64) -> BTreeSet<i64> {
        self.tags
            .range((organization_id, i64::MIN)..=(organization_id, i64::MAX))
            .map(|&(_, activity_id)| activity_id)
            .collect()
    }

    fn insert_activity(&mut self, name: &str, parent_id: Option<i64>) -> Result<Activity> {
        let id = self.activities.insert(name, parent_id)?;
        self.activities
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("activity", id))
    }

    fn insert_building(&mut self, building: NewBuilding) -> Result<Building> {
        let building = building.validate()?;
        let id = Self::next_id(&mut self.next_building_id);
        let building = Building {
            id,
            address: building.address,
            latitude: building.latitude,
            longitude: building.longitude,
        };
        self.buildings.insert(id, building.clone());
        Ok(building)
    }

    /// Returns the new organization's id.
    fn create_organization(&mut self, org: NewOrganization) -> Result<i64> {
        let org = org.validate()?;
        if !self.buildings.contains_key(&org.building_id) {
            return Err(not_found("building", org.building_id));
        }
        if let Some(&missing) = org
            .activity_ids
            .iter()
            .find(|&&id| !self.activities.contains(id))
        {
            return Err(not_found("activity", missing));
        }

        let id = Self::next_id(&mut self.next_organization_id);
        self.organizations.insert(
            id,
            OrganizationRecord {
                id,
                name: org.name,
                building_id: org.building_id,
            },
        );
        for phone in org.phones {
            let phone_id = Self::next_id(&mut self.next_phone_id);
            self.phones.insert(
                phone_id,
                PhoneRecord {
                    organization_id: id,
                    id: phone_id,
                    phone,
                },
            );
        }
        for activity_id in org.activity_ids {
            self.tags.insert((id, activity_id));
        }
        Ok(id)
    }

    fn seed_demo_data(&mut self) -> Result<()> {
        let mut building_ids = Vec::with_capacity(demo::BUILDINGS.len());
        for b in &demo::BUILDINGS {
            building_ids.push(self.insert_building(b.to_new_building())?.id);
        }

        let mut activity_ids: BTreeMap<&str, i64> = BTreeMap::new();
        for a in &demo::ACTIVITIES {
            let parent = a.parent.and_then(|p| activity_ids.get(p).copied());
            let created = self.insert_activity(a.name, parent)?;
            activity_ids.insert(a.name, created.id);
        }

        for org in &demo::ORGANIZATIONS {
            let new = NewOrganization::new(org.name, building_ids[org.building])
                .with_phones(org.phones.iter().copied())
                .with_activities(org.activities.iter().filter_map(|n| activity_ids.get(n).copied()));
            self.create_organization(new)?;
        }
        Ok(())
    }

    fn organizations_tagged(&self, activity_ids: &BTreeSet<i64>) -> Result<Vec<Organization>> {
        self.assemble(
            self.organizations
                .values()
                .filter(|o| tagged_with_any(&self.tags_of(o.id), activity_ids)),
        )
    }

    fn assemble<'a>(
        &self,
        records: impl IntoIterator<Item = &'a OrganizationRecord>,
    ) -> Result<Vec<Organization>> {
        let records: Vec<OrganizationRecord> = records.into_iter().cloned().collect();
        let ids: BTreeSet<i64> = records.iter().map(|r| r.id).collect();

        let phones = self
            .phones
            .values()
            .filter(|p| ids.contains(&p.organization_id))
            .cloned()
            .collect();
        let tags = self
            .tags
            .iter()
            .filter(|(org, _)| ids.contains(org))
            .filter_map(|&(organization_id, activity_id)| {
                self.activities.get(activity_id).map(|a| TagRecord {
                    organization_id,
                    activity: a.clone(),
                })
            })
            .collect();

        assemble_organizations(records, &self.buildings, phones, tags)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    inner: Arc<RwLock<State>>,
}

impl MemoryDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A directory preloaded with the demo dataset.
    ///
    /// # Errors
    ///
    /// Propagates any validation failure from the seed rows.
    pub fn with_demo_data() -> Result<Self> {
        let dir = Self::new();
        dir.seed_demo_data()?;
        Ok(dir)
    }

    /// Load the demo dataset unless a building already exists.
    ///
    /// The check and every insert happen under one write lock against a
    /// scratch copy that replaces the live state only once all rows succeed.
    /// Returns `true` when rows were written.
    ///
    /// # Errors
    ///
    /// Propagates any validation failure from the seed rows; the directory
    /// is left untouched in that case.
    pub fn seed_demo_data(&self) -> Result<bool> {
        let mut state = self.inner.write();
        if !state.buildings.is_empty() {
            return Ok(false);
        }

        let mut scratch = state.clone();
        scratch.seed_demo_data()?;
        *state = scratch;
        Ok(true)
    }

    // Activities

    /// # Errors
    ///
    /// See [`ActivityTree::validate_insert`].
    pub fn insert_activity(&self, name: &str, parent_id: Option<i64>) -> Result<Activity> {
        self.inner.write().insert_activity(name, parent_id)
    }

    /// # Errors
    ///
    /// See [`ActivityTree::plan_move`].
    pub fn move_activity(&self, id: i64, new_parent_id: Option<i64>) -> Result<Vec<NodeUpdate>> {
        self.inner.write().activities.move_node(id, new_parent_id)
    }

    /// Delete an activity, promoting its children to roots and dropping its
    /// organization tags.
    ///
    /// # Errors
    ///
    /// See [`ActivityTree::plan_detach_children`].
    pub fn delete_activity(&self, id: i64) -> Result<Vec<NodeUpdate>> {
        let mut state = self.inner.write();
        let updates = state.activities.remove(id)?;
        state.tags.retain(|&(_, activity_id)| activity_id != id);
        Ok(updates)
    }

    #[must_use]
    pub fn list_activities(&self) -> Vec<Activity> {
        self.inner.read().activities.iter().cloned().collect()
    }

    #[must_use]
    pub fn get_activity(&self, id: i64) -> Option<Activity> {
        self.inner.read().activities.get(id).cloned()
    }

    #[must_use]
    pub fn activity_tree(&self) -> Vec<ActivityTreeNode> {
        self.inner.read().activities.materialize()
    }

    #[must_use]
    pub fn activity_subtree(&self, id: i64, include_self: bool) -> BTreeSet<i64> {
        self.inner.read().activities.subtree_ids(id, include_self)
    }

    // Buildings

    #[must_use]
    pub fn list_buildings(&self) -> Vec<Building> {
        self.inner.read().buildings.values().cloned().collect()
    }

    #[must_use]
    pub fn get_building(&self, id: i64) -> Option<Building> {
        self.inner.read().buildings.get(&id).cloned()
    }

    /// # Errors
    ///
    /// See [`NewBuilding::validate`].
    pub fn insert_building(&self, building: NewBuilding) -> Result<Building> {
        self.inner.write().insert_building(building)
    }

    /// # Errors
    ///
    /// `NotFound` for an unknown building, `ReferentialRestriction` while any
    /// organization still points at it.
    pub fn delete_building(&self, id: i64) -> Result<()> {
        let mut state = self.inner.write();
        if !state.buildings.contains_key(&id) {
            return Err(not_found("building", id));
        }
        let organizations = state
            .organizations
            .values()
            .filter(|o| o.building_id == id)
            .count();
        if organizations > 0 {
            return Err(DirectoryError::ReferentialRestriction {
                building_id: id,
                organizations: i64::try_from(organizations).unwrap_or(i64::MAX),
            });
        }
        state.buildings.remove(&id);
        Ok(())
    }

    /// # Errors
    ///
    /// `InvalidParameter` if the query fails validation.
    pub fn buildings_by_geo(&self, query: &GeoQuery) -> Result<Vec<GeoMatch<Building>>> {
        let state = self.inner.read();
        query.run(state.buildings.values().cloned())
    }

    // Organizations

    /// # Errors
    ///
    /// `InvalidParameter` from [`NewOrganization::validate`], `NotFound` for
    /// an unknown building or activity.
    pub fn create_organization(&self, org: NewOrganization) -> Result<Organization> {
        let mut state = self.inner.write();
        let id = state.create_organization(org)?;

        let record = &state.organizations[&id];
        let mut assembled = state.assemble([record])?;
        assembled.pop().ok_or_else(|| not_found("organization", id))
    }

    /// Delete an organization together with its phones and tags.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown organization.
    pub fn delete_organization(&self, id: i64) -> Result<()> {
        let mut state = self.inner.write();
        state.require_organization(id)?;
        state.organizations.remove(&id);
        state.phones.retain(|_, p| p.organization_id != id);
        state.tags.retain(|&(org, _)| org != id);
        Ok(())
    }

    /// # Errors
    ///
    /// `NotFound` for an unknown organization, `InvalidParameter` for a blank
    /// phone or one the organization already has.
    pub fn add_phone(&self, organization_id: i64, phone: &str) -> Result<Phone> {
        let phone = normalize_phone(phone)?;
        let mut state = self.inner.write();
        state.require_organization(organization_id)?;
        if state
            .phones
            .values()
            .any(|p| p.organization_id == organization_id && p.phone == phone)
        {
            return Err(duplicate_phone(organization_id, &phone));
        }
        let id = State::next_id(&mut state.next_phone_id);
        state.phones.insert(
            id,
            PhoneRecord {
                organization_id,
                id,
                phone: phone.clone(),
            },
        );
        Ok(Phone { id, phone })
    }

    /// # Errors
    ///
    /// `NotFound` unless `phone_id` belongs to `organization_id`.
    pub fn remove_phone(&self, organization_id: i64, phone_id: i64) -> Result<()> {
        let mut state = self.inner.write();
        match state.phones.get(&phone_id) {
            Some(p) if p.organization_id == organization_id => {
                state.phones.remove(&phone_id);
                Ok(())
            }
            _ => Err(not_found("phone", phone_id)),
        }
    }

    /// Tag an organization with an activity. Returns `false` if it already was.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown organization or activity.
    pub fn tag_organization(&self, organization_id: i64, activity_id: i64) -> Result<bool> {
        let mut state = self.inner.write();
        state.require_organization(organization_id)?;
        if !state.activities.contains(activity_id) {
            return Err(not_found("activity", activity_id));
        }
        Ok(state.tags.insert((organization_id, activity_id)))
    }

    /// Returns `false` if the tag was not present.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown organization.
    pub fn untag_organization(&self, organization_id: i64, activity_id: i64) -> Result<bool> {
        let mut state = self.inner.write();
        state.require_organization(organization_id)?;
        Ok(state.tags.remove(&(organization_id, activity_id)))
    }

    /// # Errors
    ///
    /// Only on internally inconsistent state (a dangling building reference).
    pub fn get_organization(&self, id: i64) -> Result<Option<Organization>> {
        let state = self.inner.read();
        let Some(record) = state.organizations.get(&id) else {
            return Ok(None);
        };
        Ok(state.assemble([record])?.pop())
    }

    /// # Errors
    ///
    /// Only on internally inconsistent state.
    pub fn organizations_in_building(&self, building_id: i64) -> Result<Vec<Organization>> {
        let state = self.inner.read();
        state.assemble(
            state
                .organizations
                .values()
                .filter(|o| o.building_id == building_id),
        )
    }

    /// Organizations tagged with at least one of `activity_ids`, ordered by id.
    ///
    /// # Errors
    ///
    /// Only on internally inconsistent state.
    pub fn organizations_tagged(&self, activity_ids: &BTreeSet<i64>) -> Result<Vec<Organization>> {
        self.inner.read().organizations_tagged(activity_ids)
    }

    /// Resolves the activity subtree and filters organizations against the
    /// same snapshot.
    ///
    /// # Errors
    ///
    /// Only on internally inconsistent state.
    pub fn organizations_by_activity(
        &self,
        activity_id: i64,
        include_descendants: bool,
    ) -> Result<Vec<Organization>> {
        let state = self.inner.read();
        let ids = resolve_activity_ids(&state.activities, activity_id, include_descendants);
        state.organizations_tagged(&ids)
    }

    /// Case-insensitive literal substring search, ordered by name then id.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` for a limit outside `1..=200`. A blank query is
    /// not an error and returns nothing.
    pub fn search_organizations(&self, query: &str, limit: usize) -> Result<Vec<Organization>> {
        let Some(query) = normalize_query(query) else {
            return Ok(Vec::new());
        };
        validate_search_limit(limit)?;

        let state = self.inner.read();
        let mut hits: Vec<&OrganizationRecord> = state
            .organizations
            .values()
            .filter(|o| matches_name(&o.name, query))
            .collect();
        hits.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        hits.truncate(limit);
        state.assemble(hits)
    }

    /// # Errors
    ///
    /// `InvalidParameter` if the query fails validation.
    pub fn organizations_by_geo(&self, query: &GeoQuery) -> Result<Vec<GeoMatch<Organization>>> {
        let rect = query.candidate_box()?;
        let state = self.inner.read();
        let candidates = state.assemble(state.organizations.values().filter(|o| {
            state
                .buildings
                .get(&o.building_id)
                .is_some_and(|b| rect.contains(b.latitude, b.longitude))
        }))?;
        query.run(candidates)
    }

    /// Audit the taxonomy invariants.
    ///
    /// # Errors
    ///
    /// See [`ActivityTree::check_invariants`].
    pub fn check_invariants(&self) -> Result<()> {
        self.inner.read().activities.check_invariants()
    }
}

fn not_found(entity: &'static str, id: i64) -> DirectoryError {
    DirectoryError::NotFound { entity, id }
}

fn duplicate_phone(organization_id: i64, phone: &str) -> DirectoryError {
    DirectoryError::InvalidParameter(format!(
        "organization {organization_id} already has phone {phone:?}"
    ))
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
