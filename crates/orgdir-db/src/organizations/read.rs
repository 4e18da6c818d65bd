//! Read operations for organizations.
//!
//! Organization rows are fetched first; buildings, phones and tags are then
//! batch-loaded by id set and joined in memory.

use std::collections::{BTreeMap, BTreeSet};

use orgdir_core::membership::resolve_activity_ids;
use orgdir_core::search::{like_pattern, validate_search_limit};
use orgdir_core::{assemble_organizations, Organization};
use sqlx::{PgExecutor, PgPool};

use super::types::{OrganizationRow, PhoneRow, TagRow};
use crate::activities::load_activity_tree;
use crate::buildings::fetch_buildings_by_ids;
use crate::DbError;

/// Load buildings, phones and tags for `rows` and build the aggregates,
/// keeping the order of `rows`.
pub(super) async fn load_aggregates(
    pool: &PgPool,
    rows: Vec<OrganizationRow>,
) -> Result<Vec<Organization>, DbError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let org_ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let building_ids: Vec<i64> = rows
        .iter()
        .map(|r| r.building_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let buildings: BTreeMap<i64, _> = fetch_buildings_by_ids(pool, &building_ids)
        .await?
        .into_iter()
        .map(|b| (b.id, b))
        .collect();
    let phones = fetch_phones(pool, &org_ids).await?;
    let tags = fetch_tags(pool, &org_ids).await?;

    Ok(assemble_organizations(
        rows.into_iter().map(Into::into).collect(),
        &buildings,
        phones.into_iter().map(Into::into).collect(),
        tags.into_iter().map(Into::into).collect(),
    )?)
}

async fn fetch_phones<'e, E>(executor: E, org_ids: &[i64]) -> Result<Vec<PhoneRow>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, PhoneRow>(
        "SELECT id, organization_id, phone FROM organization_phones \
         WHERE organization_id = ANY($1::bigint[]) \
         ORDER BY id",
    )
    .bind(org_ids)
    .fetch_all(executor)
    .await
}

async fn fetch_tags<'e, E>(executor: E, org_ids: &[i64]) -> Result<Vec<TagRow>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, TagRow>(
        "SELECT oa.organization_id, a.id, a.name, a.parent_id, a.depth \
         FROM organization_activity oa \
         JOIN activities a ON a.id = oa.activity_id \
         WHERE oa.organization_id = ANY($1::bigint[]) \
         ORDER BY a.id",
    )
    .bind(org_ids)
    .fetch_all(executor)
    .await
}

/// The full aggregate for `id`, or `None` if no such organization exists.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails.
pub async fn get_organization(pool: &PgPool, id: i64) -> Result<Option<Organization>, DbError> {
    let row = sqlx::query_as::<_, OrganizationRow>(
        "SELECT id, name, building_id FROM organizations WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };
    Ok(load_aggregates(pool, vec![row]).await?.pop())
}

/// Organizations located in `building_id`, ordered by id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails.
pub async fn organizations_in_building(
    pool: &PgPool,
    building_id: i64,
) -> Result<Vec<Organization>, DbError> {
    let rows = sqlx::query_as::<_, OrganizationRow>(
        "SELECT id, name, building_id FROM organizations \
         WHERE building_id = $1 \
         ORDER BY id",
    )
    .bind(building_id)
    .fetch_all(pool)
    .await?;
    load_aggregates(pool, rows).await
}

/// Organizations tagged with at least one of `activity_ids`, distinct and
/// ordered by id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails.
pub async fn organizations_tagged(
    pool: &PgPool,
    activity_ids: &BTreeSet<i64>,
) -> Result<Vec<Organization>, DbError> {
    if activity_ids.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i64> = activity_ids.iter().copied().collect();

    let rows = sqlx::query_as::<_, OrganizationRow>(
        "SELECT o.id, o.name, o.building_id FROM organizations o \
         WHERE EXISTS ( \
             SELECT 1 FROM organization_activity oa \
             WHERE oa.organization_id = o.id \
               AND oa.activity_id = ANY($1::bigint[]) \
         ) \
         ORDER BY o.id",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;
    load_aggregates(pool, rows).await
}

/// Organizations tagged with `activity_id`, or with any activity in its
/// subtree when `include_descendants` is set.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails.
pub async fn organizations_by_activity(
    pool: &PgPool,
    activity_id: i64,
    include_descendants: bool,
) -> Result<Vec<Organization>, DbError> {
    let tree = load_activity_tree(pool).await?;
    let ids = resolve_activity_ids(&tree, activity_id, include_descendants);
    organizations_tagged(pool, &ids).await
}

/// Case-insensitive literal substring search on the name, ordered by name.
///
/// A blank query returns nothing.
///
/// # Errors
///
/// Returns [`DbError::Directory`] with `InvalidParameter` for a limit outside
/// `1..=200`, [`DbError::Sqlx`] if a query fails.
pub async fn search_organizations(
    pool: &PgPool,
    query: &str,
    limit: usize,
) -> Result<Vec<Organization>, DbError> {
    let Some(pattern) = like_pattern(query) else {
        return Ok(Vec::new());
    };
    validate_search_limit(limit)?;

    let rows = sqlx::query_as::<_, OrganizationRow>(
        "SELECT id, name, building_id FROM organizations \
         WHERE name ILIKE $1 ESCAPE '\\' \
         ORDER BY name, id \
         LIMIT $2",
    )
    .bind(&pattern)
    .bind(i64::try_from(limit).unwrap_or(i64::MAX))
    .fetch_all(pool)
    .await?;
    load_aggregates(pool, rows).await
}
