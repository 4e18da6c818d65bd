//! Loads the demo dataset into an empty database.

use std::collections::BTreeMap;

use orgdir_core::demo;
use orgdir_core::{ActivityTree, NewOrganization};
use sqlx::PgPool;

use crate::DbError;

/// Insert the demo buildings, taxonomy and organizations in one transaction
/// unless a building already exists.
///
/// Returns `true` when rows were written.
///
/// # Errors
///
/// Returns [`DbError`] if a seed row fails validation or a query fails; the
/// transaction is rolled back in that case.
pub async fn seed_demo_data(pool: &PgPool) -> Result<bool, DbError> {
    let mut tx = pool.begin().await?;
    sqlx::query("LOCK TABLE buildings, activities IN SHARE ROW EXCLUSIVE MODE")
        .execute(&mut *tx)
        .await?;

    let existing: i64 = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM buildings")
        .fetch_one(&mut *tx)
        .await?;
    if existing > 0 {
        tracing::info!(buildings = existing, "demo data skipped, directory not empty");
        return Ok(false);
    }

    let mut building_ids = Vec::with_capacity(demo::BUILDINGS.len());
    for b in &demo::BUILDINGS {
        let building = b.to_new_building().validate()?;
        let id: i64 = sqlx::query_scalar::<_, i64>(
            "INSERT INTO buildings (address, latitude, longitude) \
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&building.address)
        .bind(building.latitude)
        .bind(building.longitude)
        .fetch_one(&mut *tx)
        .await?;
        building_ids.push(id);
    }

    let mut tree = ActivityTree::new();
    let mut activity_ids: BTreeMap<&str, i64> = BTreeMap::new();
    for a in &demo::ACTIVITIES {
        let parent = a.parent.and_then(|p| activity_ids.get(p).copied());
        let node = tree.validate_insert(a.name, parent)?;
        let id: i64 = sqlx::query_scalar::<_, i64>(
            "INSERT INTO activities (name, parent_id, depth) \
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&node.name)
        .bind(node.parent_id)
        .bind(i16::from(node.depth))
        .fetch_one(&mut *tx)
        .await?;
        tree.attach(id, node);
        activity_ids.insert(a.name, id);
    }

    for org in &demo::ORGANIZATIONS {
        let new = NewOrganization::new(org.name, building_ids[org.building])
            .with_phones(org.phones.iter().copied())
            .with_activities(org.activities.iter().filter_map(|n| activity_ids.get(n).copied()))
            .validate()?;

        let id: i64 = sqlx::query_scalar::<_, i64>(
            "INSERT INTO organizations (name, building_id) VALUES ($1, $2) RETURNING id",
        )
        .bind(&new.name)
        .bind(new.building_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO organization_phones (organization_id, phone) \
             SELECT $1, * FROM UNNEST($2::text[])",
        )
        .bind(id)
        .bind(&new.phones)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO organization_activity (organization_id, activity_id) \
             SELECT $1, * FROM UNNEST($2::bigint[])",
        )
        .bind(id)
        .bind(&new.activity_ids)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    tracing::info!(
        buildings = building_ids.len(),
        activities = activity_ids.len(),
        organizations = demo::ORGANIZATIONS.len(),
        "demo data seeded"
    );
    Ok(true)
}
