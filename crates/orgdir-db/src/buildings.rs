//! Database operations for the `buildings` table.

use orgdir_core::{Building, BoundingBox, DirectoryError, GeoMatch, GeoQuery, NewBuilding};
use sqlx::{PgExecutor, PgPool};

use crate::{is_foreign_key_violation, DbError};

/// A row from the `buildings` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BuildingRow {
    pub id: i64,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl From<BuildingRow> for Building {
    fn from(row: BuildingRow) -> Self {
        Self {
            id: row.id,
            address: row.address,
            latitude: row.latitude,
            longitude: row.longitude,
        }
    }
}

/// All buildings ordered by id.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn list_buildings(pool: &PgPool) -> Result<Vec<Building>, sqlx::Error> {
    let rows = sqlx::query_as::<_, BuildingRow>(
        "SELECT id, address, latitude, longitude FROM buildings ORDER BY id",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Building::from).collect())
}

/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn get_building(pool: &PgPool, id: i64) -> Result<Option<Building>, sqlx::Error> {
    let row = sqlx::query_as::<_, BuildingRow>(
        "SELECT id, address, latitude, longitude FROM buildings WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(Building::from))
}

/// Buildings whose id is in `ids`, ordered by id.
pub(crate) async fn fetch_buildings_by_ids<'e, E>(
    executor: E,
    ids: &[i64],
) -> Result<Vec<Building>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query_as::<_, BuildingRow>(
        "SELECT id, address, latitude, longitude FROM buildings \
         WHERE id = ANY($1::bigint[]) ORDER BY id",
    )
    .bind(ids)
    .fetch_all(executor)
    .await?;
    Ok(rows.into_iter().map(Building::from).collect())
}

/// # Errors
///
/// Returns [`DbError::Directory`] with `InvalidParameter` for a blank address
/// or out-of-range coordinates, [`DbError::Sqlx`] on query failure.
pub async fn insert_building(pool: &PgPool, building: NewBuilding) -> Result<Building, DbError> {
    let building = building.validate()?;
    let row = sqlx::query_as::<_, BuildingRow>(
        "INSERT INTO buildings (address, latitude, longitude) \
         VALUES ($1, $2, $3) \
         RETURNING id, address, latitude, longitude",
    )
    .bind(&building.address)
    .bind(building.latitude)
    .bind(building.longitude)
    .fetch_one(pool)
    .await?;

    tracing::info!(building_id = row.id, "building inserted");
    Ok(row.into())
}

/// Delete a building nobody references.
///
/// # Errors
///
/// Returns [`DbError::Directory`] with `NotFound` for an unknown id or
/// `ReferentialRestriction` while organizations still reference it.
pub async fn delete_building(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    let exists: Option<i64> =
        sqlx::query_scalar::<_, i64>("SELECT id FROM buildings WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
    if exists.is_none() {
        return Err(DirectoryError::NotFound {
            entity: "building",
            id,
        }
        .into());
    }

    let organizations: i64 =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM organizations WHERE building_id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
    if organizations > 0 {
        return Err(restricted(id, organizations));
    }

    // An organization inserted after the count still trips ON DELETE RESTRICT.
    let result = sqlx::query("DELETE FROM buildings WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await;
    match result {
        Ok(_) => {}
        Err(e) if is_foreign_key_violation(&e) => return Err(restricted(id, 1)),
        Err(e) => return Err(e.into()),
    }
    tx.commit().await?;

    tracing::info!(building_id = id, "building deleted");
    Ok(())
}

/// Buildings matching a radius or box query.
///
/// # Errors
///
/// Returns [`DbError::Directory`] with `InvalidParameter` for an invalid
/// query, [`DbError::Sqlx`] on query failure.
pub async fn buildings_by_geo(
    pool: &PgPool,
    query: &GeoQuery,
) -> Result<Vec<GeoMatch<Building>>, DbError> {
    let rect = query.candidate_box()?;
    let candidates = buildings_in_box(pool, &rect).await?;
    Ok(query.run(candidates)?)
}

async fn buildings_in_box(pool: &PgPool, rect: &BoundingBox) -> Result<Vec<Building>, sqlx::Error> {
    let rows = sqlx::query_as::<_, BuildingRow>(
        "SELECT id, address, latitude, longitude FROM buildings \
         WHERE latitude BETWEEN $1 AND $2 \
           AND longitude BETWEEN $3 AND $4 \
         ORDER BY id",
    )
    .bind(rect.min_lat)
    .bind(rect.max_lat)
    .bind(rect.min_lon)
    .bind(rect.max_lon)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Building::from).collect())
}

fn restricted(building_id: i64, organizations: i64) -> DbError {
    DirectoryError::ReferentialRestriction {
        building_id,
        organizations,
    }
    .into()
}
