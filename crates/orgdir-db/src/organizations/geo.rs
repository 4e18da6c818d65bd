use orgdir_core::{BoundingBox, GeoMatch, GeoQuery, Organization};
use sqlx::PgPool;

use super::read::load_aggregates;
use super::types::OrganizationRow;
use crate::DbError;

/// Organizations whose building matches a radius or box query.
///
/// Candidates are narrowed by a coordinate range on `buildings`; the exact
/// distance filter, ordering and limit are applied afterwards.
///
/// # Errors
///
/// Returns [`DbError::Directory`] with `InvalidParameter` for an invalid
/// query, [`DbError::Sqlx`] on query failure.
pub async fn organizations_by_geo(
    pool: &PgPool,
    query: &GeoQuery,
) -> Result<Vec<GeoMatch<Organization>>, DbError> {
    let rect = query.candidate_box()?;
    let rows = organizations_in_box(pool, &rect).await?;
    let candidates = load_aggregates(pool, rows).await?;
    Ok(query.run(candidates)?)
}

async fn organizations_in_box(
    pool: &PgPool,
    rect: &BoundingBox,
) -> Result<Vec<OrganizationRow>, sqlx::Error> {
    sqlx::query_as::<_, OrganizationRow>(
        "SELECT o.id, o.name, o.building_id FROM organizations o \
         JOIN buildings b ON b.id = o.building_id \
         WHERE b.latitude BETWEEN $1 AND $2 \
           AND b.longitude BETWEEN $3 AND $4 \
         ORDER BY o.id",
    )
    .bind(rect.min_lat)
    .bind(rect.max_lat)
    .bind(rect.min_lon)
    .bind(rect.max_lon)
    .fetch_all(pool)
    .await
}
