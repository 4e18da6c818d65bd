//! Write operations for organizations, phones and activity tags.

use orgdir_core::model::normalize_phone;
use orgdir_core::{DirectoryError, NewOrganization, Organization, Phone};
use sqlx::{PgPool, Postgres, Transaction};

use super::read::load_aggregates;
use super::types::{OrganizationRow, PhoneRow};
use crate::{is_unique_violation, DbError};

/// Create an organization with its phones and activity tags in one
/// transaction.
///
/// # Errors
///
/// Returns [`DbError::Directory`] with `InvalidParameter` for a blank name or
/// phone, or `NotFound` for an unknown building or activity.
pub async fn create_organization(
    pool: &PgPool,
    org: NewOrganization,
) -> Result<Organization, DbError> {
    let org = org.validate()?;
    let mut tx = pool.begin().await?;

    // FOR KEY SHARE keeps the building and activities alive until commit.
    let building: Option<i64> =
        sqlx::query_scalar::<_, i64>("SELECT id FROM buildings WHERE id = $1 FOR KEY SHARE")
            .bind(org.building_id)
            .fetch_optional(&mut *tx)
            .await?;
    if building.is_none() {
        return Err(not_found("building", org.building_id));
    }

    if !org.activity_ids.is_empty() {
        let found: Vec<i64> = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM activities WHERE id = ANY($1::bigint[]) ORDER BY id FOR KEY SHARE",
        )
        .bind(&org.activity_ids)
        .fetch_all(&mut *tx)
        .await?;
        if let Some(&missing) = org.activity_ids.iter().find(|id| !found.contains(id)) {
            return Err(not_found("activity", missing));
        }
    }

    let row = sqlx::query_as::<_, OrganizationRow>(
        "INSERT INTO organizations (name, building_id) \
         VALUES ($1, $2) \
         RETURNING id, name, building_id",
    )
    .bind(&org.name)
    .bind(org.building_id)
    .fetch_one(&mut *tx)
    .await?;

    insert_phones(&mut tx, row.id, &org.phones).await?;
    insert_tags(&mut tx, row.id, &org.activity_ids).await?;
    tx.commit().await?;

    tracing::info!(
        organization_id = row.id,
        building_id = row.building_id,
        phones = org.phones.len(),
        activities = org.activity_ids.len(),
        "organization created"
    );

    let id = row.id;
    load_aggregates(pool, vec![row])
        .await?
        .pop()
        .ok_or_else(|| not_found("organization", id))
}

async fn insert_phones(
    tx: &mut Transaction<'static, Postgres>,
    organization_id: i64,
    phones: &[String],
) -> Result<(), sqlx::Error> {
    if phones.is_empty() {
        return Ok(());
    }
    sqlx::query(
        "INSERT INTO organization_phones (organization_id, phone) \
         SELECT $1, * FROM UNNEST($2::text[])",
    )
    .bind(organization_id)
    .bind(phones)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn insert_tags(
    tx: &mut Transaction<'static, Postgres>,
    organization_id: i64,
    activity_ids: &[i64],
) -> Result<(), sqlx::Error> {
    if activity_ids.is_empty() {
        return Ok(());
    }
    sqlx::query(
        "INSERT INTO organization_activity (organization_id, activity_id) \
         SELECT $1, * FROM UNNEST($2::bigint[]) \
         ON CONFLICT DO NOTHING",
    )
    .bind(organization_id)
    .bind(activity_ids)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Delete an organization; its phones and tags go with it.
///
/// # Errors
///
/// Returns [`DbError::Directory`] with `NotFound` for an unknown id.
pub async fn delete_organization(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let deleted = sqlx::query("DELETE FROM organizations WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();
    if deleted == 0 {
        return Err(not_found("organization", id));
    }
    tracing::info!(organization_id = id, "organization deleted");
    Ok(())
}

/// # Errors
///
/// Returns [`DbError::Directory`] with `NotFound` for an unknown
/// organization, or `InvalidParameter` for a blank or duplicate phone.
pub async fn add_phone(pool: &PgPool, organization_id: i64, phone: &str) -> Result<Phone, DbError> {
    let phone = normalize_phone(phone)?;
    let result = sqlx::query_as::<_, PhoneRow>(
        "INSERT INTO organization_phones (organization_id, phone) \
         SELECT id, $2 FROM organizations WHERE id = $1 \
         RETURNING id, organization_id, phone",
    )
    .bind(organization_id)
    .bind(&phone)
    .fetch_optional(pool)
    .await;

    match result {
        Ok(Some(row)) => Ok(Phone {
            id: row.id,
            phone: row.phone,
        }),
        Ok(None) => Err(not_found("organization", organization_id)),
        Err(e) if is_unique_violation(&e, "uq_org_phone") => {
            Err(DirectoryError::InvalidParameter(format!(
                "organization {organization_id} already has phone {phone:?}"
            ))
            .into())
        }
        Err(e) => Err(e.into()),
    }
}

/// # Errors
///
/// Returns [`DbError::Directory`] with `NotFound` unless `phone_id` belongs
/// to `organization_id`.
pub async fn remove_phone(pool: &PgPool, organization_id: i64, phone_id: i64) -> Result<(), DbError> {
    let deleted = sqlx::query(
        "DELETE FROM organization_phones WHERE id = $1 AND organization_id = $2",
    )
    .bind(phone_id)
    .bind(organization_id)
    .execute(pool)
    .await?
    .rows_affected();
    if deleted == 0 {
        return Err(not_found("phone", phone_id));
    }
    Ok(())
}

/// Tag an organization with an activity. Returns `false` if it already was.
///
/// # Errors
///
/// Returns [`DbError::Directory`] with `NotFound` for an unknown
/// organization or activity.
pub async fn tag_organization(
    pool: &PgPool,
    organization_id: i64,
    activity_id: i64,
) -> Result<bool, DbError> {
    let mut tx = pool.begin().await?;
    ensure_exists(&mut tx, "organization", organization_id).await?;
    ensure_exists(&mut tx, "activity", activity_id).await?;

    let inserted = sqlx::query(
        "INSERT INTO organization_activity (organization_id, activity_id) \
         VALUES ($1, $2) \
         ON CONFLICT DO NOTHING",
    )
    .bind(organization_id)
    .bind(activity_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();
    tx.commit().await?;
    Ok(inserted > 0)
}

/// Returns `false` if the tag was not present.
///
/// # Errors
///
/// Returns [`DbError::Directory`] with `NotFound` for an unknown
/// organization.
pub async fn untag_organization(
    pool: &PgPool,
    organization_id: i64,
    activity_id: i64,
) -> Result<bool, DbError> {
    let mut tx = pool.begin().await?;
    ensure_exists(&mut tx, "organization", organization_id).await?;

    let deleted = sqlx::query(
        "DELETE FROM organization_activity WHERE organization_id = $1 AND activity_id = $2",
    )
    .bind(organization_id)
    .bind(activity_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();
    tx.commit().await?;
    Ok(deleted > 0)
}

async fn ensure_exists(
    tx: &mut Transaction<'static, Postgres>,
    entity: &'static str,
    id: i64,
) -> Result<(), DbError> {
    let sql = match entity {
        "organization" => "SELECT id FROM organizations WHERE id = $1 FOR KEY SHARE",
        _ => "SELECT id FROM activities WHERE id = $1 FOR KEY SHARE",
    };
    let found: Option<i64> = sqlx::query_scalar::<_, i64>(sql)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
    if found.is_none() {
        return Err(not_found(entity, id));
    }
    Ok(())
}

fn not_found(entity: &'static str, id: i64) -> DbError {
    DirectoryError::NotFound { entity, id }.into()
}
