//! Database operations for the `activities` taxonomy.
//!
//! Every mutation runs in one transaction that first takes
//! `SHARE ROW EXCLUSIVE` on `activities`, loads the forest, validates the
//! change with [`ActivityTree`], and only then writes. The lock serializes
//! tree writers against each other while plain reads proceed.

use std::collections::BTreeSet;

use orgdir_core::{Activity, ActivityTree, ActivityTreeNode, DirectoryError, NodeUpdate, MAX_DEPTH};
use sqlx::{PgExecutor, PgPool, Postgres, Transaction};

use crate::{is_unique_violation, DbError};

/// A row from the `activities` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ActivityRow {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    pub depth: i16,
}

impl From<ActivityRow> for Activity {
    fn from(row: ActivityRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            parent_id: row.parent_id,
            // out-of-range values are reported by ActivityTree::check_invariants
            depth: u8::try_from(row.depth).unwrap_or(u8::MAX),
        }
    }
}

/// Load every activity into an [`ActivityTree`].
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn load_activity_tree<'e, E>(executor: E) -> Result<ActivityTree, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query_as::<_, ActivityRow>(
        "SELECT id, name, parent_id, depth FROM activities ORDER BY id",
    )
    .fetch_all(executor)
    .await?;
    Ok(ActivityTree::from_nodes(rows.into_iter().map(Activity::from)))
}

/// All activities ordered by id.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn list_activities(pool: &PgPool) -> Result<Vec<Activity>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ActivityRow>(
        "SELECT id, name, parent_id, depth FROM activities ORDER BY id",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Activity::from).collect())
}

/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn get_activity(pool: &PgPool, id: i64) -> Result<Option<Activity>, sqlx::Error> {
    let row = sqlx::query_as::<_, ActivityRow>(
        "SELECT id, name, parent_id, depth FROM activities WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(Activity::from))
}

/// The taxonomy as a forest, roots and children ordered by id.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn activity_tree(pool: &PgPool) -> Result<Vec<ActivityTreeNode>, sqlx::Error> {
    Ok(load_activity_tree(pool).await?.materialize())
}

/// Ids in the subtree rooted at `id`, via a recursive CTE bounded by the
/// depth limit. Unknown ids yield an empty set.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn activity_subtree_ids(
    pool: &PgPool,
    id: i64,
    include_self: bool,
) -> Result<BTreeSet<i64>, sqlx::Error> {
    let ids: Vec<i64> = sqlx::query_scalar::<_, i64>(
        "WITH RECURSIVE subtree (id, hops) AS ( \
             SELECT id, 1 FROM activities WHERE id = $1 \
             UNION \
             SELECT a.id, s.hops + 1 \
             FROM activities a \
             JOIN subtree s ON a.parent_id = s.id \
             WHERE s.hops < $2 \
         ) \
         SELECT DISTINCT id FROM subtree",
    )
    .bind(id)
    .bind(i32::from(MAX_DEPTH))
    .fetch_all(pool)
    .await?;

    let mut ids: BTreeSet<i64> = ids.into_iter().collect();
    if !include_self {
        ids.remove(&id);
    }
    Ok(ids)
}

/// Insert an activity under `parent_id` (`None` for a root).
///
/// # Errors
///
/// Returns [`DbError::Directory`] for `InvalidParameter`, `ParentNotFound`,
/// `DepthExceeded` or `DuplicateSibling`, and [`DbError::Sqlx`] on query
/// failure.
pub async fn insert_activity(
    pool: &PgPool,
    name: &str,
    parent_id: Option<i64>,
) -> Result<Activity, DbError> {
    let mut tx = begin_tree_write(pool).await?;
    let tree = load_activity_tree(&mut *tx).await?;
    let node = tree.validate_insert(name, parent_id)?;

    let row = sqlx::query_as::<_, ActivityRow>(
        "INSERT INTO activities (name, parent_id, depth) \
         VALUES ($1, $2, $3) \
         RETURNING id, name, parent_id, depth",
    )
    .bind(&node.name)
    .bind(node.parent_id)
    .bind(i16::from(node.depth))
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| sibling_conflict(e, &node.name, node.parent_id))?;

    tx.commit().await?;

    tracing::info!(
        activity_id = row.id,
        parent_id = ?row.parent_id,
        depth = row.depth,
        "activity inserted"
    );
    Ok(row.into())
}

/// Re-parent an activity, rewriting the depth of every descendant.
///
/// Returns the rows that were changed, the moved node first.
///
/// # Errors
///
/// Returns [`DbError::Directory`] for `NotFound`, `SelfParent`,
/// `ParentNotFound`, `CycleDetected`, `DepthExceeded` or `DuplicateSibling`;
/// nothing is written in that case.
pub async fn move_activity(
    pool: &PgPool,
    id: i64,
    new_parent_id: Option<i64>,
) -> Result<Vec<NodeUpdate>, DbError> {
    let mut tx = begin_tree_write(pool).await?;
    let tree = load_activity_tree(&mut *tx).await?;
    let updates = tree.plan_move(id, new_parent_id)?;

    let name = tree.get(id).map(|a| a.name.clone()).unwrap_or_default();
    apply_updates(&mut tx, &updates)
        .await
        .map_err(|e| sibling_conflict(e, &name, new_parent_id))?;
    tx.commit().await?;

    tracing::info!(
        activity_id = id,
        parent_id = ?new_parent_id,
        updated = updates.len(),
        "activity moved"
    );
    Ok(updates)
}

/// Delete an activity. Its children become roots (depths re-derived for
/// their subtrees) and its organization tags are dropped.
///
/// # Errors
///
/// Returns [`DbError::Directory`] for `NotFound`, or `DuplicateSibling` when
/// a child's name is already used by a root; nothing is written in that case.
pub async fn delete_activity(pool: &PgPool, id: i64) -> Result<Vec<NodeUpdate>, DbError> {
    let mut tx = begin_tree_write(pool).await?;
    let tree = load_activity_tree(&mut *tx).await?;
    let updates = tree.plan_detach_children(id)?;

    // ON DELETE SET NULL detaches the children; organization_activity cascades.
    sqlx::query("DELETE FROM activities WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    apply_updates(&mut tx, &updates).await?;
    tx.commit().await?;

    tracing::info!(
        activity_id = id,
        updated = updates.len(),
        "activity deleted"
    );
    Ok(updates)
}

async fn begin_tree_write(pool: &PgPool) -> Result<Transaction<'static, Postgres>, sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("LOCK TABLE activities IN SHARE ROW EXCLUSIVE MODE")
        .execute(&mut *tx)
        .await?;
    Ok(tx)
}

/// Write a planned update list with a single `UPDATE … FROM UNNEST(…)`.
async fn apply_updates(
    tx: &mut Transaction<'static, Postgres>,
    updates: &[NodeUpdate],
) -> Result<(), sqlx::Error> {
    if updates.is_empty() {
        return Ok(());
    }

    let ids: Vec<i64> = updates.iter().map(|u| u.id).collect();
    let parent_ids: Vec<Option<i64>> = updates.iter().map(|u| u.parent_id).collect();
    let depths: Vec<i16> = updates.iter().map(|u| i16::from(u.depth)).collect();

    sqlx::query(
        "UPDATE activities AS a \
         SET parent_id = u.parent_id, depth = u.depth \
         FROM UNNEST($1::bigint[], $2::bigint[], $3::smallint[]) AS u (id, parent_id, depth) \
         WHERE a.id = u.id",
    )
    .bind(&ids)
    .bind(&parent_ids)
    .bind(&depths)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

fn sibling_conflict(err: sqlx::Error, name: &str, parent_id: Option<i64>) -> DbError {
    if is_unique_violation(&err, "uq_activity_parent_name")
        || is_unique_violation(&err, "uq_activity_root_name")
    {
        DirectoryError::DuplicateSibling {
            name: name.to_string(),
            parent_id,
        }
        .into()
    } else {
        err.into()
    }
}
