//! Database query functions for the `plans` table.
//!
//! These are the plain CRUD writes and reads. The filtered, sorted discovery
//! query is composed and executed in `huddle-core::discover`.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Plan, PlanDraft};

/// Insert a new plan row. Returns the inserted plan with server-generated
/// defaults (id, current_participants, timestamps).
pub async fn insert_plan(pool: &PgPool, posted_by: Uuid, draft: &PlanDraft) -> Result<Plan> {
    let plan = sqlx::query_as::<_, Plan>(
        "INSERT INTO plans \
         (title, description, price, duration, category, location, location_lat, location_lon, \
          features, invited_friends, start_date, end_date, max_participants, posted_by) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
         RETURNING *",
    )
    .bind(&draft.title)
    .bind(&draft.description)
    .bind(draft.price)
    .bind(&draft.duration)
    .bind(draft.category)
    .bind(&draft.location)
    .bind(draft.location_lat)
    .bind(draft.location_lon)
    .bind(&draft.features)
    .bind(&draft.invited_friends)
    .bind(draft.start_date)
    .bind(draft.end_date)
    .bind(draft.max_participants)
    .bind(posted_by)
    .fetch_one(pool)
    .await
    .context("failed to insert plan")?;

    Ok(plan)
}

/// Fetch a plan by its ID.
pub async fn get_plan(pool: &PgPool, id: Uuid) -> Result<Option<Plan>> {
    let plan = sqlx::query_as::<_, Plan>("SELECT * FROM plans WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch plan")?;

    Ok(plan)
}

/// Full-record update of a plan's attribute fields. Partial updates are
/// unsupported; the owner and participation counter are never touched.
///
/// Updating a nonexistent ID affects zero rows and is indistinguishable
/// from success. No ownership check happens at this layer.
pub async fn update_plan(pool: &PgPool, id: Uuid, draft: &PlanDraft) -> Result<()> {
    sqlx::query(
        "UPDATE plans SET \
         title = $1, description = $2, price = $3, duration = $4, category = $5, \
         location = $6, location_lat = $7, location_lon = $8, features = $9, \
         invited_friends = $10, start_date = $11, end_date = $12, max_participants = $13, \
         updated_at = now() \
         WHERE id = $14",
    )
    .bind(&draft.title)
    .bind(&draft.description)
    .bind(draft.price)
    .bind(&draft.duration)
    .bind(draft.category)
    .bind(&draft.location)
    .bind(draft.location_lat)
    .bind(draft.location_lon)
    .bind(&draft.features)
    .bind(&draft.invited_friends)
    .bind(draft.start_date)
    .bind(draft.end_date)
    .bind(draft.max_participants)
    .bind(id)
    .execute(pool)
    .await
    .context("failed to update plan")?;

    Ok(())
}

/// Delete a plan by ID. Deleting a nonexistent ID is a no-op.
pub async fn delete_plan(pool: &PgPool, id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM plans WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("failed to delete plan")?;

    Ok(())
}

/// List every plan, unfiltered.
pub async fn list_plans(pool: &PgPool) -> Result<Vec<Plan>> {
    let plans = sqlx::query_as::<_, Plan>("SELECT * FROM plans")
        .fetch_all(pool)
        .await
        .context("failed to list plans")?;

    Ok(plans)
}
