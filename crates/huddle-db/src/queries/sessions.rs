//! Database query functions for the `sessions` table.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Session;

/// Insert a session row for a freshly minted token.
pub async fn create_session(pool: &PgPool, user_id: Uuid, token: &str) -> Result<Session> {
    let session = sqlx::query_as::<_, Session>(
        "INSERT INTO sessions (token, user_id) VALUES ($1, $2) RETURNING *",
    )
    .bind(token)
    .bind(user_id)
    .fetch_one(pool)
    .await
    .context("failed to create session")?;

    Ok(session)
}

/// Look up a session by its token.
pub async fn get_session(pool: &PgPool, token: &str) -> Result<Option<Session>> {
    let session = sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE token = $1")
        .bind(token)
        .fetch_optional(pool)
        .await
        .context("failed to fetch session")?;

    Ok(session)
}

/// Delete a session (logout). Deleting an unknown token is a no-op.
pub async fn delete_session(pool: &PgPool, token: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE token = $1")
        .bind(token)
        .execute(pool)
        .await
        .context("failed to delete session")?;

    Ok(())
}
