//! Database query functions for the `friends` table.
//!
//! Friendship rows are directed (user_id, friend_id) pairs. The scope
//! resolver treats them symmetrically for one-hop visibility, but the rows
//! themselves keep their stored direction: the friends listing endpoint and
//! the two-hop traversal both follow edges forward only.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{FriendEdge, FriendProfile};

/// Insert a directed friendship edge.
///
/// Inserting an edge that already exists surfaces the unique violation to
/// the caller; no self-loop validation happens here.
pub async fn add_friend(pool: &PgPool, user_id: Uuid, friend_id: Uuid) -> Result<()> {
    sqlx::query("INSERT INTO friends (user_id, friend_id) VALUES ($1, $2)")
        .bind(user_id)
        .bind(friend_id)
        .execute(pool)
        .await
        .context("failed to add friend")?;

    Ok(())
}

/// Delete a directed friendship edge.
///
/// Deleting an edge that does not exist is indistinguishable from success.
pub async fn remove_friend(pool: &PgPool, user_id: Uuid, friend_id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM friends WHERE user_id = $1 AND friend_id = $2")
        .bind(user_id)
        .bind(friend_id)
        .execute(pool)
        .await
        .context("failed to remove friend")?;

    Ok(())
}

/// List the public profiles of a user's one-hop forward friends.
///
/// This listing is one-directional on purpose: only edges stored as
/// (user_id, X) appear, unlike the symmetric friend-scope filter.
pub async fn list_friend_profiles(pool: &PgPool, user_id: Uuid) -> Result<Vec<FriendProfile>> {
    let profiles = sqlx::query_as::<_, FriendProfile>(
        "SELECT u.id, u.username, u.email \
         FROM users u \
         INNER JOIN friends f ON u.id = f.friend_id \
         WHERE f.user_id = $1",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("failed to list friends")?;

    Ok(profiles)
}

/// Load the full directed edge list, for building the in-memory friend graph.
pub async fn friend_edges(pool: &PgPool) -> Result<Vec<FriendEdge>> {
    let edges = sqlx::query_as::<_, FriendEdge>("SELECT user_id, friend_id FROM friends")
        .fetch_all(pool)
        .await
        .context("failed to load friendship edges")?;

    Ok(edges)
}
