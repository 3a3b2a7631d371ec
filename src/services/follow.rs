//! Follow service — subscriptions between users.
//!
//! INVARIANTS
//! ==========
//! A (user, author) pair exists at most once and never with `user == author`.
//! The checks here keep both operations idempotent; the `follows` table's
//! `UNIQUE` and `CHECK` constraints back them up against races.

use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum FollowError {
    #[error("users cannot follow themselves")]
    SelfFollow,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Outcome of a follow/unfollow call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowChange {
    Created,
    Removed,
    Unchanged,
}

/// Subscribe `user_id` to `author_id`. Already following is not an error.
///
/// # Errors
///
/// Returns `SelfFollow` when both ids match, or a database error.
pub async fn follow(pool: &PgPool, user_id: Uuid, author_id: Uuid) -> Result<FollowChange, FollowError> {
    if user_id == author_id {
        return Err(FollowError::SelfFollow);
    }
    let result = sqlx::query(
        "INSERT INTO follows (user_id, author_id) VALUES ($1, $2) ON CONFLICT (user_id, author_id) DO NOTHING",
    )
    .bind(user_id)
    .bind(author_id)
    .execute(pool)
    .await?;

    Ok(if result.rows_affected() == 0 { FollowChange::Unchanged } else { FollowChange::Created })
}

/// Remove a subscription if it exists.
///
/// # Errors
///
/// Returns a database error if the delete fails.
pub async fn unfollow(pool: &PgPool, user_id: Uuid, author_id: Uuid) -> Result<FollowChange, FollowError> {
    let result = sqlx::query("DELETE FROM follows WHERE user_id = $1 AND author_id = $2")
        .bind(user_id)
        .bind(author_id)
        .execute(pool)
        .await?;

    Ok(if result.rows_affected() == 0 { FollowChange::Unchanged } else { FollowChange::Removed })
}

/// Whether `user_id` follows `author_id`.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn is_following(pool: &PgPool, user_id: Uuid, author_id: Uuid) -> Result<bool, FollowError> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM follows WHERE user_id = $1 AND author_id = $2)")
            .bind(user_id)
            .bind(author_id)
            .fetch_one(pool)
            .await?;
    Ok(exists)
}

#[cfg(test)]
#[path = "follow_test.rs"]
mod tests;
