//! Comment service.

use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Row};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::services::account::UserRow;

#[derive(Debug, thiserror::Error)]
pub enum CommentError {
    #[error("post not found: {0}")]
    PostNotFound(i64),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentRow {
    pub id: i64,
    pub post_id: i64,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
    pub author: UserRow,
}

impl FromRow<'_, PgRow> for CommentRow {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            post_id: row.try_get("post_id")?,
            text: row.try_get("text")?,
            created: row.try_get("created")?,
            author: UserRow { id: row.try_get("author_id")?, username: row.try_get("author_username")? },
        })
    }
}

/// Attach a comment to a post.
///
/// # Errors
///
/// Returns `PostNotFound` if the post does not exist, or a database error.
pub async fn add_comment(pool: &PgPool, post_id: i64, author_id: Uuid, text: &str) -> Result<CommentRow, CommentError> {
    let row = sqlx::query_as::<_, CommentRow>(
        r"WITH inserted AS (
              INSERT INTO comments (post_id, author_id, text)
              SELECT id, $2, $3 FROM posts WHERE id = $1
              RETURNING id, post_id, author_id, text, created
          )
          SELECT i.id, i.post_id, i.text, i.created, i.author_id, u.username AS author_username
          FROM inserted i
          JOIN users u ON u.id = i.author_id",
    )
    .bind(post_id)
    .bind(author_id)
    .bind(text)
    .fetch_optional(pool)
    .await?;

    row.ok_or(CommentError::PostNotFound(post_id))
}

/// Comments on a post, oldest first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_for_post(pool: &PgPool, post_id: i64) -> Result<Vec<CommentRow>, CommentError> {
    let rows = sqlx::query_as::<_, CommentRow>(
        r"SELECT c.id, c.post_id, c.text, c.created, c.author_id, u.username AS author_username
          FROM comments c
          JOIN users u ON u.id = c.author_id
          WHERE c.post_id = $1
          ORDER BY c.created ASC, c.id ASC",
    )
    .bind(post_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

#[cfg(test)]
#[path = "comment_test.rs"]
mod tests;
