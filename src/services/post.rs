//! Post service — filtered listings, detail, create, edit.
//!
//! DESIGN
//! ======
//! Every listing (index, group, profile, follow feed) is the same query with
//! a different `WHERE` clause, so they share one `PostFilter` and one
//! `paginate` entry point. Rows always come back newest first with the
//! author and group joined in, which is what every page renders.

use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Row};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::pagination::{Page, PageWindow, Paginator};
use crate::services::account::UserRow;
use crate::services::media;

/// Characters of text used when a post is displayed by name.
pub const DISPLAY_CHARS: usize = 15;

const SELECT_POSTS: &str = "SELECT p.id, p.text, p.pub_date, p.image,
        u.id AS author_id, u.username AS author_username,
        g.id AS group_id, g.title AS group_title, g.slug AS group_slug
     FROM posts p
     JOIN users u ON u.id = p.author_id
     LEFT JOIN groups g ON g.id = p.group_id";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PostError {
    #[error("post not found: {0}")]
    NotFound(i64),
    #[error("post {0} belongs to another author")]
    Forbidden(i64),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Which posts a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFilter {
    All,
    Group(i64),
    Author(Uuid),
    /// Posts by every author the given user follows.
    FollowedBy(Uuid),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupRef {
    pub id: i64,
    pub title: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostRow {
    pub id: i64,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub pub_date: OffsetDateTime,
    /// Relative media path; serialized as a `/media/...` URL.
    #[serde(serialize_with = "media::serialize_url")]
    pub image: Option<String>,
    pub author: UserRow,
    pub group: Option<GroupRef>,
}

impl std::fmt::Display for PostRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&truncate_chars(&self.text, DISPLAY_CHARS))
    }
}

impl FromRow<'_, PgRow> for PostRow {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        let group_id: Option<i64> = row.try_get("group_id")?;
        let group = match group_id {
            Some(id) => Some(GroupRef { id, title: row.try_get("group_title")?, slug: row.try_get("group_slug")? }),
            None => None,
        };
        Ok(Self {
            id: row.try_get("id")?,
            text: row.try_get("text")?,
            pub_date: row.try_get("pub_date")?,
            image: row.try_get("image")?,
            author: UserRow { id: row.try_get("author_id")?, username: row.try_get("author_username")? },
            group,
        })
    }
}

/// Validated input for a new post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}

/// What to do with an existing post's image on edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageChange {
    Keep,
    Replace(String),
    Clear,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostUpdate {
    pub text: String,
    pub group_id: Option<i64>,
    pub image: ImageChange,
}

/// First `max` characters of `text`, on a char boundary.
#[must_use]
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

// =============================================================================
// LISTINGS
// =============================================================================

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: PostFilter) {
    match filter {
        PostFilter::All => {}
        PostFilter::Group(group_id) => {
            builder.push(" WHERE p.group_id = ").push_bind(group_id);
        }
        PostFilter::Author(author_id) => {
            builder.push(" WHERE p.author_id = ").push_bind(author_id);
        }
        PostFilter::FollowedBy(user_id) => {
            builder
                .push(" WHERE p.author_id IN (SELECT author_id FROM follows WHERE user_id = ")
                .push_bind(user_id)
                .push(")");
        }
    }
}

/// Count posts matching `filter`.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn count_posts(pool: &PgPool, filter: PostFilter) -> Result<i64, PostError> {
    let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM posts p");
    push_filter(&mut builder, filter);
    let count: i64 = builder.build_query_scalar().fetch_one(pool).await?;
    Ok(count)
}

/// Fetch one window of posts matching `filter`, newest first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_posts(pool: &PgPool, filter: PostFilter, window: &PageWindow) -> Result<Vec<PostRow>, PostError> {
    let mut builder = QueryBuilder::new(SELECT_POSTS);
    push_filter(&mut builder, filter);
    builder
        .push(" ORDER BY p.pub_date DESC, p.id DESC LIMIT ")
        .push_bind(window.limit)
        .push(" OFFSET ")
        .push_bind(window.offset);

    let rows = builder.build_query_as::<PostRow>().fetch_all(pool).await?;
    Ok(rows)
}

/// Count, resolve the requested page, and fetch it.
///
/// # Errors
///
/// Returns a database error if either query fails.
pub async fn paginate(
    pool: &PgPool,
    filter: PostFilter,
    paginator: Paginator,
    raw_page: Option<&str>,
) -> Result<Page<PostRow>, PostError> {
    let count = count_posts(pool, filter).await?;
    let window = paginator.window(raw_page, count);
    let rows = list_posts(pool, filter, &window).await?;
    Ok(window.into_page(rows))
}

// =============================================================================
// SINGLE POST
// =============================================================================

/// Fetch one post by id.
///
/// # Errors
///
/// Returns `NotFound` if no such post exists, or a database error.
pub async fn get_post(pool: &PgPool, post_id: i64) -> Result<PostRow, PostError> {
    let mut builder = QueryBuilder::new(SELECT_POSTS);
    builder.push(" WHERE p.id = ").push_bind(post_id);
    builder
        .build_query_as::<PostRow>()
        .fetch_optional(pool)
        .await?
        .ok_or(PostError::NotFound(post_id))
}

/// Insert a post stamped with `author_id` and return it.
///
/// # Errors
///
/// Returns a database error if the insert fails.
pub async fn create_post(pool: &PgPool, author_id: Uuid, draft: &PostDraft) -> Result<PostRow, PostError> {
    let post_id: i64 = sqlx::query_scalar(
        "INSERT INTO posts (text, group_id, image, author_id) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(&draft.text)
    .bind(draft.group_id)
    .bind(&draft.image)
    .bind(author_id)
    .fetch_one(pool)
    .await?;

    get_post(pool, post_id).await
}

/// Apply an edit. Only the post's author may edit it.
///
/// # Errors
///
/// Returns `NotFound` for an unknown post, `Forbidden` when `editor_id` is
/// not the author, or a database error.
pub async fn update_post(
    pool: &PgPool,
    post_id: i64,
    editor_id: Uuid,
    update: &PostUpdate,
) -> Result<PostRow, PostError> {
    let (keep_image, new_image) = match &update.image {
        ImageChange::Keep => (true, None),
        ImageChange::Replace(path) => (false, Some(path.as_str())),
        ImageChange::Clear => (false, None),
    };

    let result = sqlx::query(
        r"UPDATE posts
          SET text = $1,
              group_id = $2,
              image = CASE WHEN $3 THEN image ELSE $4::text END
          WHERE id = $5 AND author_id = $6",
    )
    .bind(&update.text)
    .bind(update.group_id)
    .bind(keep_image)
    .bind(new_image)
    .bind(post_id)
    .bind(editor_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        let exists: Option<Uuid> = sqlx::query_scalar("SELECT author_id FROM posts WHERE id = $1")
            .bind(post_id)
            .fetch_optional(pool)
            .await?;
        return Err(match exists {
            Some(_) => PostError::Forbidden(post_id),
            None => PostError::NotFound(post_id),
        });
    }

    get_post(pool, post_id).await
}

/// Total posts written by `author_id`.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn count_by_author(pool: &PgPool, author_id: Uuid) -> Result<i64, PostError> {
    count_posts(pool, PostFilter::Author(author_id)).await
}

#[cfg(test)]
#[path = "post_test.rs"]
mod tests;
