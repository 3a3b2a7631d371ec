//! Group (community) service — lookup, listing, and startup seeding.
//!
//! Groups have no public create/edit routes. They are curated by whoever
//! runs the site, either directly in the database or through the
//! `GROUPS_FILE` YAML list that is upserted by slug on every start.

use std::path::Path;

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

const TITLE_MAX_LEN: usize = 200;
const SLUG_MAX_LEN: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum GroupError {
    #[error("group not found: {0}")]
    NotFound(String),
    #[error("invalid group {slug:?}: {reason}")]
    Invalid { slug: String, reason: &'static str },
    #[error("cannot read groups file: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse groups file: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct GroupRow {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl std::fmt::Display for GroupRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.title)
    }
}

/// One entry of the groups seed file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewGroup {
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
}

impl NewGroup {
    fn validate(&self) -> Result<(), GroupError> {
        let invalid = |reason| Err(GroupError::Invalid { slug: self.slug.clone(), reason });
        if self.title.trim().is_empty() || self.title.chars().count() > TITLE_MAX_LEN {
            return invalid("title must be 1-200 characters");
        }
        if !is_valid_slug(&self.slug) {
            return invalid("slug must be 1-50 characters of letters, digits, '-' or '_'");
        }
        Ok(())
    }
}

#[must_use]
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.len() <= SLUG_MAX_LEN
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

pub async fn get_by_slug(pool: &PgPool, slug: &str) -> Result<GroupRow, GroupError> {
    sqlx::query_as::<_, GroupRow>("SELECT id, title, slug, description FROM groups WHERE slug = $1")
        .bind(slug)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| GroupError::NotFound(slug.to_owned()))
}

/// All groups, alphabetically, for form choices.
pub async fn list_groups(pool: &PgPool) -> Result<Vec<GroupRow>, GroupError> {
    let rows = sqlx::query_as::<_, GroupRow>("SELECT id, title, slug, description FROM groups ORDER BY title, id")
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Insert a group or update the one with the same slug.
pub async fn upsert_group(pool: &PgPool, group: &NewGroup) -> Result<GroupRow, GroupError> {
    group.validate()?;
    let row = sqlx::query_as::<_, GroupRow>(
        r"INSERT INTO groups (title, slug, description)
          VALUES ($1, $2, $3)
          ON CONFLICT (slug) DO UPDATE SET title = EXCLUDED.title, description = EXCLUDED.description
          RETURNING id, title, slug, description",
    )
    .bind(group.title.trim())
    .bind(&group.slug)
    .bind(&group.description)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Parse a YAML list of groups.
pub fn parse_seed(yaml: &str) -> Result<Vec<NewGroup>, GroupError> {
    let groups: Vec<NewGroup> = serde_yaml::from_str(yaml)?;
    for group in &groups {
        group.validate()?;
    }
    Ok(groups)
}

/// Upsert every group listed in `path`. Returns how many were applied.
pub async fn seed_from_file(pool: &PgPool, path: &Path) -> Result<usize, GroupError> {
    let yaml = tokio::fs::read_to_string(path).await?;
    let groups = parse_seed(&yaml)?;
    for group in &groups {
        upsert_group(pool, group).await?;
    }
    Ok(groups.len())
}

#[cfg(test)]
#[path = "group_test.rs"]
mod tests;
