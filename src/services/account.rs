//! Account service — signup, credential checks, user lookup.

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use sqlx::{PgPool, Row};
use uuid::Uuid;

const USERNAME_MAX_LEN: usize = 150;
const PASSWORD_MIN_LEN: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("username must be 1-150 characters of letters, digits and @/./+/-/_")]
    InvalidUsername,
    #[error("password must be at least {PASSWORD_MIN_LEN} characters")]
    WeakPassword,
    #[error("username already taken")]
    UsernameTaken,
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Public view of a user.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct UserRow {
    pub id: Uuid,
    pub username: String,
}

impl std::fmt::Display for UserRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.username)
    }
}

/// Trim and validate a username.
#[must_use]
pub fn normalize_username(raw: &str) -> Option<String> {
    let name = raw.trim();
    let valid = !name.is_empty()
        && name.chars().count() <= USERNAME_MAX_LEN
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'));
    valid.then(|| name.to_owned())
}

pub fn hash_password(password: &str) -> Result<String, AccountError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AccountError::Hash(e.to_string()))
}

#[must_use]
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Create a user with a hashed password.
///
/// # Errors
///
/// Returns a validation error for a bad username or short password,
/// `UsernameTaken` on a duplicate, or a database error.
pub async fn create_user(pool: &PgPool, username: &str, password: &str) -> Result<UserRow, AccountError> {
    let username = normalize_username(username).ok_or(AccountError::InvalidUsername)?;
    if password.chars().count() < PASSWORD_MIN_LEN {
        return Err(AccountError::WeakPassword);
    }
    let password_hash = hash_password(password)?;

    let row = sqlx::query(
        r"INSERT INTO users (username, password_hash)
          VALUES ($1, $2)
          ON CONFLICT (username) DO NOTHING
          RETURNING id, username",
    )
    .bind(&username)
    .bind(password_hash)
    .fetch_optional(pool)
    .await?
    .ok_or(AccountError::UsernameTaken)?;

    Ok(UserRow { id: row.get("id"), username: row.get("username") })
}

/// Check a username/password pair. Returns `None` on any mismatch.
pub async fn authenticate(pool: &PgPool, username: &str, password: &str) -> Result<Option<UserRow>, AccountError> {
    let row = sqlx::query("SELECT id, username, password_hash FROM users WHERE username = $1")
        .bind(username.trim())
        .fetch_optional(pool)
        .await?;

    let Some(row) = row else {
        return Ok(None);
    };
    let hash: String = row.get("password_hash");
    if !verify_password(password, &hash) {
        return Ok(None);
    }
    Ok(Some(UserRow { id: row.get("id"), username: row.get("username") }))
}

pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<UserRow>, AccountError> {
    let row = sqlx::query_as::<_, (Uuid, String)>("SELECT id, username FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|(id, username)| UserRow { id, username }))
}

#[cfg(test)]
#[path = "account_test.rs"]
mod tests;
