use super::*;
#[cfg(feature = "live-db-tests")]
use crate::services::test_db::{integration_pool, unique_name};

// =============================================================================
// normalize_username
// =============================================================================

#[test]
fn normalize_username_trims_and_accepts_allowed_chars() {
    assert_eq!(normalize_username("  auth "), Some("auth".to_owned()));
    assert_eq!(normalize_username("a.b+c-d_e@f"), Some("a.b+c-d_e@f".to_owned()));
}

#[test]
fn normalize_username_accepts_non_ascii_letters() {
    assert_eq!(normalize_username("лев"), Some("лев".to_owned()));
}

#[test]
fn normalize_username_rejects_bad_shapes() {
    assert_eq!(normalize_username(""), None);
    assert_eq!(normalize_username("   "), None);
    assert_eq!(normalize_username("has space"), None);
    assert_eq!(normalize_username("slash/name"), None);
    assert_eq!(normalize_username(&"x".repeat(151)), None);
}

#[test]
fn normalize_username_accepts_max_length() {
    let name = "x".repeat(150);
    assert_eq!(normalize_username(&name), Some(name));
}

// =============================================================================
// password hashing
// =============================================================================

#[test]
fn hash_then_verify_accepts_correct_password() {
    let hash = hash_password("correct horse").unwrap();
    assert!(hash.starts_with("$argon2"));
    assert!(verify_password("correct horse", &hash));
}

#[test]
fn verify_rejects_wrong_password() {
    let hash = hash_password("correct horse").unwrap();
    assert!(!verify_password("battery staple", &hash));
}

#[test]
fn verify_rejects_malformed_hash() {
    assert!(!verify_password("anything", "not-a-phc-string"));
}

#[test]
fn hashes_are_salted() {
    let a = hash_password("same-password").unwrap();
    let b = hash_password("same-password").unwrap();
    assert_ne!(a, b);
}

#[test]
fn user_row_displays_username() {
    let user = UserRow { id: Uuid::nil(), username: "auth".into() };
    assert_eq!(user.to_string(), "auth");
}

// =============================================================================
// live database
// =============================================================================

#[cfg(feature = "live-db-tests")]
#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL/live Postgres"]
async fn create_user_then_authenticate() {
    let pool = integration_pool().await;

    let name = unique_name("auth");

    let user = create_user(&pool, &name, "password123")
        .await
        .expect("create_user should succeed");
    assert_eq!(user.username, name);

    let ok = authenticate(&pool, &name, "password123").await.unwrap();
    assert_eq!(ok.map(|u| u.id), Some(user.id));

    let bad = authenticate(&pool, &name, "wrong-password").await.unwrap();
    assert!(bad.is_none());

    let dup = create_user(&pool, &name, "password456").await;
    assert!(matches!(dup, Err(AccountError::UsernameTaken)));

    let found = find_by_username(&pool, &name).await.unwrap();
    assert_eq!(found, Some(user));

    let weak = create_user(&pool, &unique_name("other"), "short").await;
    assert!(matches!(weak, Err(AccountError::WeakPassword)));
}
