use super::*;
#[cfg(feature = "live-db-tests")]
use crate::services::test_db::{integration_pool, unique_name};

#[test]
fn group_displays_title() {
    let group = GroupRow { id: 1, title: "Test group".into(), slug: "test-slug".into(), description: String::new() };
    assert_eq!(group.to_string(), "Test group");
}

#[test]
fn slug_rules() {
    assert!(is_valid_slug("test-slug"));
    assert!(is_valid_slug("group_2"));
    assert!(!is_valid_slug(""));
    assert!(!is_valid_slug("has space"));
    assert!(!is_valid_slug("кириллица"));
    assert!(!is_valid_slug(&"a".repeat(51)));
}

#[test]
fn parse_seed_reads_list_with_default_description() {
    let yaml = r"
- title: Cats
  slug: cats
  description: All about cats
- title: Dogs
  slug: dogs
";
    let groups = parse_seed(yaml).unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].title, "Cats");
    assert_eq!(groups[0].description, "All about cats");
    assert_eq!(groups[1].slug, "dogs");
    assert_eq!(groups[1].description, "");
}

#[test]
fn parse_seed_empty_list() {
    assert!(parse_seed("[]").unwrap().is_empty());
}

#[test]
fn parse_seed_rejects_bad_slug() {
    let yaml = "- title: Cats\n  slug: not a slug\n";
    let err = parse_seed(yaml).unwrap_err();
    assert!(matches!(err, GroupError::Invalid { ref slug, .. } if slug == "not a slug"));
}

#[test]
fn parse_seed_rejects_blank_title() {
    let yaml = "- title: '  '\n  slug: cats\n";
    assert!(matches!(parse_seed(yaml), Err(GroupError::Invalid { .. })));
}

#[test]
fn parse_seed_rejects_malformed_yaml() {
    assert!(matches!(parse_seed("- title: [unclosed"), Err(GroupError::Yaml(_))));
}

#[cfg(feature = "live-db-tests")]
#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL/live Postgres"]
async fn upsert_then_lookup_by_slug() {
    let pool = integration_pool().await;
    let slug = unique_name("grp");

    let created = upsert_group(&pool, &NewGroup { title: "First".into(), slug: slug.clone(), description: "d".into() })
        .await
        .unwrap();
    let updated = upsert_group(&pool, &NewGroup { title: "Second".into(), slug: slug.clone(), description: "e".into() })
        .await
        .unwrap();
    assert_eq!(created.id, updated.id);

    let fetched = get_by_slug(&pool, &slug).await.unwrap();
    assert_eq!(fetched.title, "Second");
    assert_eq!(fetched.id, created.id);

    let missing = get_by_slug(&pool, "no-such-group-slug").await;
    assert!(matches!(missing, Err(GroupError::NotFound(_))));
}
