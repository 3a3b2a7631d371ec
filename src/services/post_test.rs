use super::*;
#[cfg(feature = "live-db-tests")]
use crate::services::test_db::{integration_pool, seed_group, seed_user};

fn sample_post(text: &str) -> PostRow {
    PostRow {
        id: 1,
        text: text.into(),
        pub_date: OffsetDateTime::UNIX_EPOCH,
        image: Some("posts/small.gif".into()),
        author: UserRow { id: Uuid::nil(), username: "auth".into() },
        group: Some(GroupRef { id: 1, title: "Test group".into(), slug: "test-slug".into() }),
    }
}

// =============================================================================
// Display / truncate_chars
// =============================================================================

#[test]
fn post_displays_first_fifteen_chars() {
    let post = sample_post("Test text of a fairly long post");
    assert_eq!(post.to_string(), "Test text of a ");
}

#[test]
fn post_display_short_text_is_whole() {
    assert_eq!(sample_post("short").to_string(), "short");
}

#[test]
fn truncate_chars_respects_multibyte_boundaries() {
    assert_eq!(truncate_chars("Тестовый текст1984", 15), "Тестовый текст1");
    assert_eq!(truncate_chars("", 15), "");
}

// =============================================================================
// Serialization
// =============================================================================

#[test]
fn post_row_serializes_media_url_and_group() {
    let json = serde_json::to_value(sample_post("hello")).unwrap();
    assert_eq!(json["image"], "/media/posts/small.gif");
    assert_eq!(json["group"]["slug"], "test-slug");
    assert_eq!(json["author"]["username"], "auth");
    assert_eq!(json["pub_date"], "1970-01-01T00:00:00Z");
}

#[test]
fn post_row_without_group_serializes_null() {
    let mut post = sample_post("hello");
    post.group = None;
    post.image = None;
    let json = serde_json::to_value(post).unwrap();
    assert!(json["group"].is_null());
    assert!(json["image"].is_null());
}

// =============================================================================
// live database
// =============================================================================

#[cfg(feature = "live-db-tests")]
#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL/live Postgres"]
async fn group_and_author_listings_paginate() {
    let pool = integration_pool().await;
    let author = seed_user(&pool, "auth").await;
    let group = seed_group(&pool, "Test group").await;
    let other_group = seed_group(&pool, "Other group").await;

    for i in 0..12 {
        let draft = PostDraft { text: format!("Test text {i}"), group_id: Some(group.id), image: None };
        create_post(&pool, author.id, &draft).await.unwrap();
    }

    let paginator = Paginator::new(10);

    let first = paginate(&pool, PostFilter::Group(group.id), paginator, None).await.unwrap();
    assert_eq!(first.len(), 10);
    assert_eq!(first.count, 12);
    assert!(first.object_list.iter().all(|p| p.group.as_ref().map(|g| g.id) == Some(group.id)));
    assert_eq!(first.object_list[0].text, "Test text 11", "newest first");

    let second = paginate(&pool, PostFilter::Group(group.id), paginator, Some("2")).await.unwrap();
    assert_eq!(second.len(), 2);

    let by_author = paginate(&pool, PostFilter::Author(author.id), paginator, Some("2")).await.unwrap();
    assert_eq!(by_author.len(), 2);
    assert_eq!(count_by_author(&pool, author.id).await.unwrap(), 12);

    let empty = paginate(&pool, PostFilter::Group(other_group.id), paginator, None).await.unwrap();
    assert!(empty.is_empty());
    assert_eq!(empty.num_pages, 1);
}

#[cfg(feature = "live-db-tests")]
#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL/live Postgres"]
async fn update_post_enforces_authorship() {
    let pool = integration_pool().await;
    let author = seed_user(&pool, "auth").await;
    let intruder = seed_user(&pool, "intruder").await;
    let group = seed_group(&pool, "Test group").await;

    let draft = PostDraft { text: "Original".into(), group_id: Some(group.id), image: Some("posts/a.gif".into()) };
    let post = create_post(&pool, author.id, &draft).await.unwrap();
    assert_eq!(post.author, author);

    let edit = PostUpdate { text: "Edited".into(), group_id: None, image: ImageChange::Keep };
    let denied = update_post(&pool, post.id, intruder.id, &edit).await;
    assert!(matches!(denied, Err(PostError::Forbidden(id)) if id == post.id));
    assert_eq!(get_post(&pool, post.id).await.unwrap().text, "Original");

    let updated = update_post(&pool, post.id, author.id, &edit).await.unwrap();
    assert_eq!(updated.text, "Edited");
    assert!(updated.group.is_none());
    assert_eq!(updated.image.as_deref(), Some("posts/a.gif"));

    let cleared = PostUpdate { text: "Edited".into(), group_id: None, image: ImageChange::Clear };
    assert!(update_post(&pool, post.id, author.id, &cleared).await.unwrap().image.is_none());

    let missing = update_post(&pool, i64::MAX, author.id, &edit).await;
    assert!(matches!(missing, Err(PostError::NotFound(_))));
}
