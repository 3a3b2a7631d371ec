use super::*;
use crate::state::test_helpers::test_app_state;
use axum::http::header::{COOKIE, LOCATION};

fn parts_for(uri: &str, cookie: Option<&str>) -> Parts {
    let mut builder = axum::http::Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(()).unwrap().into_parts().0
}

// =============================================================================
// login_redirect
// =============================================================================

#[test]
fn login_redirect_keeps_slashes_readable() {
    assert_eq!(login_redirect("/create/"), "/auth/login/?next=/create/");
    assert_eq!(login_redirect("/posts/1/edit/"), "/auth/login/?next=/posts/1/edit/");
}

#[test]
fn login_redirect_encodes_query_characters() {
    assert_eq!(login_redirect("/follow/?page=2"), "/auth/login/?next=/follow/%3Fpage%3D2");
}

// =============================================================================
// cookies
// =============================================================================

#[test]
fn session_cookie_is_http_only_and_lax() {
    let cookie = session_cookie("abc".into(), true);
    assert_eq!(cookie.name(), COOKIE_NAME);
    assert_eq!(cookie.value(), "abc");
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    assert_eq!(cookie.secure(), Some(true));
    assert_eq!(cookie.path(), Some("/"));
}

#[test]
fn clear_cookie_expires_immediately() {
    let cookie = clear_cookie(false);
    assert_eq!(cookie.value(), "");
    assert_eq!(cookie.max_age(), Some(Duration::ZERO));
}

#[test]
fn session_token_ignores_empty_cookie() {
    assert_eq!(session_token(&parts_for("/", Some("session_token="))), None);
    assert_eq!(session_token(&parts_for("/", Some("session_token=abc"))).as_deref(), Some("abc"));
    assert_eq!(session_token(&parts_for("/", None)), None);
}

// =============================================================================
// extractors without a session
// =============================================================================

#[tokio::test]
async fn auth_user_without_cookie_redirects_to_login() {
    let state = test_app_state();
    let mut parts = parts_for("/posts/3/edit/", None);
    let Err(response) = AuthUser::from_request_parts(&mut parts, &state).await else {
        panic!("anonymous request must be rejected");
    };
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[LOCATION], "/auth/login/?next=/posts/3/edit/");
}

#[tokio::test]
async fn maybe_user_without_cookie_is_anonymous() {
    let state = test_app_state();
    let mut parts = parts_for("/", None);
    let Ok(MaybeUser(user)) = MaybeUser::from_request_parts(&mut parts, &state).await else {
        panic!("anonymous request must not be rejected");
    };
    assert!(user.is_none());
}

// =============================================================================
// pages
// =============================================================================

#[tokio::test]
async fn login_form_carries_next() {
    let Json(page) = login_form(Query(NextQuery { next: Some("/create/".into()) })).await;
    assert_eq!(page.title, "Log in");
    assert_eq!(page.next.as_deref(), Some("/create/"));
    assert!(page.form.field("password").is_some_and(|f| f.widget == "password"));
}

#[tokio::test]
async fn signup_form_has_no_errors() {
    let Json(page) = signup_form(Query(NextQuery::default())).await;
    assert!(page.form.errors.is_empty());
    assert!(page.next.is_none());
}

// =============================================================================
// live database
// =============================================================================

#[cfg(feature = "live-db-tests")]
#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL/live Postgres"]
async fn login_sets_cookie_and_follows_next() {
    use crate::services::test_db::{integration_pool, unique_name};

    let pool = integration_pool().await;
    let username = unique_name("login");
    account::create_user(&pool, &username, "correct horse").await.unwrap();

    let state = AppState::new(pool, crate::config::Config::with_database_url("postgres://unused"));
    let form = CredentialsForm { username: username.clone(), password: "correct horse".into(), next: Some("/create/".into()) };
    let response = login(State(state.clone()), CookieJar::new(), Query(NextQuery::default()), Form(form)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[LOCATION], "/create/");
    let set_cookie = response.headers()[axum::http::header::SET_COOKIE].to_str().unwrap();
    assert!(set_cookie.starts_with("session_token="));

    let bad = CredentialsForm { username, password: "wrong password".into(), next: None };
    let response = login(State(state), CookieJar::new(), Query(NextQuery::default()), Form(bad)).await;
    assert_eq!(response.status(), StatusCode::OK);
}
