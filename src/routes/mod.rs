//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! One Axum router serves the JSON page documents, the auth endpoints, and
//! uploaded media under `/media`. Unmatched paths fall through to a JSON 404.

pub mod about;
pub mod auth;
pub mod forms;
pub mod posts;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use tower_http::compression::CompressionLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Room for the text fields and multipart framing around an image.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the application router.
pub fn app(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes.saturating_add(FORM_OVERHEAD_BYTES);
    let media = ServeDir::new(&state.config.media_root);

    Router::new()
        .route("/", get(posts::index))
        .route("/group/{slug}/", get(posts::group_list))
        .route("/profile/{username}/", get(posts::profile))
        .route(
            "/profile/{username}/follow/",
            get(posts::profile_follow).post(posts::profile_follow),
        )
        .route(
            "/profile/{username}/unfollow/",
            get(posts::profile_unfollow).post(posts::profile_unfollow),
        )
        .route("/posts/{post_id}/", get(posts::post_detail))
        .route(
            "/posts/{post_id}/edit/",
            get(posts::post_edit_form).post(posts::post_edit),
        )
        .route(
            "/posts/{post_id}/comment",
            get(posts::comment_redirect).post(posts::add_comment),
        )
        .route("/create/", get(posts::create_post_form).post(posts::create_post))
        .route("/follow/", get(posts::follow_index))
        .route("/about/author/", get(about::author))
        .route("/about/tech/", get(about::tech))
        .route("/auth/signup/", get(auth::signup_form).post(auth::signup))
        .route("/auth/login/", get(auth::login_form).post(auth::login))
        .route("/auth/logout/", get(auth::logout).post(auth::logout))
        .route("/healthz", get(healthz))
        .nest_service("/media", media)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "title": "Page not found", "path": uri.path() })),
    )
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
