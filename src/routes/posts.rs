//! Post routes — listings, detail, create/edit, comments, and follows.
//!
//! DESIGN
//! ======
//! Every page is a JSON context document: a `title` plus whatever the page
//! renders. Mutations answer with a `303` redirect to the page that shows
//! the result. Invalid forms are returned as the form page with errors
//! (status 200) so the client can re-render them.
//!
//! The index page is cached per resolved page number; see `crate::cache`.

use axum::extract::rejection::FormRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Redirect, Response};
use axum::Form;
use serde::{Deserialize, Serialize};

use crate::pagination::Page;
use crate::routes::auth::{AuthUser, MaybeUser};
use crate::routes::forms::{
    CommentForm, FormErrors, FormView, PostFormInput, PostFormValues, ValidPostForm, comment_form_view,
    post_form_view, validate_post_form,
};
use crate::services::account::{self, AccountError, UserRow};
use crate::services::comment::{self, CommentError, CommentRow};
use crate::services::follow::{self, FollowError};
use crate::services::group::{self, GroupError, GroupRow};
use crate::services::media::{self, MediaError};
use crate::services::post::{self, ImageChange, PostDraft, PostError, PostFilter, PostRow, PostUpdate};
use crate::state::AppState;

/// Characters of post text used in the detail page title.
const TITLE_CHARS: usize = 30;

// =============================================================================
// ERROR MAPPING
// =============================================================================

pub(crate) fn post_error_to_status(err: PostError) -> StatusCode {
    match err {
        PostError::NotFound(_) => StatusCode::NOT_FOUND,
        PostError::Forbidden(_) => StatusCode::FORBIDDEN,
        PostError::Database(e) => {
            tracing::error!(error = %e, "post query failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub(crate) fn group_error_to_status(err: GroupError) -> StatusCode {
    match err {
        GroupError::NotFound(_) => StatusCode::NOT_FOUND,
        other => {
            tracing::error!(error = %other, "group query failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub(crate) fn account_error_to_status(err: AccountError) -> StatusCode {
    tracing::error!(error = %err, "account query failed");
    StatusCode::INTERNAL_SERVER_ERROR
}

pub(crate) fn comment_error_to_status(err: CommentError) -> StatusCode {
    match err {
        CommentError::PostNotFound(_) => StatusCode::NOT_FOUND,
        CommentError::Database(e) => {
            tracing::error!(error = %e, "comment query failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub(crate) fn follow_error_to_status(err: FollowError) -> StatusCode {
    match err {
        FollowError::SelfFollow => StatusCode::BAD_REQUEST,
        FollowError::Database(e) => {
            tracing::error!(error = %e, "follow query failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub(crate) fn media_error_to_status(err: MediaError) -> StatusCode {
    match err {
        MediaError::NotAnImage | MediaError::TooLarge { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        MediaError::Io(e) => {
            tracing::error!(error = %e, "image storage failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
        MediaError::Task(e) => {
            tracing::error!(error = %e, "image check task failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Post ids in paths are numeric; anything else is simply not a post.
pub(crate) fn parse_post_id(raw: &str) -> Result<i64, StatusCode> {
    raw.parse::<i64>().map_err(|_| StatusCode::NOT_FOUND)
}

fn post_detail_url(post_id: i64) -> String {
    format!("/posts/{post_id}/")
}

fn profile_url(username: &str) -> String {
    format!("/profile/{}/", urlencoding::encode(username))
}

async fn find_author(state: &AppState, username: &str) -> Result<UserRow, StatusCode> {
    account::find_by_username(&state.pool, username)
        .await
        .map_err(account_error_to_status)?
        .ok_or(StatusCode::NOT_FOUND)
}

// =============================================================================
// PAGES
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

/// Index and follow feed.
#[derive(Debug, Clone, Serialize)]
pub struct ListingPage {
    pub title: String,
    pub page_obj: Page<PostRow>,
}

#[derive(Debug, Serialize)]
pub struct GroupPage {
    pub title: &'static str,
    pub group: GroupRow,
    pub page_obj: Page<PostRow>,
}

#[derive(Debug, Serialize)]
pub struct ProfilePage {
    pub title: &'static str,
    /// The profile owner.
    pub client: UserRow,
    pub num: i64,
    /// Only present for logged-in viewers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub following: Option<bool>,
    pub page_obj: Page<PostRow>,
}

#[derive(Debug, Serialize)]
pub struct PostDetailPage {
    pub title: String,
    pub post: PostRow,
    pub num: i64,
    pub comments: Vec<CommentRow>,
    pub form: FormView,
}

#[derive(Debug, Serialize)]
pub struct PostFormPage {
    pub title: &'static str,
    pub is_edit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_id: Option<i64>,
    pub form: FormView,
}

impl PostFormPage {
    fn create(form: FormView) -> Self {
        Self { title: "New post", is_edit: false, post_id: None, form }
    }

    fn edit(post_id: i64, form: FormView) -> Self {
        Self { title: "Edit post", is_edit: true, post_id: Some(post_id), form }
    }
}

// =============================================================================
// LISTINGS
// =============================================================================

/// `GET /` — all posts, newest first.
///
/// The count query always runs so that `?page=` resolves against the real
/// listing; only the page fetch is served from the cache.
pub async fn index(State(state): State<AppState>, Query(query): Query<PageQuery>) -> Result<Json<ListingPage>, StatusCode> {
    let count = post::count_posts(&state.pool, PostFilter::All)
        .await
        .map_err(post_error_to_status)?;
    let window = state.paginator().window(query.page.as_deref(), count);
    if let Some(cached) = state.index_cache.get(&window.number).await {
        return Ok(Json(cached));
    }

    let rows = post::list_posts(&state.pool, PostFilter::All, &window)
        .await
        .map_err(post_error_to_status)?;
    let page = ListingPage { title: "Latest updates".into(), page_obj: window.into_page(rows) };

    state.index_cache.insert(window.number, page.clone()).await;
    Ok(Json(page))
}

/// `GET /group/{slug}/`
pub async fn group_list(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<GroupPage>, StatusCode> {
    let group = group::get_by_slug(&state.pool, &slug)
        .await
        .map_err(group_error_to_status)?;
    let page_obj = post::paginate(&state.pool, PostFilter::Group(group.id), state.paginator(), query.page.as_deref())
        .await
        .map_err(post_error_to_status)?;

    Ok(Json(GroupPage { title: "Community posts", group, page_obj }))
}

/// `GET /profile/{username}/`
pub async fn profile(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ProfilePage>, StatusCode> {
    let author = find_author(&state, &username).await?;
    let page_obj = post::paginate(&state.pool, PostFilter::Author(author.id), state.paginator(), query.page.as_deref())
        .await
        .map_err(post_error_to_status)?;

    let following = match viewer {
        Some(viewer) => Some(
            follow::is_following(&state.pool, viewer.id, author.id)
                .await
                .map_err(follow_error_to_status)?,
        ),
        None => None,
    };

    Ok(Json(ProfilePage { title: "User profile", num: page_obj.count, client: author, following, page_obj }))
}

/// `GET /follow/` — posts by authors the current user follows.
pub async fn follow_index(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<ListingPage>, StatusCode> {
    let page_obj = post::paginate(&state.pool, PostFilter::FollowedBy(auth.user.id), state.paginator(), query.page.as_deref())
        .await
        .map_err(post_error_to_status)?;

    Ok(Json(ListingPage { title: format!("Subscriptions of {}", auth.user.username), page_obj }))
}

// =============================================================================
// POST DETAIL + COMMENTS
// =============================================================================

/// `GET /posts/{post_id}/`
pub async fn post_detail(State(state): State<AppState>, Path(post_id): Path<String>) -> Result<Json<PostDetailPage>, StatusCode> {
    let post_id = parse_post_id(&post_id)?;
    let post = post::get_post(&state.pool, post_id)
        .await
        .map_err(post_error_to_status)?;
    let num = post::count_by_author(&state.pool, post.author.id)
        .await
        .map_err(post_error_to_status)?;
    let comments = comment::list_for_post(&state.pool, post_id)
        .await
        .map_err(comment_error_to_status)?;

    Ok(Json(PostDetailPage {
        title: format!("Post {}", post::truncate_chars(&post.text, TITLE_CHARS)),
        post,
        num,
        comments,
        form: comment_form_view(),
    }))
}

/// `POST /posts/{post_id}/comment` — invalid comments are dropped silently.
pub async fn add_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(post_id): Path<String>,
    form: Result<Form<CommentForm>, FormRejection>,
) -> Result<Redirect, StatusCode> {
    let post_id = parse_post_id(&post_id)?;
    let text = form.ok().and_then(|Form(form)| form.validate().ok());

    match text {
        Some(text) => {
            let created = comment::add_comment(&state.pool, post_id, auth.user.id, &text)
                .await
                .map_err(comment_error_to_status)?;
            tracing::info!(post_id, comment_id = created.id, author = %auth.user.username, "comment added");
        }
        None => {
            post::get_post(&state.pool, post_id)
                .await
                .map_err(post_error_to_status)?;
        }
    }

    Ok(Redirect::to(&post_detail_url(post_id)))
}

/// `GET /posts/{post_id}/comment` — nothing to show; back to the post.
pub async fn comment_redirect(_auth: AuthUser, Path(post_id): Path<String>) -> Result<Redirect, StatusCode> {
    let post_id = parse_post_id(&post_id)?;
    Ok(Redirect::to(&post_detail_url(post_id)))
}

// =============================================================================
// CREATE / EDIT
// =============================================================================

async fn load_groups(state: &AppState) -> Result<Vec<GroupRow>, StatusCode> {
    group::list_groups(&state.pool).await.map_err(group_error_to_status)
}

/// `GET /create/`
pub async fn create_post_form(State(state): State<AppState>, _auth: AuthUser) -> Result<Json<PostFormPage>, StatusCode> {
    let groups = load_groups(&state).await?;
    let form = post_form_view(&groups, PostFormValues::default(), FormErrors::default());
    Ok(Json(PostFormPage::create(form)))
}

/// `POST /create/` — save and go to the author's profile.
pub async fn create_post(State(state): State<AppState>, auth: AuthUser, input: PostFormInput) -> Result<Response, StatusCode> {
    let groups = load_groups(&state).await?;
    let valid = match validate_post_form(&input, &groups, state.config.max_upload_bytes).await {
        Ok(valid) => valid,
        Err(errors) => {
            let form = post_form_view(&groups, PostFormValues::from(&input), errors);
            return Ok(Json(PostFormPage::create(form)).into_response());
        }
    };

    let image = match &valid.image {
        Some(upload) => Some(
            media::store_image(&state.config.media_root, &upload.bytes, upload.kind)
                .await
                .map_err(media_error_to_status)?,
        ),
        None => None,
    };

    let draft = PostDraft { text: valid.text, group_id: valid.group_id, image };
    let created = match post::create_post(&state.pool, auth.user.id, &draft).await {
        Ok(created) => created,
        Err(e) => {
            if let Some(path) = &draft.image {
                media::remove_image(&state.config.media_root, path).await;
            }
            return Err(post_error_to_status(e));
        }
    };

    tracing::info!(post_id = created.id, author = %auth.user.username, "post created");
    Ok(Redirect::to(&profile_url(&auth.user.username)).into_response())
}

/// `GET /posts/{post_id}/edit/` — non-authors are sent to the post.
pub async fn post_edit_form(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(post_id): Path<String>,
) -> Result<Response, StatusCode> {
    let post_id = parse_post_id(&post_id)?;
    let existing = post::get_post(&state.pool, post_id)
        .await
        .map_err(post_error_to_status)?;
    if existing.author.id != auth.user.id {
        return Ok(Redirect::to(&post_detail_url(post_id)).into_response());
    }

    let groups = load_groups(&state).await?;
    let values = PostFormValues {
        text: Some(existing.text),
        group: existing.group.map(|g| g.id.to_string()),
        image_url: existing.image.as_deref().map(media::media_url),
    };
    let form = post_form_view(&groups, values, FormErrors::default());
    Ok(Json(PostFormPage::edit(post_id, form)).into_response())
}

/// `POST /posts/{post_id}/edit/` — only the author's edits are applied.
pub async fn post_edit(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(post_id): Path<String>,
    input: PostFormInput,
) -> Result<Response, StatusCode> {
    let post_id = parse_post_id(&post_id)?;
    let existing = post::get_post(&state.pool, post_id)
        .await
        .map_err(post_error_to_status)?;
    if existing.author.id != auth.user.id {
        tracing::warn!(post_id, user = %auth.user.username, "edit by non-author ignored");
        return Ok(Redirect::to(&post_detail_url(post_id)).into_response());
    }

    let groups = load_groups(&state).await?;
    let valid = match validate_post_form(&input, &groups, state.config.max_upload_bytes).await {
        Ok(valid) => valid,
        // Stays on the form (200) with the errors; nothing is saved.
        Err(errors) => {
            let mut values = PostFormValues::from(&input);
            values.image_url = existing.image.as_deref().map(media::media_url);
            let form = post_form_view(&groups, values, errors);
            return Ok(Json(PostFormPage::edit(post_id, form)).into_response());
        }
    };

    save_post_edit(&state, &existing, auth.user.id, valid).await?;
    tracing::info!(post_id, author = %auth.user.username, "post edited");
    Ok(Redirect::to(&post_detail_url(post_id)).into_response())
}

/// Apply a validated edit to `existing`, keeping `MEDIA_ROOT` in step with
/// the `image` column: a new upload wins over `clear_image`, the old file is
/// removed once the row no longer points at it, and a freshly stored file
/// is removed again if the update fails.
pub(crate) async fn save_post_edit(
    state: &AppState,
    existing: &PostRow,
    editor_id: uuid::Uuid,
    valid: ValidPostForm,
) -> Result<PostRow, StatusCode> {
    let media_root = &state.config.media_root;
    let image = match (&valid.image, valid.clear_image) {
        (Some(upload), _) => ImageChange::Replace(
            media::store_image(media_root, &upload.bytes, upload.kind)
                .await
                .map_err(media_error_to_status)?,
        ),
        (None, true) => ImageChange::Clear,
        (None, false) => ImageChange::Keep,
    };

    let update = PostUpdate { text: valid.text, group_id: valid.group_id, image };
    match post::update_post(&state.pool, existing.id, editor_id, &update).await {
        Ok(updated) => {
            if !matches!(update.image, ImageChange::Keep) {
                if let Some(old) = &existing.image {
                    media::remove_image(media_root, old).await;
                }
            }
            Ok(updated)
        }
        Err(e) => {
            if let ImageChange::Replace(path) = &update.image {
                media::remove_image(media_root, path).await;
            }
            Err(post_error_to_status(e))
        }
    }
}

// =============================================================================
// FOLLOW
// =============================================================================

/// `GET|POST /profile/{username}/follow/`
pub async fn profile_follow(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(username): Path<String>,
) -> Result<Redirect, StatusCode> {
    let author = find_author(&state, &username).await?;
    match follow::follow(&state.pool, auth.user.id, author.id).await {
        Ok(change) => tracing::debug!(?change, follower = %auth.user.username, author = %author.username, "follow"),
        Err(FollowError::SelfFollow) => {}
        Err(e) => return Err(follow_error_to_status(e)),
    }
    Ok(Redirect::to(&profile_url(&author.username)))
}

/// `GET|POST /profile/{username}/unfollow/`
pub async fn profile_unfollow(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(username): Path<String>,
) -> Result<Redirect, StatusCode> {
    let author = find_author(&state, &username).await?;
    let change = follow::unfollow(&state.pool, auth.user.id, author.id)
        .await
        .map_err(follow_error_to_status)?;
    tracing::debug!(?change, follower = %auth.user.username, author = %author.username, "unfollow");
    Ok(Redirect::to(&profile_url(&author.username)))
}

#[cfg(test)]
#[path = "posts_test.rs"]
mod tests;
