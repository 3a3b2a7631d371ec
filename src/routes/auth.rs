//! Auth routes — signup, login, logout, and the session extractors.
//!
//! DESIGN
//! ======
//! Login state is a random token in an HttpOnly `session_token` cookie;
//! only its hash is stored server-side. `AuthUser` guards login-required
//! handlers: anonymous callers are redirected to the login page with the
//! requested path in `?next=` so they land back where they started.

use axum::extract::{FromRef, FromRequestParts, Query, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Json, Redirect, Response};
use axum::Form;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::routes::forms::{CredentialsForm, FormErrors, FormView, credentials_form_view, safe_next};
use crate::services::account::{self, AccountError};
use crate::services::session::{self, SessionUser};
use crate::state::AppState;

pub const COOKIE_NAME: &str = "session_token";
pub const LOGIN_URL: &str = "/auth/login/";

const INVALID_LOGIN: &str = "Please enter a correct username and password.";

/// Login URL that returns the user to `path_and_query` afterwards.
#[must_use]
pub fn login_redirect(path_and_query: &str) -> String {
    let next = urlencoding::encode(path_and_query).replace("%2F", "/");
    format!("{LOGIN_URL}?next={next}")
}

fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::days(session::SESSION_TTL_DAYS))
        .build()
}

fn clear_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::ZERO)
        .build()
}

fn session_token(parts: &Parts) -> Option<String> {
    let jar = CookieJar::from_headers(&parts.headers);
    jar.get(COOKIE_NAME)
        .map(Cookie::value)
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
}

// =============================================================================
// EXTRACTORS
// =============================================================================

/// Authenticated user extracted from the session cookie.
/// Use as a handler parameter to require login.
pub struct AuthUser {
    pub user: SessionUser,
    pub token: String,
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let to_login = || {
            let target = parts.uri.path_and_query().map_or_else(|| parts.uri.path(), |pq| pq.as_str());
            Redirect::to(&login_redirect(target)).into_response()
        };

        let Some(token) = session_token(parts) else {
            return Err(to_login());
        };

        let app_state = AppState::from_ref(state);
        let user = session::validate_session(&app_state.pool, &token)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "session lookup failed");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            })?;

        match user {
            Some(user) => Ok(Self { user, token }),
            None => Err(to_login()),
        }
    }
}

/// The logged-in user if there is one. Never redirects.
pub struct MaybeUser(pub Option<SessionUser>);

impl<S> FromRequestParts<S> for MaybeUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Some(token) = session_token(parts) else {
            return Ok(Self(None));
        };
        let app_state = AppState::from_ref(state);
        session::validate_session(&app_state.pool, &token)
            .await
            .map(Self)
            .map_err(|e| {
                tracing::error!(error = %e, "session lookup failed");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            })
    }
}

// =============================================================================
// PAGES
// =============================================================================

#[derive(Debug, Serialize)]
pub struct AuthPage {
    pub title: &'static str,
    pub form: FormView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

fn login_page(username: Option<String>, errors: FormErrors, next: Option<String>) -> AuthPage {
    AuthPage { title: "Log in", form: credentials_form_view(username, errors), next }
}

fn signup_page(username: Option<String>, errors: FormErrors, next: Option<String>) -> AuthPage {
    AuthPage { title: "Sign up", form: credentials_form_view(username, errors), next }
}

async fn start_session(state: &AppState, jar: CookieJar, user_id: uuid::Uuid, target: &str) -> Response {
    match session::create_session(&state.pool, user_id).await {
        Ok(token) => {
            let jar = jar.add(session_cookie(token, state.config.cookie_secure));
            (jar, Redirect::to(target)).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "session creation failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `GET /auth/signup/`
pub async fn signup_form(Query(query): Query<NextQuery>) -> Json<AuthPage> {
    Json(signup_page(None, FormErrors::default(), query.next))
}

/// `POST /auth/signup/` — create the account, log in, follow `next`.
pub async fn signup(State(state): State<AppState>, jar: CookieJar, Form(form): Form<CredentialsForm>) -> Response {
    let user = match account::create_user(&state.pool, &form.username, &form.password).await {
        Ok(user) => user,
        Err(AccountError::Database(e)) => {
            tracing::error!(error = %e, "signup failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
        Err(AccountError::Hash(e)) => {
            tracing::error!(error = %e, "password hashing failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
        Err(e) => {
            let field = if matches!(e, AccountError::WeakPassword) { "password" } else { "username" };
            let errors = FormErrors::single(field, e.to_string());
            return Json(signup_page(Some(form.username), errors, form.next)).into_response();
        }
    };

    tracing::info!(username = %user.username, "account created");
    start_session(&state, jar, user.id, &safe_next(form.next.as_deref())).await
}

/// `GET /auth/login/`
pub async fn login_form(Query(query): Query<NextQuery>) -> Json<AuthPage> {
    Json(login_page(None, FormErrors::default(), query.next))
}

/// `POST /auth/login/` — check credentials, set the cookie, follow `next`.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<NextQuery>,
    Form(form): Form<CredentialsForm>,
) -> Response {
    let next = form.next.clone().or(query.next);
    match account::authenticate(&state.pool, &form.username, &form.password).await {
        Ok(Some(user)) => start_session(&state, jar, user.id, &safe_next(next.as_deref())).await,
        Ok(None) => {
            let errors = FormErrors::single(FormErrors::NON_FIELD, INVALID_LOGIN);
            Json(login_page(Some(form.username), errors, next)).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "login failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `GET|POST /auth/logout/` — drop the session if any and clear the cookie.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> Response {
    if let Some(token) = jar.get(COOKIE_NAME).map(Cookie::value).filter(|t| !t.is_empty()) {
        if let Err(e) = session::delete_session(&state.pool, token).await {
            tracing::warn!(error = %e, "session delete failed");
        }
    }
    let jar = jar.add(clear_cookie(state.config.cookie_secure));
    (jar, Redirect::to("/")).into_response()
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
