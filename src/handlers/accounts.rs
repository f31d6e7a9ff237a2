//! Account HTTP handlers.
//!
//! This module implements the account-related endpoints:
//! - POST /join - Create a permanent account
//! - POST /quick-join - Create a temporary account with generated credentials
//! - POST /login - Exchange credentials for a session cookie
//! - GET /me - Current identity
//! - POST /password - Change password

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect},
};
use tower_cookies::Cookies;

use crate::{
    error::AppError,
    extract::AppForm,
    middleware::auth::{AuthContext, set_session_cookie},
    models::user::{
        JoinRequest, LoginRequest, PasswordChangeRequest, QuickJoinRequest, QuickJoinResponse,
        UserResponse,
    },
    services::auth_service::{self, SessionKind},
    state::AppState,
};

/// Create a permanent account.
///
/// # Endpoint
///
/// `POST /join` with form fields `username`, `password`, `confirm`, `category`
///
/// # Response
///
/// - **Success (303)**: redirect to `/login`
/// - **Error (400)**: missing fields, bad username, mismatched passwords,
///   unknown category or taken username
pub async fn join(
    State(state): State<AppState>,
    AppForm(request): AppForm<JoinRequest>,
) -> Result<Redirect, AppError> {
    auth_service::register(&state, request).await?;
    Ok(Redirect::to("/login"))
}

/// Create a temporary account; credentials are sent to `contact`.
///
/// Returns 201 with the generated username only.
pub async fn quick_join(
    State(state): State<AppState>,
    AppForm(request): AppForm<QuickJoinRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = auth_service::quick_register(&state, &request.category, &request.contact).await?;

    Ok((
        StatusCode::CREATED,
        Json(QuickJoinResponse {
            username: user.username,
        }),
    ))
}

/// Log in.
///
/// # Endpoint
///
/// `POST /login` with form fields `username`, `password`, `category`
///
/// # Response
///
/// - **Success (303)**: sets the `token` cookie and redirects to `/reserve`
///   (passengers) or `/pick` (drivers)
/// - **Error (401)**: wrong password
/// - **Error (404)**: unknown user
/// - **Error (500)**: stored credentials are corrupt
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    AppForm(request): AppForm<LoginRequest>,
) -> Result<Redirect, AppError> {
    let session = auth_service::login(
        &state,
        &request.username,
        &request.password,
        &request.category,
    )
    .await?;

    set_session_cookie(&cookies, SessionKind::User.cookie_name(), session.token);

    Ok(Redirect::to(session.user.category.landing_path()))
}

/// Current identity.
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state
        .stores
        .users
        .find(&auth.username)
        .await?
        .ok_or(AppError::Unauthenticated)?;

    Ok(Json(user.into()))
}

/// Change password. Clears the temporary flag of quick-signup accounts.
///
/// Returns 204 on success.
pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppForm(request): AppForm<PasswordChangeRequest>,
) -> Result<StatusCode, AppError> {
    auth_service::change_password(
        &state,
        &auth.username,
        &request.old_password,
        &request.new_password,
        &request.confirm,
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}
