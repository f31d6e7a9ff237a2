//! Admin HTTP handlers.
//!
//! - POST /admin - Super-user or staff login
//! - POST /sudo - Create a staff account (super-token required)
//! - GET /admin/reservations - Inspect reservations (role `opt`)
//! - GET /admin/users/{username} - Inspect a user (role `mod`)

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tower_cookies::Cookies;

use crate::{
    error::AppError,
    extract::AppForm,
    middleware::auth::{SUPER_COOKIE, StaffContext, set_session_cookie},
    models::{
        admin::{
            AdminLoginRequest, AdminLoginResponse, AdminResponse, AdminSessionKind, Role,
            SudoRequest,
        },
        reservation::{Reservation, ReservationFilter},
        user::UserResponse,
    },
    services::{admin_service, auth_service::SessionKind, reservation_service},
    state::AppState,
};

/// Authenticate a super-user or staff member.
///
/// Super-users receive the `super_token` cookie (rotating the previous
/// one out); staff receive an `admin_token` session cookie.
pub async fn admin_login(
    State(state): State<AppState>,
    cookies: Cookies,
    AppForm(request): AppForm<AdminLoginRequest>,
) -> Result<Json<AdminLoginResponse>, AppError> {
    let login = admin_service::super_login(&state, &request.username, &request.password).await?;

    let cookie_name = match login.kind {
        AdminSessionKind::Super => SUPER_COOKIE,
        AdminSessionKind::Staff => SessionKind::Staff.cookie_name(),
    };
    set_session_cookie(&cookies, cookie_name, login.token);

    Ok(Json(AdminLoginResponse {
        kind: login.kind,
        username: login.username,
    }))
}

/// Create a staff account.
///
/// # Authentication
///
/// The `super_token` cookie must equal the current super-token; any older
/// token is rejected with 401.
///
/// # Response
///
/// - **Success (201 Created)**: the new admin (no password hash)
/// - **Error (400)**: unknown role, bad or taken username
/// - **Error (401)**: missing or stale super-token
pub async fn sudo(
    State(state): State<AppState>,
    cookies: Cookies,
    request: Result<AppForm<SudoRequest>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let token = cookies.get(SUPER_COOKIE).map(|c| c.value().to_string());
    admin_service::require_super(&state, token.as_deref())?;

    // Body errors only matter to the current super-token holder
    let AppForm(request) = request?;

    let admin =
        admin_service::create_admin(&state, &request.username, &request.password, &request.roles)
            .await?;

    Ok((StatusCode::CREATED, Json(AdminResponse::from(admin))))
}

pub async fn list_reservations(
    State(state): State<AppState>,
    Extension(staff): Extension<StaffContext>,
    Query(filter): Query<ReservationFilter>,
) -> Result<Json<Vec<Reservation>>, AppError> {
    admin_service::require_role(&state, &staff.username, Role::Opt).await?;
    Ok(Json(reservation_service::list(&state, &filter).await?))
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(staff): Extension<StaffContext>,
    Path(username): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    admin_service::require_role(&state, &staff.username, Role::Mod).await?;

    let user = state
        .stores
        .users
        .find(&username)
        .await?
        .ok_or_else(|| AppError::NotFound("Unknown user".to_string()))?;

    Ok(Json(user.into()))
}
