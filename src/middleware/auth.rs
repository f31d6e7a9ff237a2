//! Session-cookie authentication middleware.
//!
//! These middleware intercept every protected request to:
//! 1. Extract the session token from its cookie
//! 2. Resolve it through the session store (by digest)
//! 3. Inject the authenticated identity into the request
//! 4. Reject unauthenticated requests with HTTP 401

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tower_cookies::{Cookie, Cookies};

use crate::{
    error::AppError,
    models::user::Category,
    services::{
        admin_service,
        auth_service::{self, SessionKind},
    },
    state::AppState,
};

/// Cookie holding the super-token.
pub const SUPER_COOKIE: &str = "super_token";

/// Authenticated passenger or driver, inserted into request extensions.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub username: String,
    pub category: Category,
}

impl AuthContext {
    /// Fail with `Validation` unless the caller is of the given category.
    pub fn require(&self, category: Category) -> Result<(), AppError> {
        if self.category == category {
            Ok(())
        } else {
            Err(AppError::Validation(format!(
                "This action is only available to {category} accounts"
            )))
        }
    }
}

/// Authenticated staff member, inserted into request extensions.
///
/// Carries only the username; handlers check roles per endpoint.
#[derive(Debug, Clone)]
pub struct StaffContext {
    pub username: String,
}

/// User session middleware.
///
/// # Flow
///
/// 1. Read the `token` cookie
/// 2. Resolve it to a username (expired tokens resolve to nothing)
/// 3. Load the user to learn their category
/// 4. Inject `AuthContext` and call the next handler
pub async fn auth_middleware(
    State(state): State<AppState>,
    cookies: Cookies,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = cookies
        .get(SessionKind::User.cookie_name())
        .map(|c| c.value().to_string())
        .ok_or(AppError::Unauthenticated)?;

    let username = auth_service::resolve(&state, &token)
        .await?
        .ok_or(AppError::Unauthenticated)?;

    let user = state
        .stores
        .users
        .find(&username)
        .await?
        .ok_or(AppError::Unauthenticated)?;

    request.extensions_mut().insert(AuthContext {
        username: user.username,
        category: user.category,
    });

    Ok(next.run(request).await)
}

/// Staff session middleware, reading the `admin_token` cookie.
pub async fn staff_middleware(
    State(state): State<AppState>,
    cookies: Cookies,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = cookies
        .get(SessionKind::Staff.cookie_name())
        .map(|c| c.value().to_string())
        .ok_or(AppError::Unauthenticated)?;

    let username = admin_service::resolve_staff(&state, &token)
        .await?
        .ok_or(AppError::Unauthenticated)?;

    request.extensions_mut().insert(StaffContext { username });

    Ok(next.run(request).await)
}

/// Set an HttpOnly session cookie on the response.
pub fn set_session_cookie(cookies: &Cookies, name: &'static str, token: String) {
    let cookie = Cookie::build((name, token))
        .path("/")
        .http_only(true)
        .build();
    cookies.add(cookie);
}
