//! Admin authority: the process-wide super-token and role checks for staff.
//!
//! # Super-token
//!
//! Exactly one super-token is valid at a time. Every successful super-login
//! rotates it, which invalidates the previous holder. The slot keeps only the
//! token digest and a monotonic version, both updated under one lock.

use std::sync::RwLock;

use chrono::Utc;

use crate::{
    crypto,
    error::AppError,
    models::admin::{AdminSessionKind, AdminUser, Role, parse_roles},
    services::auth_service::{self, SessionKind},
    state::AppState,
};

#[derive(Default)]
struct SlotState {
    digest: Option<String>,
    version: u64,
}

/// Versioned single-slot store for the super-token.
#[derive(Default)]
pub struct SuperTokenSlot {
    inner: RwLock<SlotState>,
}

impl SuperTokenSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current token with a fresh one.
    ///
    /// Returns the new token and its version.
    pub fn rotate(&self) -> Result<(String, u64), AppError> {
        let token = crypto::generate_token();
        let mut slot = self
            .inner
            .write()
            .map_err(|_| AppError::Internal("super-token lock poisoned".to_string()))?;

        slot.version += 1;
        slot.digest = Some(crypto::hash_token(&token));

        Ok((token, slot.version))
    }

    /// Check a presented token against the current one.
    ///
    /// Returns the version of the matching token.
    pub fn verify(&self, token: &str) -> Result<u64, AppError> {
        let presented = crypto::hash_token(token);
        let slot = self
            .inner
            .read()
            .map_err(|_| AppError::Internal("super-token lock poisoned".to_string()))?;

        match slot.digest.as_deref() {
            Some(current) if current == presented => Ok(slot.version),
            _ => Err(AppError::Unauthenticated),
        }
    }

    pub fn version(&self) -> u64 {
        self.inner.read().map(|slot| slot.version).unwrap_or(0)
    }
}

/// Result of a successful `/admin` login.
#[derive(Debug, Clone)]
pub struct AdminLogin {
    pub kind: AdminSessionKind,
    pub username: String,
    pub token: String,
}

/// Authenticate a super-user or a staff member.
///
/// Allow-listed pairs rotate the super-token. Anything else is verified
/// against the staff store and receives a staff session.
pub async fn super_login(
    state: &AppState,
    username: &str,
    password: &str,
) -> Result<AdminLogin, AppError> {
    let is_super = state
        .settings
        .super_users
        .iter()
        .any(|c| c.username == username && c.password == password);

    if is_super {
        let (token, version) = state.super_token.rotate()?;
        tracing::info!(username = %username, version, "Super-token rotated");
        return Ok(AdminLogin {
            kind: AdminSessionKind::Super,
            username: username.to_string(),
            token,
        });
    }

    let admin = state
        .stores
        .admins
        .find(username)
        .await?
        .ok_or_else(|| AppError::NotFound("Unknown admin".to_string()))?;

    auth_service::verify_password(state, &admin.username, &admin.password_hash, password).await?;

    let token = auth_service::issue_session(state, SessionKind::Staff, &admin.username).await?;
    tracing::info!(username = %admin.username, "Staff login succeeded");

    Ok(AdminLogin {
        kind: AdminSessionKind::Staff,
        username: admin.username,
        token,
    })
}

/// Fail with `Unauthenticated` unless `token` is the current super-token.
pub fn require_super(state: &AppState, token: Option<&str>) -> Result<(), AppError> {
    let token = token.ok_or(AppError::Unauthenticated)?;
    state.super_token.verify(token).map(|_| ())
}

/// Resolve a staff session token to a username.
pub async fn resolve_staff(state: &AppState, token: &str) -> Result<Option<String>, AppError> {
    auth_service::resolve_session(state, SessionKind::Staff, token).await
}

/// Load the staff member and fail with `Forbidden` unless they hold `role`.
pub async fn require_role(
    state: &AppState,
    username: &str,
    role: Role,
) -> Result<AdminUser, AppError> {
    let admin = state
        .stores
        .admins
        .find(username)
        .await?
        .ok_or(AppError::Unauthenticated)?;

    if !admin.has_role(role) {
        tracing::info!(username = %username, role = %role, "Role check failed");
        return Err(AppError::Forbidden(format!("{role} role required")));
    }

    Ok(admin)
}

/// Create a staff account. Only reachable with the super-token.
///
/// # Errors
///
/// - `Validation`: unknown role, empty password, rejected or taken username
/// - `Format`: username with surrounding whitespace or uppercase letters
pub async fn create_admin(
    state: &AppState,
    username: &str,
    password: &str,
    roles: &str,
) -> Result<AdminUser, AppError> {
    if !auth_service::validate_username(username)? {
        return Err(AppError::Validation("Invalid admin username".to_string()));
    }
    if password.is_empty() {
        return Err(AppError::Validation("Password must not be empty".to_string()));
    }

    let roles = parse_roles(roles)?;

    if state.stores.admins.find(username).await?.is_some() {
        return Err(AppError::Validation("Admin already exists".to_string()));
    }

    let admin = AdminUser {
        username: username.to_string(),
        password_hash: auth_service::hash_password(state, password).await?,
        roles,
        created_at: Utc::now(),
    };
    state.stores.admins.insert(admin.clone()).await?;

    tracing::info!(username = %admin.username, roles = ?admin.roles, "Admin created");

    Ok(admin)
}
