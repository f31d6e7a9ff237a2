//! User data models and API request/response types.
//!
//! This module defines:
//! - `Category`: the closed set of account kinds (driver, passenger)
//! - `User`: stored account record
//! - Request bodies for join, quick-join, login and password change

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Kind of account. Decides which endpoints a user may call and where
/// login lands them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Driver,
    Passenger,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Driver => "driver",
            Category::Passenger => "passenger",
        }
    }

    /// Path a freshly logged-in user is redirected to.
    pub fn landing_path(self) -> &'static str {
        match self {
            Category::Driver => "/pick",
            Category::Passenger => "/reserve",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "driver" => Ok(Category::Driver),
            "passenger" => Ok(Category::Passenger),
            other => Err(AppError::Validation(format!("Unknown category: {other}"))),
        }
    }
}

/// Represents a user account.
///
/// # Lifecycle
///
/// Created on join or quick-join, never deleted. Only the password hash
/// (and with it the `temp` flag) changes after creation.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique, lowercase login name
    pub username: String,

    /// Argon2 PHC string
    pub password_hash: String,

    pub category: Category,

    /// True for quick-signup accounts whose owner has not yet set a password
    pub temp: bool,

    pub created_at: DateTime<Utc>,
}

/// Row shape of the `users` table.
///
/// `category` is text in the database and is parsed into [`Category`] on load.
#[derive(Debug, sqlx::FromRow)]
pub struct UserRow {
    pub username: String,
    pub password_hash: String,
    pub category: String,
    pub temp: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let category = row.category.parse().map_err(|_| {
            AppError::Internal(format!(
                "user {} has unknown category {}",
                row.username, row.category
            ))
        })?;

        Ok(Self {
            username: row.username,
            password_hash: row.password_hash,
            category,
            temp: row.temp,
            created_at: row.created_at,
        })
    }
}

/// Form body for `POST /join`.
///
/// Every field is optional at the wire level so that a missing field
/// surfaces as a validation error rather than a decoding rejection.
#[derive(Debug, Default, Deserialize)]
pub struct JoinRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub confirm: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Form body for `POST /quick-join`.
#[derive(Debug, Deserialize)]
pub struct QuickJoinRequest {
    pub category: String,

    /// Where the generated credentials are delivered
    pub contact: String,
}

/// Form body for `POST /login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub category: String,
}

/// Form body for `POST /password`.
#[derive(Debug, Deserialize)]
pub struct PasswordChangeRequest {
    pub old_password: String,
    pub new_password: String,
    pub confirm: String,
}

/// Public view of a user (no password hash).
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub username: String,
    pub category: Category,
    pub temp: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            category: user.category,
            temp: user.temp,
            created_at: user.created_at,
        }
    }
}

/// Response body for `POST /quick-join`. The password travels out-of-band.
#[derive(Debug, Serialize)]
pub struct QuickJoinResponse {
    pub username: String,
}
