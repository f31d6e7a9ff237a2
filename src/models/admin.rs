//! Staff account models.
//!
//! Staff accounts carry a set of roles drawn from a closed enumeration and
//! are only ever created by the holder of the super-token.

use std::{collections::BTreeSet, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Staff role.
///
/// - `Dev`: developer
/// - `Mod`: moderator, may inspect user accounts
/// - `Adm`: administrator
/// - `Opt`: operator, may inspect reservations
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Dev,
    Mod,
    Adm,
    Opt,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Dev => "dev",
            Role::Mod => "mod",
            Role::Adm => "adm",
            Role::Opt => "opt",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dev" => Ok(Role::Dev),
            "mod" => Ok(Role::Mod),
            "adm" => Ok(Role::Adm),
            "opt" => Ok(Role::Opt),
            other => Err(AppError::Validation(format!("Unknown role: {other}"))),
        }
    }
}

/// Parse a comma- or whitespace-separated role list.
///
/// Duplicates collapse; any unknown role rejects the whole list.
pub fn parse_roles(raw: &str) -> Result<BTreeSet<Role>, AppError> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(str::parse)
        .collect()
}

/// Represents a staff account.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub username: String,
    pub password_hash: String,
    pub roles: BTreeSet<Role>,
    pub created_at: DateTime<Utc>,
}

impl AdminUser {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

/// Row shape of the `admins` table (`roles` is `TEXT[]`).
#[derive(Debug, sqlx::FromRow)]
pub struct AdminRow {
    pub username: String,
    pub password_hash: String,
    pub roles: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<AdminRow> for AdminUser {
    type Error = AppError;

    fn try_from(row: AdminRow) -> Result<Self, Self::Error> {
        let roles = row
            .roles
            .iter()
            .map(|r| r.parse())
            .collect::<Result<BTreeSet<Role>, _>>()
            .map_err(|_| {
                AppError::Internal(format!("admin {} has an unknown role", row.username))
            })?;

        Ok(Self {
            username: row.username,
            password_hash: row.password_hash,
            roles,
            created_at: row.created_at,
        })
    }
}

/// Form body for `POST /sudo`.
#[derive(Debug, Deserialize)]
pub struct SudoRequest {
    pub username: String,
    pub password: String,

    /// Comma-separated roles, e.g. `dev,opt`
    #[serde(default)]
    pub roles: String,
}

/// Form body for `POST /admin`.
#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AdminResponse {
    pub username: String,
    pub roles: BTreeSet<Role>,
    pub created_at: DateTime<Utc>,
}

impl From<AdminUser> for AdminResponse {
    fn from(admin: AdminUser) -> Self {
        Self {
            username: admin.username,
            roles: admin.roles,
            created_at: admin.created_at,
        }
    }
}

/// Which kind of elevated session an `/admin` login produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminSessionKind {
    Super,
    Staff,
}

#[derive(Debug, Serialize)]
pub struct AdminLoginResponse {
    pub kind: AdminSessionKind,
    pub username: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_roles_accepts_subsets() {
        let roles = parse_roles("opt, dev,opt").unwrap();
        assert_eq!(roles.into_iter().collect::<Vec<_>>(), vec![Role::Dev, Role::Opt]);
        assert!(parse_roles("").unwrap().is_empty());
    }

    #[test]
    fn parse_roles_rejects_unknown() {
        assert!(matches!(
            parse_roles("dev,root"),
            Err(AppError::Validation(_))
        ));
        assert!(parse_roles("DEV").is_err());
    }
}
