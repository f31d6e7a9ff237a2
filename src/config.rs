//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (optional): PostgreSQL connection string; in-memory stores when unset
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `SUPER_USERS` (optional): comma-separated `username:password` allow-list
/// - `GEOCODER_URL` (optional): Nominatim-compatible base URL
/// - `GEOCODER_USER_AGENT` (optional): User-Agent sent to the geocoder
/// - `SESSION_TTL_HOURS` (optional): session lifetime, defaults to 24
/// - `DEPARTURE_OFFSET_MINUTES` (optional): default departure offset, defaults to 5
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: Option<String>,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default)]
    pub super_users: String,

    #[serde(default = "default_geocoder_url")]
    pub geocoder_url: String,

    #[serde(default = "default_geocoder_user_agent")]
    pub geocoder_user_agent: String,

    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,

    #[serde(default = "default_departure_offset_minutes")]
    pub departure_offset_minutes: i64,
}

/// A username/password pair allowed to obtain the super-token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuperCredential {
    pub username: String,
    pub password: String,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_geocoder_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_geocoder_user_agent() -> String {
    concat!("ride_dispatch_server/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_session_ttl_hours() -> i64 {
    24
}

fn default_departure_offset_minutes() -> i64 {
    5
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if environment variable values cannot be parsed into
    /// expected types.
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();

        envy::from_env::<Config>()
    }

    /// Parse the `SUPER_USERS` allow-list.
    ///
    /// Entries without a `:` separator or with an empty half are skipped.
    pub fn super_credentials(&self) -> Vec<SuperCredential> {
        parse_super_users(&self.super_users)
    }
}

fn parse_super_users(raw: &str) -> Vec<SuperCredential> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| match entry.split_once(':') {
            Some((username, password)) if !username.is_empty() && !password.is_empty() => {
                Some(SuperCredential {
                    username: username.to_string(),
                    password: password.to_string(),
                })
            }
            _ => {
                tracing::warn!("Skipping malformed SUPER_USERS entry");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_super_user_pairs() {
        let parsed = parse_super_users("root:hunter2, ops:pa:ss ,broken,:nope,");
        assert_eq!(
            parsed,
            vec![
                SuperCredential {
                    username: "root".into(),
                    password: "hunter2".into(),
                },
                SuperCredential {
                    username: "ops".into(),
                    password: "pa:ss".into(),
                },
            ]
        );
    }

    #[test]
    fn empty_allow_list() {
        assert!(parse_super_users("").is_empty());
    }
}
