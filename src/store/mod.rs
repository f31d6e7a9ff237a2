//! Storage abstractions.
//!
//! Every state transition that can race (claim, finish, replacing the
//! active reservation) is a single method here so that each backend can
//! perform it as one atomic conditional write.

pub mod memory;
pub mod postgres;

pub use memory::{
    InMemoryAdminStore, InMemoryReservationStore, InMemorySessionStore, InMemoryUserStore,
};
pub use postgres::{PgAdminStore, PgReservationStore, PgSessionStore, PgUserStore};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::{
        admin::AdminUser,
        reservation::{ClaimResult, NewReservation, ReplaceOutcome, Reservation, ReservationFilter},
        user::User,
    },
};

/// Result type for store operations
pub type StoreResult<T> = Result<T, AppError>;

/// Passenger and driver accounts
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find(&self, username: &str) -> StoreResult<Option<User>>;

    /// Insert a new user. Fails with `Validation` if the username is taken.
    async fn insert(&self, user: User) -> StoreResult<()>;

    /// Replace the password hash and clear the `temp` flag.
    ///
    /// Returns false if the user does not exist.
    async fn update_password(&self, username: &str, password_hash: &str) -> StoreResult<bool>;
}

/// Staff accounts
#[async_trait]
pub trait AdminStore: Send + Sync {
    async fn find(&self, username: &str) -> StoreResult<Option<AdminUser>>;

    /// Insert a new admin. Fails with `Validation` if the username is taken.
    async fn insert(&self, admin: AdminUser) -> StoreResult<()>;
}

/// Reservation records and their dispatch transitions
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Cancel the passenger's unpicked active reservation (if any) and insert
    /// the new one, atomically.
    ///
    /// Fails with `Conflict` if the active reservation has already been picked.
    async fn replace_active(&self, new: NewReservation) -> StoreResult<ReplaceOutcome>;

    /// Reservations matching the filter, newest first.
    async fn list(&self, filter: &ReservationFilter) -> StoreResult<Vec<Reservation>>;

    /// The driver's unfinished assignment, if any.
    async fn current_assignment(&self, driver: &str) -> StoreResult<Option<Reservation>>;

    /// Set `picked` and `picked_driver` on the passenger's reservation, but
    /// only if it is still unpicked and unfinished and the driver is idle.
    async fn claim(&self, driver: &str, passenger: &str) -> StoreResult<ClaimResult>;

    /// Set `finished` on the driver's unfinished assignment.
    ///
    /// Returns the finished reservation, or `None` if the driver was idle.
    async fn finish(&self, driver: &str) -> StoreResult<Option<Reservation>>;

    /// Connectivity check for the health endpoint.
    async fn ping(&self) -> StoreResult<()>;
}

/// Key-value store for session tokens with per-entry expiry.
///
/// Keys are token digests; values are usernames. Expired entries behave as absent.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    async fn set(&self, key: &str, username: &str, expires_at: DateTime<Utc>) -> StoreResult<()>;

    async fn delete(&self, key: &str) -> StoreResult<()>;
}
