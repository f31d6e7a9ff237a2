//! In-memory storage implementations
//!
//! Used when no database is configured and by the test suite. Compound
//! operations hold a single write lock for their whole duration, which gives
//! them the same atomicity as the conditional SQL in the Postgres backend.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{AdminStore, ReservationStore, SessionStore, StoreResult, UserStore};
use crate::{
    error::AppError,
    models::{
        admin::AdminUser,
        reservation::{ClaimResult, NewReservation, ReplaceOutcome, Reservation, ReservationFilter},
        user::User,
    },
};

fn read<T>(lock: &RwLock<T>) -> StoreResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| AppError::Internal("store lock poisoned".to_string()))
}

fn write<T>(lock: &RwLock<T>) -> StoreResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| AppError::Internal("store lock poisoned".to_string()))
}

/// In-memory user store
#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(read(&self.users)?.get(username).cloned())
    }

    async fn insert(&self, user: User) -> StoreResult<()> {
        let mut users = write(&self.users)?;
        if users.contains_key(&user.username) {
            return Err(AppError::Validation("Username already taken".to_string()));
        }
        users.insert(user.username.clone(), user);
        Ok(())
    }

    async fn update_password(&self, username: &str, password_hash: &str) -> StoreResult<bool> {
        let mut users = write(&self.users)?;
        match users.get_mut(username) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                user.temp = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// In-memory staff store
#[derive(Default)]
pub struct InMemoryAdminStore {
    admins: RwLock<HashMap<String, AdminUser>>,
}

impl InMemoryAdminStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AdminStore for InMemoryAdminStore {
    async fn find(&self, username: &str) -> StoreResult<Option<AdminUser>> {
        Ok(read(&self.admins)?.get(username).cloned())
    }

    async fn insert(&self, admin: AdminUser) -> StoreResult<()> {
        let mut admins = write(&self.admins)?;
        if admins.contains_key(&admin.username) {
            return Err(AppError::Validation("Admin already exists".to_string()));
        }
        admins.insert(admin.username.clone(), admin);
        Ok(())
    }
}

/// In-memory reservation store
#[derive(Default)]
pub struct InMemoryReservationStore {
    reservations: RwLock<Vec<Reservation>>,
}

impl InMemoryReservationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReservationStore for InMemoryReservationStore {
    async fn replace_active(&self, new: NewReservation) -> StoreResult<ReplaceOutcome> {
        let mut reservations = write(&self.reservations)?;

        let active = reservations
            .iter_mut()
            .find(|r| r.passenger == new.passenger && !r.finished);

        let cancelled = match active {
            Some(r) if r.picked => {
                return Err(AppError::Conflict(
                    "Active reservation has already been picked up".to_string(),
                ));
            }
            Some(r) => {
                r.finished = true;
                r.cancelled = true;
                Some(r.clone())
            }
            None => None,
        };

        let reservation = new.into_reservation();
        reservations.push(reservation.clone());

        Ok(ReplaceOutcome {
            reservation,
            cancelled,
        })
    }

    async fn list(&self, filter: &ReservationFilter) -> StoreResult<Vec<Reservation>> {
        let reservations = read(&self.reservations)?;
        // Insertion order is chronological.
        Ok(reservations
            .iter()
            .rev()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn current_assignment(&self, driver: &str) -> StoreResult<Option<Reservation>> {
        let reservations = read(&self.reservations)?;
        Ok(reservations
            .iter()
            .find(|r| r.picked && r.picked_driver == driver && !r.finished)
            .cloned())
    }

    async fn claim(&self, driver: &str, passenger: &str) -> StoreResult<ClaimResult> {
        let mut reservations = write(&self.reservations)?;

        if reservations
            .iter()
            .any(|r| r.picked && r.picked_driver == driver && !r.finished)
        {
            return Ok(ClaimResult::DriverBusy);
        }

        match reservations
            .iter_mut()
            .find(|r| r.passenger == passenger && !r.picked && !r.finished)
        {
            Some(r) => {
                r.picked = true;
                r.picked_driver = driver.to_string();
                Ok(ClaimResult::Claimed(r.clone()))
            }
            None => Ok(ClaimResult::Unavailable),
        }
    }

    async fn finish(&self, driver: &str) -> StoreResult<Option<Reservation>> {
        let mut reservations = write(&self.reservations)?;
        Ok(reservations
            .iter_mut()
            .find(|r| r.picked && r.picked_driver == driver && !r.finished)
            .map(|r| {
                r.finished = true;
                r.clone()
            }))
    }

    async fn ping(&self) -> StoreResult<()> {
        read(&self.reservations).map(|_| ())
    }
}

struct SessionEntry {
    username: String,
    expires_at: DateTime<Utc>,
}

/// In-memory session store with lazy expiry
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SessionEntry>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let now = Utc::now();
        Ok(read(&self.sessions)?
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.username.clone()))
    }

    async fn set(&self, key: &str, username: &str, expires_at: DateTime<Utc>) -> StoreResult<()> {
        let now = Utc::now();
        let mut sessions = write(&self.sessions)?;
        sessions.retain(|_, entry| entry.expires_at > now);
        sessions.insert(
            key.to_string(),
            SessionEntry {
                username: username.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        write(&self.sessions)?.remove(key);
        Ok(())
    }
}
