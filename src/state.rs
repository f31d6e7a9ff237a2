//! Shared application state handed to every handler.

use std::sync::Arc;

use chrono::Duration;

use crate::{
    config::{Config, SuperCredential},
    crypto::PasswordHasher,
    db::DbPool,
    geocoding::Geocoder,
    notify::Notifier,
    services::admin_service::SuperTokenSlot,
    store::{
        AdminStore, InMemoryAdminStore, InMemoryReservationStore, InMemorySessionStore,
        InMemoryUserStore, PgAdminStore, PgReservationStore, PgSessionStore, PgUserStore,
        ReservationStore, SessionStore, UserStore,
    },
};

/// Persistence backends.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub admins: Arc<dyn AdminStore>,
    pub reservations: Arc<dyn ReservationStore>,
    pub sessions: Arc<dyn SessionStore>,
}

impl Stores {
    pub fn postgres(pool: DbPool) -> Self {
        Self {
            users: Arc::new(PgUserStore::new(pool.clone())),
            admins: Arc::new(PgAdminStore::new(pool.clone())),
            reservations: Arc::new(PgReservationStore::new(pool.clone())),
            sessions: Arc::new(PgSessionStore::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(InMemoryUserStore::new()),
            admins: Arc::new(InMemoryAdminStore::new()),
            reservations: Arc::new(InMemoryReservationStore::new()),
            sessions: Arc::new(InMemorySessionStore::new()),
        }
    }
}

/// Tunables taken from [`Config`].
#[derive(Debug, Clone)]
pub struct Settings {
    pub session_ttl: Duration,
    pub departure_offset: Duration,
    pub super_users: Vec<SuperCredential>,
}

impl Settings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            session_ttl: Duration::hours(config.session_ttl_hours),
            departure_offset: Duration::minutes(config.departure_offset_minutes),
            super_users: config.super_credentials(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            session_ttl: Duration::hours(24),
            departure_offset: Duration::minutes(5),
            super_users: Vec::new(),
        }
    }
}

/// Application state, cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub stores: Stores,
    pub hasher: Arc<dyn PasswordHasher>,
    pub geocoder: Arc<dyn Geocoder>,
    pub notifier: Arc<dyn Notifier>,
    pub super_token: Arc<SuperTokenSlot>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(
        stores: Stores,
        hasher: Arc<dyn PasswordHasher>,
        geocoder: Arc<dyn Geocoder>,
        notifier: Arc<dyn Notifier>,
        settings: Settings,
    ) -> Self {
        Self {
            stores,
            hasher,
            geocoder,
            notifier,
            super_token: Arc::new(SuperTokenSlot::new()),
            settings: Arc::new(settings),
        }
    }
}
