//! Ride-hailing dispatch backend.
//!
//! Passengers reserve trips, drivers browse and claim them, and staff
//! accounts with roles inspect the system. See `main.rs` for startup.

pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod extract;
pub mod geocoding;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod notify;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;

pub use routes::create_router;
pub use state::{AppState, Settings, Stores};

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Arc, RwLock};

    use async_trait::async_trait;

    use crate::{
        crypto::Argon2Hasher,
        error::AppError,
        geocoding::{Geocoder, Place},
        models::reservation::GeoPoint,
        notify::Notifier,
        state::{AppState, Settings, Stores},
    };

    /// Resolves every address except `"nowhere"` to a fixed point.
    #[derive(Default)]
    pub struct StubGeocoder;

    #[async_trait]
    impl Geocoder for StubGeocoder {
        async fn forward(&self, address: &str) -> Result<Option<Place>, AppError> {
            if address == "nowhere" {
                return Ok(None);
            }
            Ok(Some(Place {
                location: GeoPoint { lon: 10.0, lat: 50.0 },
                address: format!("{address}, Springfield"),
            }))
        }

        async fn reverse(&self, lat: f64, lon: f64) -> Result<Option<String>, AppError> {
            Ok(Some(format!("{lat}, {lon}")))
        }
    }

    /// Captures (recipient, message) pairs.
    #[derive(Default, Clone)]
    pub struct Outbox {
        sent: Arc<RwLock<Vec<(String, String)>>>,
    }

    impl Outbox {
        pub fn last(&self) -> Option<(String, String)> {
            self.sent.read().unwrap().last().cloned()
        }
    }

    impl Notifier for Outbox {
        fn send(&self, recipient: &str, message: &str) {
            self.sent
                .write()
                .unwrap()
                .push((recipient.to_string(), message.to_string()));
        }
    }

    pub fn test_state_with(settings: Settings) -> (AppState, Outbox) {
        let outbox = Outbox::default();
        let state = AppState::new(
            Stores::in_memory(),
            Arc::new(Argon2Hasher::with_params(8, 1, 1).unwrap()),
            Arc::new(StubGeocoder),
            Arc::new(outbox.clone()),
            settings,
        );
        (state, outbox)
    }

    pub fn test_state() -> (AppState, Outbox) {
        test_state_with(Settings::default())
    }
}
