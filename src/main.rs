//! Ride Dispatch Service - Main Application Entry Point
//!
//! A backend where passengers reserve trips, drivers browse and claim them,
//! and staff accounts with roles inspect the system.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx, or in-memory stores when no database is configured
//! - **Authentication**: session tokens in HttpOnly cookies, stored as SHA-256 digests
//! - **Passwords**: Argon2id
//! - **Geocoding**: Nominatim-compatible HTTP service
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool and run migrations (if configured)
//! 3. Build application state and HTTP router
//! 4. Start server on configured port

use std::sync::Arc;

use ride_dispatch_server::{
    AppState, Settings, Stores, config, create_router, crypto::Argon2Hasher, db,
    geocoding::NominatimGeocoder, notify::LogNotifier,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = config::Config::from_env()?;
    tracing::info!("Configuration loaded");

    let stores = match config.database_url.as_deref() {
        Some(database_url) => {
            let pool = db::create_pool(database_url).await?;
            tracing::info!("Database pool created");

            db::run_migrations(&pool).await?;
            tracing::info!("Database migrations complete");

            Stores::postgres(pool)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory stores; data is lost on restart");
            Stores::in_memory()
        }
    };

    let settings = Settings::from_config(&config);
    if settings.super_users.is_empty() {
        tracing::warn!("SUPER_USERS is empty, no staff accounts can be created");
    }

    let geocoder = NominatimGeocoder::new(&config.geocoder_url, &config.geocoder_user_agent)?;

    let state = AppState::new(
        stores,
        Arc::new(Argon2Hasher::new()),
        Arc::new(geocoder),
        Arc::new(LogNotifier::new()),
        settings,
    );

    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
