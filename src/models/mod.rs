//! Data models representing stored entities and request/response bodies.

/// Staff accounts and roles
pub mod admin;
/// Trip reservations
pub mod reservation;
/// Passenger and driver accounts
pub mod user;
