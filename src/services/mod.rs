//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! They validate input, enforce state transitions and talk to the stores.

pub mod admin_service;
pub mod auth_service;
pub mod dispatch_service;
pub mod reservation_service;
