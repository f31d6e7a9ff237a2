//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (form body, URL params, cookies)
//! 2. Delegates to a service
//! 3. Returns an HTTP response (JSON, redirect, status code)

/// Join, login and password endpoints
pub mod accounts;
/// Super-user and staff endpoints
pub mod admin;
/// Driver claim and finish endpoints
pub mod dispatch;
/// Service health
pub mod health;
/// Passenger reservation endpoints
pub mod reservations;
