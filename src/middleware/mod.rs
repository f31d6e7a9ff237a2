//! HTTP middleware components.
//!
//! Middleware run before route handlers. They resolve session cookies to
//! identities and short-circuit unauthenticated requests.

/// Session-cookie authentication for users and staff
pub mod auth;
