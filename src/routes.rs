//! Router assembly.

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_cookies::CookieManagerLayer;
use tower_http::trace::TraceLayer;

use crate::{handlers, middleware, state::AppState};

/// Build the full application router.
///
/// # Route groups
///
/// - Public: health, join, quick-join, login, admin login, sudo (checks the
///   super-token cookie itself)
/// - User session (`token` cookie): identity, password, reserve, pick, busy
/// - Staff session (`admin_token` cookie): reservation and user inspection
pub fn create_router(state: AppState) -> Router {
    let user_routes = Router::new()
        .route("/me", get(handlers::accounts::me))
        .route("/password", post(handlers::accounts::change_password))
        .route(
            "/reserve",
            get(handlers::reservations::my_reservations).post(handlers::reservations::reserve),
        )
        .route(
            "/pick",
            get(handlers::dispatch::unclaimed).post(handlers::dispatch::pick),
        )
        .route(
            "/busy",
            get(handlers::dispatch::busy).post(handlers::dispatch::finish),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    let staff_routes = Router::new()
        .route(
            "/admin/reservations",
            get(handlers::admin::list_reservations),
        )
        .route("/admin/users/{username}", get(handlers::admin::get_user))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::staff_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/join", post(handlers::accounts::join))
        .route("/quick-join", post(handlers::accounts::quick_join))
        .route("/login", post(handlers::accounts::login))
        .route("/admin", post(handlers::admin::admin_login))
        .route("/sudo", post(handlers::admin::sudo))
        .merge(user_routes)
        .merge(staff_routes)
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
