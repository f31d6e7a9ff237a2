//! Passenger reservation handlers.
//!
//! - POST /reserve - Create a reservation (cancels an unpicked active one)
//! - GET /reserve - The caller's reservation history

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::{
    error::AppError,
    extract::AppForm,
    middleware::auth::AuthContext,
    models::{
        reservation::{Reservation, ReservationFilter, ReserveRequest, ReserveResponse},
        user::Category,
    },
    services::reservation_service,
    state::AppState,
};

/// Create a reservation.
///
/// # Request Body (form)
///
/// - `curr_adr` or `curr_lat` + `curr_lon`
/// - `dest_adr` or `dest_lat` + `dest_lon`
/// - `min_rating` (optional, 0.0 - 5.0)
/// - `departure_time` (optional, epoch seconds)
///
/// # Response
///
/// - **Success (201 Created)**:
///
/// ```json
/// {
///   "reservation": { "id": "...", "passenger": "pat", "picked": false, ... },
///   "cancelled_previous": false
/// }
/// ```
///
/// - **Error (400)**: bad input, departure out of window, unresolvable address
/// - **Error (409)**: the active reservation has already been picked up
/// - **Error (502)**: geocoder unreachable
pub async fn reserve(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppForm(request): AppForm<ReserveRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth.require(Category::Passenger)?;

    let outcome = reservation_service::create(&state, &auth.username, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(ReserveResponse {
            reservation: outcome.reservation,
            cancelled_previous: outcome.cancelled.is_some(),
        }),
    ))
}

/// The caller's reservations, newest first.
pub async fn my_reservations(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<Reservation>>, AppError> {
    auth.require(Category::Passenger)?;

    let reservations =
        reservation_service::list(&state, &ReservationFilter::for_passenger(&auth.username))
            .await?;

    Ok(Json(reservations))
}
