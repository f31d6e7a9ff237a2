//! Driver dispatch handlers.
//!
//! - GET /pick - Browse unclaimed reservations
//! - POST /pick - Claim a passenger's reservation
//! - GET /busy - Current assignment
//! - POST /busy - Finish the current assignment
//!
//! A busy driver trying to claim is sent to `/busy`; an idle driver trying
//! to finish is sent to `/pick`. Neither is an error.

use axum::{
    Extension, Json,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    error::AppError,
    extract::AppForm,
    middleware::auth::AuthContext,
    models::{
        reservation::{FinishRequest, PickRequest, Reservation},
        user::Category,
    },
    services::dispatch_service::{self, ClaimOutcome, FinishOutcome},
    state::AppState,
};

pub async fn unclaimed(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<Reservation>>, AppError> {
    auth.require(Category::Driver)?;
    Ok(Json(dispatch_service::list_unclaimed(&state).await?))
}

/// Claim a reservation.
///
/// # Response
///
/// - **Success (200 OK)**: the claimed reservation
/// - **Redirect (303)**: to `/busy` if the driver already has a trip
/// - **Error (404)**: passenger not available (absent, or another driver won)
pub async fn pick(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppForm(request): AppForm<PickRequest>,
) -> Result<Response, AppError> {
    auth.require(Category::Driver)?;

    match dispatch_service::claim(&state, &auth.username, &request.picked).await? {
        ClaimOutcome::Claimed(reservation) => Ok(Json(reservation).into_response()),
        ClaimOutcome::AlreadyBusy => Ok(Redirect::to("/busy").into_response()),
    }
}

pub async fn busy(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Response, AppError> {
    auth.require(Category::Driver)?;

    match dispatch_service::current_assignment(&state, &auth.username).await? {
        Some(reservation) => Ok(Json(reservation).into_response()),
        None => Ok(Redirect::to("/pick").into_response()),
    }
}

/// Finish the current trip. The form must carry `finish=finish`.
pub async fn finish(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppForm(request): AppForm<FinishRequest>,
) -> Result<Response, AppError> {
    auth.require(Category::Driver)?;

    if request.finish != "finish" {
        return Err(AppError::Validation("Unknown busy action".to_string()));
    }

    match dispatch_service::finish(&state, &auth.username).await? {
        FinishOutcome::Finished(reservation) => Ok(Json(reservation).into_response()),
        FinishOutcome::NotBusy => Ok(Redirect::to("/pick").into_response()),
    }
}
