//! Dispatch matcher - drivers browsing, claiming and finishing trips.
//!
//! Claim and finish are single conditional writes in the store; a lost race
//! shows up as the write matching nothing, never as a stale prior read.

use crate::{
    error::AppError,
    models::reservation::{ClaimResult, Reservation, ReservationFilter},
    state::AppState,
};

/// Outcome of a claim attempt that did not fail outright.
#[derive(Debug, Clone)]
pub enum ClaimOutcome {
    Claimed(Reservation),

    /// The driver already has an unfinished assignment
    AlreadyBusy,
}

/// Outcome of a finish attempt.
#[derive(Debug, Clone)]
pub enum FinishOutcome {
    Finished(Reservation),

    /// The driver had nothing to finish
    NotBusy,
}

/// Active reservations no driver has claimed yet, newest first.
pub async fn list_unclaimed(state: &AppState) -> Result<Vec<Reservation>, AppError> {
    state
        .stores
        .reservations
        .list(&ReservationFilter::unclaimed())
        .await
}

/// The driver's unfinished assignment, if any.
pub async fn current_assignment(
    state: &AppState,
    driver: &str,
) -> Result<Option<Reservation>, AppError> {
    state.stores.reservations.current_assignment(driver).await
}

/// Claim the passenger's unpicked reservation for `driver`.
///
/// # Errors
///
/// - `NotFound`: the passenger has no unclaimed reservation, including when
///   another driver won the race for it
pub async fn claim(
    state: &AppState,
    driver: &str,
    passenger: &str,
) -> Result<ClaimOutcome, AppError> {
    if current_assignment(state, driver).await?.is_some() {
        return Ok(ClaimOutcome::AlreadyBusy);
    }

    match state.stores.reservations.claim(driver, passenger).await? {
        ClaimResult::Claimed(reservation) => {
            tracing::info!(driver = %driver, passenger = %passenger, reservation_id = %reservation.id, "Reservation claimed");
            Ok(ClaimOutcome::Claimed(reservation))
        }
        ClaimResult::DriverBusy => Ok(ClaimOutcome::AlreadyBusy),
        ClaimResult::Unavailable => {
            tracing::info!(driver = %driver, passenger = %passenger, "Claim lost or passenger unavailable");
            Err(AppError::NotFound("Passenger not available".to_string()))
        }
    }
}

/// Mark the driver's current assignment as finished.
pub async fn finish(state: &AppState, driver: &str) -> Result<FinishOutcome, AppError> {
    match state.stores.reservations.finish(driver).await? {
        Some(reservation) => {
            tracing::info!(driver = %driver, reservation_id = %reservation.id, "Trip finished");
            Ok(FinishOutcome::Finished(reservation))
        }
        None => Ok(FinishOutcome::NotBusy),
    }
}
