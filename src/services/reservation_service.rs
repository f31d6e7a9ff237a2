//! Reservation ledger - creating and listing passenger reservations.
//!
//! # Rules
//!
//! - Departure time must fall within `[now - 1h, now + 24h]`
//! - Minimum rating is clamped to 0.0 - 5.0 stars and stored as 0 - 100
//! - A passenger has at most one active reservation: creating a new one
//!   cancels the previous one, unless a driver has already picked it up

use chrono::Utc;

use crate::{
    error::AppError,
    geocoding::Geocoder,
    models::reservation::{
        GeoPoint, NewReservation, ReplaceOutcome, Reservation, ReservationFilter, ReserveRequest,
    },
    state::AppState,
};

const EARLIEST_DEPARTURE_SECS: i64 = 60 * 60;
const LATEST_DEPARTURE_SECS: i64 = 24 * 60 * 60;
const MAX_STARS: f64 = 5.0;
const STAR_SCALE: f64 = 20.0;

/// One endpoint of a trip as the passenger supplied it.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationInput {
    Address(String),
    Coordinates { lat: f64, lon: f64 },
}

impl LocationInput {
    /// Build from the optional form fields; free text wins over coordinates.
    pub fn from_parts(
        label: &str,
        address: Option<String>,
        lat: Option<f64>,
        lon: Option<f64>,
    ) -> Result<Self, AppError> {
        if let Some(address) = address.map(|a| a.trim().to_string()).filter(|a| !a.is_empty()) {
            return Ok(LocationInput::Address(address));
        }

        match (lat, lon) {
            (Some(lat), Some(lon)) => {
                if !lat.is_finite() || !lon.is_finite() || lat.abs() > 90.0 || lon.abs() > 180.0 {
                    return Err(AppError::Validation(format!(
                        "{label} coordinates are out of range"
                    )));
                }
                Ok(LocationInput::Coordinates { lat, lon })
            }
            _ => Err(AppError::Validation(format!(
                "{label} needs an address or a latitude/longitude pair"
            ))),
        }
    }
}

/// Resolve an endpoint to a normalized address and a point.
///
/// Free text is forward geocoded, coordinates are reverse geocoded.
pub async fn resolve_location(
    geocoder: &dyn Geocoder,
    label: &str,
    input: LocationInput,
) -> Result<(String, GeoPoint), AppError> {
    let unresolved = || AppError::Resolution(format!("Could not resolve {label}"));

    match input {
        LocationInput::Address(text) => {
            let place = geocoder.forward(&text).await?.ok_or_else(unresolved)?;
            Ok((place.address, place.location))
        }
        LocationInput::Coordinates { lat, lon } => {
            let address = geocoder.reverse(lat, lon).await?.ok_or_else(unresolved)?;
            Ok((address, GeoPoint { lon, lat }))
        }
    }
}

/// Scale a 0.0 - 5.0 star rating to an integer 0 - 100, clamping out-of-range input.
pub fn normalize_min_rating(stars: f64) -> i32 {
    if stars.is_nan() {
        return 0;
    }
    (stars.clamp(0.0, MAX_STARS) * STAR_SCALE).round() as i32
}

/// Check a departure time (epoch seconds) against the booking window.
pub fn validate_departure(departure: i64, now: i64) -> Result<(), AppError> {
    if departure < now - EARLIEST_DEPARTURE_SECS || departure > now + LATEST_DEPARTURE_SECS {
        return Err(AppError::Validation(
            "Departure time must be between one hour ago and 24 hours from now".to_string(),
        ));
    }
    Ok(())
}

/// Create a reservation for `passenger`, replacing any unpicked active one.
///
/// # Errors
///
/// - `Validation`: missing endpoint, bad coordinates, departure out of window
/// - `Resolution`: the geocoder found nothing for an endpoint
/// - `Upstream`: the geocoder could not be reached
/// - `Conflict`: the active reservation has already been picked up
pub async fn create(
    state: &AppState,
    passenger: &str,
    request: ReserveRequest,
) -> Result<ReplaceOutcome, AppError> {
    let current = LocationInput::from_parts(
        "current location",
        request.curr_adr,
        request.curr_lat,
        request.curr_lon,
    )?;
    let destination = LocationInput::from_parts(
        "destination",
        request.dest_adr,
        request.dest_lat,
        request.dest_lon,
    )?;

    let now = Utc::now();
    let departure_time = request
        .departure_time
        .unwrap_or_else(|| (now + state.settings.departure_offset).timestamp());
    validate_departure(departure_time, now.timestamp())?;

    let min_rating = normalize_min_rating(request.min_rating.unwrap_or(0.0));

    let geocoder = state.geocoder.as_ref();
    let (curr_adr, curr_location) = resolve_location(geocoder, "current location", current).await?;
    let (dest_adr, dest_location) = resolve_location(geocoder, "destination", destination).await?;

    let outcome = state
        .stores
        .reservations
        .replace_active(NewReservation {
            passenger: passenger.to_string(),
            curr_adr,
            curr_location,
            dest_adr,
            dest_location,
            departure_time,
            min_rating,
        })
        .await?;

    if let Some(cancelled) = &outcome.cancelled {
        tracing::info!(passenger = %passenger, reservation_id = %cancelled.id, "Previous reservation cancelled");
    }
    tracing::info!(passenger = %passenger, reservation_id = %outcome.reservation.id, "Reservation created");

    Ok(outcome)
}

/// Read-only listing, newest first.
pub async fn list(
    state: &AppState,
    filter: &ReservationFilter,
) -> Result<Vec<Reservation>, AppError> {
    state.stores.reservations.list(filter).await
}
