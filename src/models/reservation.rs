//! Reservation data models and API request/response types.
//!
//! This module defines:
//! - `Reservation`: a passenger's trip request and its dispatch state
//! - `ReservationFilter`: the read-only projection used for listings
//! - Request bodies for reserving, picking and finishing trips

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A longitude/latitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

/// Dispatch state derived from the `picked` and `finished` flags.
///
/// Transitions only move forward: `Created -> Picked -> Finished`.
/// `Created -> Finished` happens only when a newer reservation cancels this one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationState {
    Created,
    Picked,
    Finished,
}

/// Represents a reservation record.
///
/// # Invariants
///
/// - At most one reservation per passenger has `finished = false`
/// - `picked` implies `picked_driver` is non-empty
/// - Once `finished` is set no other field changes
/// - A driver is `picked_driver` of at most one unfinished reservation
#[derive(Debug, Clone, Serialize)]
pub struct Reservation {
    pub id: Uuid,

    /// Username of the passenger who requested the trip
    pub passenger: String,

    pub curr_adr: String,
    pub curr_location: GeoPoint,
    pub dest_adr: String,
    pub dest_location: GeoPoint,

    /// Requested departure, epoch seconds
    pub departure_time: i64,

    /// Minimum acceptable driver rating on a 0-100 scale
    pub min_rating: i32,

    pub picked: bool,

    /// Empty until a driver claims the reservation
    pub picked_driver: String,

    pub finished: bool,

    /// Set when a newer reservation from the same passenger replaced this one
    pub cancelled: bool,

    pub created_at: DateTime<Utc>,
}

impl Reservation {
    pub fn state(&self) -> ReservationState {
        if self.finished {
            ReservationState::Finished
        } else if self.picked {
            ReservationState::Picked
        } else {
            ReservationState::Created
        }
    }

    pub fn is_active(&self) -> bool {
        !self.finished
    }
}

/// Row shape of the `reservations` table.
#[derive(Debug, sqlx::FromRow)]
pub struct ReservationRow {
    pub id: Uuid,
    pub passenger: String,
    pub curr_adr: String,
    pub curr_lon: f64,
    pub curr_lat: f64,
    pub dest_adr: String,
    pub dest_lon: f64,
    pub dest_lat: f64,
    pub departure_time: i64,
    pub min_rating: i32,
    pub picked: bool,
    pub picked_driver: String,
    pub finished: bool,
    pub cancelled: bool,
    pub created_at: DateTime<Utc>,
}

impl From<ReservationRow> for Reservation {
    fn from(row: ReservationRow) -> Self {
        Self {
            id: row.id,
            passenger: row.passenger,
            curr_adr: row.curr_adr,
            curr_location: GeoPoint {
                lon: row.curr_lon,
                lat: row.curr_lat,
            },
            dest_adr: row.dest_adr,
            dest_location: GeoPoint {
                lon: row.dest_lon,
                lat: row.dest_lat,
            },
            departure_time: row.departure_time,
            min_rating: row.min_rating,
            picked: row.picked,
            picked_driver: row.picked_driver,
            finished: row.finished,
            cancelled: row.cancelled,
            created_at: row.created_at,
        }
    }
}

/// Validated input for a reservation that has not been stored yet.
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub passenger: String,
    pub curr_adr: String,
    pub curr_location: GeoPoint,
    pub dest_adr: String,
    pub dest_location: GeoPoint,
    pub departure_time: i64,
    pub min_rating: i32,
}

impl NewReservation {
    /// Materialize the record in its initial `Created` state.
    pub fn into_reservation(self) -> Reservation {
        Reservation {
            id: Uuid::new_v4(),
            passenger: self.passenger,
            curr_adr: self.curr_adr,
            curr_location: self.curr_location,
            dest_adr: self.dest_adr,
            dest_location: self.dest_location,
            departure_time: self.departure_time,
            min_rating: self.min_rating,
            picked: false,
            picked_driver: String::new(),
            finished: false,
            cancelled: false,
            created_at: Utc::now(),
        }
    }
}

/// Outcome of storing a new reservation.
#[derive(Debug, Clone)]
pub struct ReplaceOutcome {
    pub reservation: Reservation,

    /// The passenger's previous active reservation, now cancelled
    pub cancelled: Option<Reservation>,
}

/// Read-only filter over reservations. `None` fields match anything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReservationFilter {
    pub passenger: Option<String>,
    pub driver: Option<String>,
    pub picked: Option<bool>,
    pub finished: Option<bool>,
}

impl ReservationFilter {
    pub fn for_passenger(passenger: &str) -> Self {
        Self {
            passenger: Some(passenger.to_string()),
            ..Self::default()
        }
    }

    /// Active reservations nobody has claimed yet.
    pub fn unclaimed() -> Self {
        Self {
            picked: Some(false),
            finished: Some(false),
            ..Self::default()
        }
    }

    pub fn matches(&self, reservation: &Reservation) -> bool {
        self.passenger
            .as_deref()
            .is_none_or(|p| reservation.passenger == p)
            && self
                .driver
                .as_deref()
                .is_none_or(|d| reservation.picked_driver == d)
            && self.picked.is_none_or(|p| reservation.picked == p)
            && self.finished.is_none_or(|f| reservation.finished == f)
    }
}

/// Outcome of a conditional claim.
#[derive(Debug, Clone)]
pub enum ClaimResult {
    Claimed(Reservation),

    /// No unpicked, unfinished reservation matched (absent or lost race)
    Unavailable,

    /// The driver already holds an unfinished assignment
    DriverBusy,
}

/// Form body for `POST /reserve`.
///
/// Each endpoint is given either as free text (`*_adr`) or as a
/// coordinate pair (`*_lat` + `*_lon`). Text wins when both are present.
#[derive(Debug, Default, Deserialize)]
pub struct ReserveRequest {
    pub curr_adr: Option<String>,
    pub curr_lat: Option<f64>,
    pub curr_lon: Option<f64>,
    pub dest_adr: Option<String>,
    pub dest_lat: Option<f64>,
    pub dest_lon: Option<f64>,

    /// 0.0 - 5.0 stars, clamped
    pub min_rating: Option<f64>,

    /// Epoch seconds; defaults to a few minutes from now
    pub departure_time: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ReserveResponse {
    pub reservation: Reservation,

    /// True when an earlier active reservation was cancelled
    pub cancelled_previous: bool,
}

/// Form body for `POST /pick`.
#[derive(Debug, Deserialize)]
pub struct PickRequest {
    /// Username of the passenger whose reservation the driver claims
    pub picked: String,
}

/// Form body for `POST /busy`. `finish` must equal `"finish"`.
#[derive(Debug, Deserialize)]
pub struct FinishRequest {
    pub finish: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Reservation {
        NewReservation {
            passenger: "pat".into(),
            curr_adr: "A".into(),
            curr_location: GeoPoint { lon: 1.0, lat: 2.0 },
            dest_adr: "B".into(),
            dest_location: GeoPoint { lon: 3.0, lat: 4.0 },
            departure_time: 0,
            min_rating: 0,
        }
        .into_reservation()
    }

    #[test]
    fn state_follows_flags() {
        let mut r = sample();
        assert_eq!(r.state(), ReservationState::Created);
        r.picked = true;
        r.picked_driver = "dan".into();
        assert_eq!(r.state(), ReservationState::Picked);
        r.finished = true;
        assert_eq!(r.state(), ReservationState::Finished);
        assert!(!r.is_active());
    }

    #[test]
    fn filter_matches_all_given_fields() {
        let r = sample();
        assert!(ReservationFilter::default().matches(&r));
        assert!(ReservationFilter::unclaimed().matches(&r));
        assert!(ReservationFilter::for_passenger("pat").matches(&r));
        assert!(!ReservationFilter::for_passenger("other").matches(&r));

        let busy = ReservationFilter {
            driver: Some("dan".into()),
            ..ReservationFilter::default()
        };
        assert!(!busy.matches(&r));
    }
}
