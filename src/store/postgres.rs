//! PostgreSQL storage implementations.
//!
//! # Atomicity Guarantees
//!
//! - `claim` and `finish` are single conditional `UPDATE ... RETURNING`
//!   statements keyed on the precondition columns.
//! - `replace_active` locks the passenger's active row inside one database
//!   transaction; the partial unique index on active passengers turns a lost
//!   insert race into a conflict instead of a second active reservation.
//! - The partial unique index on active drivers backs the idle-driver guard
//!   in `claim`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{AdminStore, ReservationStore, SessionStore, StoreResult, UserStore};
use crate::{
    db::{DbPool, is_unique_violation},
    error::AppError,
    models::{
        admin::{AdminRow, AdminUser},
        reservation::{
            ClaimResult, NewReservation, ReplaceOutcome, Reservation, ReservationFilter,
            ReservationRow,
        },
        user::{User, UserRow},
    },
};

const RESERVATION_COLUMNS: &str = "id, passenger, curr_adr, curr_lon, curr_lat, dest_adr, \
     dest_lon, dest_lat, departure_time, min_rating, picked, picked_driver, finished, \
     cancelled, created_at";

/// Postgres-backed user store
#[derive(Clone)]
pub struct PgUserStore {
    pool: DbPool,
}

impl PgUserStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find(&self, username: &str) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(
            "SELECT username, password_hash, category, temp, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn insert(&self, user: User) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (username, password_hash, category, temp, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.category.as_str())
        .bind(user.temp)
        .bind(user.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => {
                Err(AppError::Validation("Username already taken".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update_password(&self, username: &str, password_hash: &str) -> StoreResult<bool> {
        let updated = sqlx::query(
            "UPDATE users SET password_hash = $1, temp = false WHERE username = $2",
        )
        .bind(password_hash)
        .bind(username)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(updated == 1)
    }
}

/// Postgres-backed staff store
#[derive(Clone)]
pub struct PgAdminStore {
    pool: DbPool,
}

impl PgAdminStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AdminStore for PgAdminStore {
    async fn find(&self, username: &str) -> StoreResult<Option<AdminUser>> {
        sqlx::query_as::<_, AdminRow>(
            "SELECT username, password_hash, roles, created_at FROM admins WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?
        .map(AdminUser::try_from)
        .transpose()
    }

    async fn insert(&self, admin: AdminUser) -> StoreResult<()> {
        let roles: Vec<&str> = admin.roles.iter().map(|r| r.as_str()).collect();

        let result = sqlx::query(
            r#"
            INSERT INTO admins (username, password_hash, roles, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&admin.username)
        .bind(&admin.password_hash)
        .bind(roles)
        .bind(admin.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => {
                Err(AppError::Validation("Admin already exists".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Postgres-backed reservation store
#[derive(Clone)]
pub struct PgReservationStore {
    pool: DbPool,
}

impl PgReservationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReservationStore for PgReservationStore {
    async fn replace_active(&self, new: NewReservation) -> StoreResult<ReplaceOutcome> {
        let mut tx = self.pool.begin().await?;

        // Lock the passenger's active row so a concurrent claim waits for us
        let active = sqlx::query_as::<_, ReservationRow>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations \
             WHERE passenger = $1 AND NOT finished FOR UPDATE"
        ))
        .bind(&new.passenger)
        .fetch_optional(&mut *tx)
        .await?;

        let cancelled = match active {
            Some(row) if row.picked => {
                tx.rollback().await?;
                return Err(AppError::Conflict(
                    "Active reservation has already been picked up".to_string(),
                ));
            }
            Some(row) => {
                let row = sqlx::query_as::<_, ReservationRow>(&format!(
                    "UPDATE reservations SET finished = true, cancelled = true \
                     WHERE id = $1 AND NOT picked AND NOT finished \
                     RETURNING {RESERVATION_COLUMNS}"
                ))
                .bind(row.id)
                .fetch_one(&mut *tx)
                .await?;
                Some(Reservation::from(row))
            }
            None => None,
        };

        let reservation = new.into_reservation();
        let inserted = sqlx::query(
            r#"
            INSERT INTO reservations (
                id, passenger, curr_adr, curr_lon, curr_lat, dest_adr, dest_lon, dest_lat,
                departure_time, min_rating, picked, picked_driver, finished, cancelled, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, false, '', false, false, $11)
            "#,
        )
        .bind(reservation.id)
        .bind(&reservation.passenger)
        .bind(&reservation.curr_adr)
        .bind(reservation.curr_location.lon)
        .bind(reservation.curr_location.lat)
        .bind(&reservation.dest_adr)
        .bind(reservation.dest_location.lon)
        .bind(reservation.dest_location.lat)
        .bind(reservation.departure_time)
        .bind(reservation.min_rating)
        .bind(reservation.created_at)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                tx.rollback().await?;
                return Err(AppError::Conflict(
                    "Another reservation was created at the same time".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        }

        tx.commit().await?;

        Ok(ReplaceOutcome {
            reservation,
            cancelled,
        })
    }

    async fn list(&self, filter: &ReservationFilter) -> StoreResult<Vec<Reservation>> {
        let rows = sqlx::query_as::<_, ReservationRow>(&format!(
            r#"
            SELECT {RESERVATION_COLUMNS} FROM reservations
            WHERE ($1::TEXT IS NULL OR passenger = $1)
              AND ($2::TEXT IS NULL OR picked_driver = $2)
              AND ($3::BOOLEAN IS NULL OR picked = $3)
              AND ($4::BOOLEAN IS NULL OR finished = $4)
            ORDER BY created_at DESC
            "#
        ))
        .bind(filter.passenger.as_deref())
        .bind(filter.driver.as_deref())
        .bind(filter.picked)
        .bind(filter.finished)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn current_assignment(&self, driver: &str) -> StoreResult<Option<Reservation>> {
        let row = sqlx::query_as::<_, ReservationRow>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations \
             WHERE picked AND picked_driver = $1 AND NOT finished"
        ))
        .bind(driver)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn claim(&self, driver: &str, passenger: &str) -> StoreResult<ClaimResult> {
        // Filter and set in one statement: two drivers racing for the same
        // passenger cannot both match `NOT picked`.
        let result = sqlx::query_as::<_, ReservationRow>(&format!(
            r#"
            UPDATE reservations
            SET picked = true, picked_driver = $1
            WHERE passenger = $2 AND NOT picked AND NOT finished
              AND NOT EXISTS (
                  SELECT 1 FROM reservations
                  WHERE picked AND picked_driver = $1 AND NOT finished
              )
            RETURNING {RESERVATION_COLUMNS}
            "#
        ))
        .bind(driver)
        .bind(passenger)
        .fetch_optional(&self.pool)
        .await;

        match result {
            Ok(Some(row)) => Ok(ClaimResult::Claimed(row.into())),
            Ok(None) => {
                if self.current_assignment(driver).await?.is_some() {
                    Ok(ClaimResult::DriverBusy)
                } else {
                    Ok(ClaimResult::Unavailable)
                }
            }
            // Same driver claiming two passengers concurrently
            Err(e) if is_unique_violation(&e) => Ok(ClaimResult::DriverBusy),
            Err(e) => Err(e.into()),
        }
    }

    async fn finish(&self, driver: &str) -> StoreResult<Option<Reservation>> {
        let row = sqlx::query_as::<_, ReservationRow>(&format!(
            "UPDATE reservations SET finished = true \
             WHERE picked AND picked_driver = $1 AND NOT finished \
             RETURNING {RESERVATION_COLUMNS}"
        ))
        .bind(driver)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Postgres-backed session store. Expiry is enforced on read.
#[derive(Clone)]
pub struct PgSessionStore {
    pool: DbPool,
}

impl PgSessionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let username = sqlx::query_scalar::<_, String>(
            "SELECT username FROM sessions WHERE key = $1 AND expires_at > NOW()",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(username)
    }

    async fn set(&self, key: &str, username: &str, expires_at: DateTime<Utc>) -> StoreResult<()> {
        sqlx::query("DELETE FROM sessions WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO sessions (key, username, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (key) DO UPDATE SET username = EXCLUDED.username, expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(key)
        .bind(username)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM sessions WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
