use anyhow::anyhow;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::Utc;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use cine_domain::catalog::ShowingInfo;
use cine_domain::error::BookingError;
use cine_domain::repository::ReservationStore;
use cine_domain::reservation::{Reservation, ReservationDetail, ReservationStatus};

/// Authoritative reservation persistence. Every mutation runs inside one
/// transaction scoped to a single create or cancel.
pub struct ReservationRepository {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct ReservationRow {
    id: Uuid,
    customer_id: Uuid,
    showing_id: Uuid,
    status: String,
    seat_count: i32,
    total_amount: BigDecimal,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl ReservationRow {
    fn into_domain(self) -> Result<Reservation, BookingError> {
        let status = ReservationStatus::parse(&self.status).ok_or_else(|| {
            BookingError::Infrastructure(anyhow!("unknown reservation status {}", self.status))
        })?;
        Ok(Reservation {
            id: self.id,
            customer_id: self.customer_id,
            showing_id: self.showing_id,
            status,
            seat_count: self.seat_count,
            total_amount: self.total_amount,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct DetailRow {
    id: Uuid,
    status: String,
    seat_count: i32,
    total_amount: BigDecimal,
    customer_name: String,
    movie_title: String,
    room_number: i32,
    starts_at: chrono::DateTime<chrono::Utc>,
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

fn infra(err: sqlx::Error) -> BookingError {
    BookingError::Infrastructure(err.into())
}

impl ReservationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Seat ids currently sold for a showing. Always answered by Postgres,
    /// never the cache.
    pub async fn occupied_seat_ids(&self, showing_id: Uuid) -> Result<Vec<Uuid>, BookingError> {
        let rows: Vec<(Uuid,)> =
            sqlx::query_as("SELECT seat_id FROM reservation_seats WHERE showing_id = $1")
                .bind(showing_id)
                .fetch_all(&self.pool)
                .await
                .map_err(infra)?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn get_detail(&self, id: Uuid) -> Result<Option<ReservationDetail>, BookingError> {
        let row = sqlx::query_as::<_, DetailRow>(
            "SELECT r.id, r.status, r.seat_count, r.total_amount, \
                    c.name AS customer_name, m.title AS movie_title, \
                    rm.number AS room_number, s.starts_at \
             FROM reservations r \
             JOIN customers c ON c.id = r.customer_id \
             JOIN showings s ON s.id = r.showing_id \
             JOIN movies m ON m.id = s.movie_id \
             JOIN rooms rm ON rm.id = s.room_id \
             WHERE r.id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(infra)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let labels: Vec<(String, i32)> = sqlx::query_as(
            "SELECT st.row_letter, st.seat_number \
             FROM reservation_seats rs JOIN seats st ON st.id = rs.seat_id \
             WHERE rs.reservation_id = $1 ORDER BY st.row_letter, st.seat_number",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(infra)?;

        let status = ReservationStatus::parse(&row.status).ok_or_else(|| {
            BookingError::Infrastructure(anyhow!("unknown reservation status {}", row.status))
        })?;

        Ok(Some(ReservationDetail {
            id: row.id,
            status,
            seat_count: row.seat_count,
            total_amount: row.total_amount,
            customer_name: row.customer_name,
            movie_title: row.movie_title,
            room_number: row.room_number,
            starts_at: row.starts_at,
            seat_labels: labels
                .into_iter()
                .map(|(row_letter, number)| format!("{}{}", row_letter, number))
                .collect(),
        }))
    }

    pub async fn list_for_customer(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<Reservation>, BookingError> {
        let rows = sqlx::query_as::<_, ReservationRow>(
            "SELECT id, customer_id, showing_id, status, seat_count, total_amount, \
                    created_at, updated_at \
             FROM reservations WHERE customer_id = $1 ORDER BY created_at DESC",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(infra)?;

        rows.into_iter().map(ReservationRow::into_domain).collect()
    }
}

#[async_trait]
impl ReservationStore for ReservationRepository {
    async fn create_reservation(
        &self,
        customer_id: Uuid,
        showing: &ShowingInfo,
        seat_ids: &[Uuid],
    ) -> Result<Reservation, BookingError> {
        let mut tx = self.pool.begin().await.map_err(infra)?;

        // Authoritative double-check: independent of, and stronger than, the
        // advisory lock. Same transaction as the insert below.
        let sold: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT seat_id FROM reservation_seats WHERE showing_id = $1 AND seat_id = ANY($2)",
        )
        .bind(showing.id)
        .bind(seat_ids)
        .fetch_all(&mut *tx)
        .await
        .map_err(infra)?;

        if !sold.is_empty() {
            return Err(BookingError::SeatsUnavailable {
                seat_ids: sold.into_iter().map(|(id,)| id).collect(),
                labels: vec![],
            });
        }

        let now = Utc::now();
        let seat_count = seat_ids.len() as i32;
        let total = showing.unit_price.clone() * BigDecimal::from(seat_count);

        let reservation = Reservation {
            id: Uuid::new_v4(),
            customer_id,
            showing_id: showing.id,
            status: ReservationStatus::Confirmed,
            seat_count,
            total_amount: total,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO reservations \
             (id, customer_id, showing_id, status, seat_count, total_amount, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(reservation.id)
        .bind(reservation.customer_id)
        .bind(reservation.showing_id)
        .bind(reservation.status.as_str())
        .bind(reservation.seat_count)
        .bind(&reservation.total_amount)
        .bind(reservation.created_at)
        .bind(reservation.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(infra)?;

        for &seat_id in seat_ids {
            let inserted = sqlx::query(
                "INSERT INTO reservation_seats (reservation_id, showing_id, seat_id) \
                 VALUES ($1, $2, $3)",
            )
            .bind(reservation.id)
            .bind(showing.id)
            .bind(seat_id)
            .execute(&mut *tx)
            .await;

            // A concurrent transaction can slip between our double-check and
            // this insert; the (showing_id, seat_id) unique constraint makes
            // the loser fail here instead of double-selling.
            if let Err(e) = inserted {
                if is_unique_violation(&e) {
                    return Err(BookingError::SeatsUnavailable {
                        seat_ids: vec![seat_id],
                        labels: vec![],
                    });
                }
                return Err(infra(e));
            }
        }

        if let Err(e) = tx.commit().await {
            if is_unique_violation(&e) {
                return Err(BookingError::SeatsUnavailable {
                    seat_ids: seat_ids.to_vec(),
                    labels: vec![],
                });
            }
            return Err(infra(e));
        }

        info!(reservation_id = %reservation.id, showing_id = %showing.id,
              seats = seat_count, "reservation confirmed");
        Ok(reservation)
    }

    async fn cancel_reservation(
        &self,
        id: Uuid,
    ) -> Result<(Reservation, Vec<Uuid>), BookingError> {
        let mut tx = self.pool.begin().await.map_err(infra)?;

        // Row lock so only one cancellation can win the status transition.
        let row = sqlx::query_as::<_, ReservationRow>(
            "SELECT id, customer_id, showing_id, status, seat_count, total_amount, \
                    created_at, updated_at \
             FROM reservations WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(infra)?
        .ok_or(BookingError::ReservationNotFound(id))?;

        let mut reservation = row.into_domain()?;
        if reservation.status == ReservationStatus::Cancelled {
            return Err(BookingError::ReservationAlreadyCancelled(id));
        }

        let freed: Vec<(Uuid,)> =
            sqlx::query_as("SELECT seat_id FROM reservation_seats WHERE reservation_id = $1")
                .bind(id)
                .fetch_all(&mut *tx)
                .await
                .map_err(infra)?;

        sqlx::query("DELETE FROM reservation_seats WHERE reservation_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(infra)?;

        let now = Utc::now();
        sqlx::query("UPDATE reservations SET status = $1, updated_at = $2 WHERE id = $3")
            .bind(ReservationStatus::Cancelled.as_str())
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(infra)?;

        tx.commit().await.map_err(infra)?;

        reservation.status = ReservationStatus::Cancelled;
        reservation.updated_at = now;
        let freed_ids: Vec<Uuid> = freed.into_iter().map(|(seat_id,)| seat_id).collect();

        info!(reservation_id = %id, seats = freed_ids.len(), "reservation cancelled");
        Ok((reservation, freed_ids))
    }
}
