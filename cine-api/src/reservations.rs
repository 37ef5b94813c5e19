use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cine_domain::reservation::{ReservationDetail, ReservationStatus};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct CreateReservationRequest {
    customer_id: Uuid,
    showing_id: Uuid,
    seat_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
struct ShowingSummary {
    id: Uuid,
    movie_id: Uuid,
    room_id: Uuid,
    starts_at: DateTime<Utc>,
    language: String,
}

#[derive(Debug, Serialize)]
struct ReservationResponse {
    reservation_id: Uuid,
    status: ReservationStatus,
    seat_count: i32,
    unit_price: BigDecimal,
    total: BigDecimal,
    seats: Vec<String>,
    showing: ShowingSummary,
}

#[derive(Debug, Serialize)]
struct CancelResponse {
    reservation_id: Uuid,
    status: ReservationStatus,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/reservations", post(create_reservation))
        .route(
            "/v1/reservations/{id}",
            get(get_reservation).delete(cancel_reservation),
        )
}

async fn create_reservation(
    State(state): State<AppState>,
    Json(req): Json<CreateReservationRequest>,
) -> Result<(StatusCode, Json<ReservationResponse>), ApiError> {
    let booking = state
        .booking
        .create(req.customer_id, req.showing_id, req.seat_ids)
        .await?;

    let response = ReservationResponse {
        reservation_id: booking.reservation.id,
        status: booking.reservation.status,
        seat_count: booking.reservation.seat_count,
        unit_price: booking.showing.unit_price.clone(),
        total: booking.reservation.total_amount.clone(),
        seats: booking.seats.iter().map(|s| s.label()).collect(),
        showing: ShowingSummary {
            id: booking.showing.id,
            movie_id: booking.showing.movie_id,
            room_id: booking.showing.room_id,
            starts_at: booking.showing.starts_at,
            language: booking.showing.language.clone(),
        },
    };

    Ok((StatusCode::CREATED, Json(response)))
}

async fn get_reservation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReservationDetail>, ApiError> {
    let detail = state
        .reservations
        .get_detail(id)
        .await?
        .ok_or_else(|| ApiError::not_found("reservation not found"))?;

    Ok(Json(detail))
}

async fn cancel_reservation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CancelResponse>, ApiError> {
    let reservation = state.booking.cancel(id).await?;

    Ok(Json(CancelResponse {
        reservation_id: reservation.id,
        status: reservation.status,
    }))
}
