use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use bigdecimal::BigDecimal;
use serde::Serialize;
use std::collections::HashSet;
use uuid::Uuid;

use cine_domain::catalog::{SeatKind, ShowingInfo};
use cine_domain::repository::ShowingDirectory;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct SeatAvailability {
    id: Uuid,
    label: String,
    row_letter: String,
    seat_number: i32,
    kind: SeatKind,
    available: bool,
}

#[derive(Debug, Serialize)]
struct ShowingSeatsResponse {
    showing_id: Uuid,
    unit_price: BigDecimal,
    seats: Vec<SeatAvailability>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/showings", get(list_showings))
        .route("/v1/showings/{id}/seats", get(showing_seats))
}

async fn list_showings(
    State(state): State<AppState>,
) -> Result<Json<Vec<ShowingInfo>>, ApiError> {
    Ok(Json(state.catalog.list_showings().await?))
}

/// Seat layout merged with live occupancy. The layout is a cache-aside read;
/// occupancy always comes from the relational store.
async fn showing_seats(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ShowingSeatsResponse>, ApiError> {
    let showing = state.catalog.resolve_showing(id).await?;
    let layout = state.catalog.room_seats(showing.room_id).await?;
    let occupied: HashSet<Uuid> = state
        .reservations
        .occupied_seat_ids(id)
        .await?
        .into_iter()
        .collect();

    let seats = layout
        .into_iter()
        .map(|seat| SeatAvailability {
            id: seat.id,
            label: seat.label(),
            available: !occupied.contains(&seat.id),
            row_letter: seat.row_letter,
            seat_number: seat.seat_number,
            kind: seat.kind,
        })
        .collect();

    Ok(Json(ShowingSeatsResponse {
        showing_id: showing.id,
        unit_price: showing.unit_price,
        seats,
    }))
}
