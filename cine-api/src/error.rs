use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use cine_domain::error::BookingError;

#[derive(Debug)]
pub enum ApiError {
    Booking(BookingError),
    NotFound(String),
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        ApiError::Booking(err)
    }
}

impl ApiError {
    pub fn not_found(what: &str) -> Self {
        ApiError::NotFound(what.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            ApiError::Booking(err) => match &err {
                BookingError::Validation(_) => {
                    (StatusCode::BAD_REQUEST, json!({ "error": err.to_string() }))
                }
                BookingError::ReservationNotFound(_) => {
                    (StatusCode::NOT_FOUND, json!({ "error": err.to_string() }))
                }
                BookingError::SeatLocked { label, .. } => (
                    StatusCode::CONFLICT,
                    json!({ "error": err.to_string(), "seats": [label] }),
                ),
                BookingError::SeatsUnavailable { seat_ids, labels } => {
                    let seats: Vec<String> = if labels.is_empty() {
                        seat_ids.iter().map(|id| id.to_string()).collect()
                    } else {
                        labels.clone()
                    };
                    (
                        StatusCode::CONFLICT,
                        json!({ "error": err.to_string(), "seats": seats }),
                    )
                }
                BookingError::ShowingNotFound(_)
                | BookingError::ShowingAlreadyStarted(_)
                | BookingError::ReservationAlreadyCancelled(_) => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    json!({ "error": err.to_string() }),
                ),
                BookingError::Infrastructure(inner) => {
                    // Never leak infrastructure detail to the client
                    tracing::error!(error = %inner, "internal server error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        json!({ "error": "Internal Server Error" }),
                    )
                }
            },
        };

        (status, Json(body)).into_response()
    }
}
