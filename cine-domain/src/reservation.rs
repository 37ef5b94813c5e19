use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Confirmed,
    Cancelled,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Confirmed => "CONFIRMED",
            ReservationStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CONFIRMED" => Some(ReservationStatus::Confirmed),
            "CANCELLED" => Some(ReservationStatus::Cancelled),
            _ => None,
        }
    }
}

/// A reservation is only ever persisted in CONFIRMED state; the single
/// allowed transition is CONFIRMED -> CANCELLED, terminal thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub showing_id: Uuid,
    pub status: ReservationStatus,
    pub seat_count: i32,
    pub total_amount: BigDecimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Full read model for `GET /v1/reservations/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct ReservationDetail {
    pub id: Uuid,
    pub status: ReservationStatus,
    pub seat_count: i32,
    pub total_amount: BigDecimal,
    pub customer_name: String,
    pub movie_title: String,
    pub room_number: i32,
    pub starts_at: DateTime<Utc>,
    pub seat_labels: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
