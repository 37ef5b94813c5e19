use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatKind {
    Normal,
    Vip,
    Accessible,
}

impl SeatKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatKind::Normal => "NORMAL",
            SeatKind::Vip => "VIP",
            SeatKind::Accessible => "ACCESSIBLE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NORMAL" => Some(SeatKind::Normal),
            "VIP" => Some(SeatKind::Vip),
            "ACCESSIBLE" => Some(SeatKind::Accessible),
            _ => None,
        }
    }
}

/// Descriptive seat attributes. Room layouts never change after creation,
/// so these are safe to cache indefinitely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatInfo {
    pub id: Uuid,
    pub room_id: Uuid,
    pub row_letter: String,
    pub seat_number: i32,
    pub kind: SeatKind,
}

impl SeatInfo {
    /// Human-readable label, e.g. "B5".
    pub fn label(&self) -> String {
        format!("{}{}", self.row_letter, self.seat_number)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShowingInfo {
    pub id: Uuid,
    pub room_id: Uuid,
    pub movie_id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub unit_price: BigDecimal,
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movie {
    pub id: Uuid,
    pub title: String,
    pub genre: String,
    pub duration_min: i32,
    pub rating: String,
    pub synopsis: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seat_label_joins_row_and_number() {
        let seat = SeatInfo {
            id: Uuid::new_v4(),
            room_id: Uuid::new_v4(),
            row_letter: "B".to_string(),
            seat_number: 5,
            kind: SeatKind::Normal,
        };
        assert_eq!(seat.label(), "B5");
    }

    #[test]
    fn seat_kind_round_trips_through_db_strings() {
        for kind in [SeatKind::Normal, SeatKind::Vip, SeatKind::Accessible] {
            assert_eq!(SeatKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(SeatKind::parse("RECLINER"), None);
    }
}
