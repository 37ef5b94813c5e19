use thiserror::Error;
use uuid::Uuid;

/// Closed error taxonomy for the booking engine.
///
/// Business outcomes are distinct variants so callers can map them
/// deterministically; infrastructure failures collapse into one variant and
/// are never surfaced with detail.
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("showing {0} not found")]
    ShowingNotFound(Uuid),

    #[error("showing {0} has already started")]
    ShowingAlreadyStarted(Uuid),

    #[error("reservation {0} not found")]
    ReservationNotFound(Uuid),

    #[error("reservation {0} is already cancelled")]
    ReservationAlreadyCancelled(Uuid),

    /// Advisory-lock contention: another booking attempt currently holds
    /// this seat. Not authoritative; retry after the lock TTL.
    #[error("seat {label} is being reserved by someone else")]
    SeatLocked { seat_id: Uuid, label: String },

    /// Authoritative conflict from the transactional double-check.
    #[error("seats already sold: {}", display_seats(.labels, .seat_ids))]
    SeatsUnavailable {
        seat_ids: Vec<Uuid>,
        /// Human-readable labels, filled in by the orchestrator once the
        /// seat ids have been resolved. May be empty below that layer.
        labels: Vec<String>,
    },

    #[error(transparent)]
    Infrastructure(#[from] anyhow::Error),
}

fn display_seats(labels: &[String], seat_ids: &[Uuid]) -> String {
    if labels.is_empty() {
        seat_ids
            .iter()
            .map(Uuid::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    } else {
        labels.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seats_unavailable_prefers_labels_over_ids() {
        let id = Uuid::new_v4();
        let err = BookingError::SeatsUnavailable {
            seat_ids: vec![id],
            labels: vec!["B6".to_string(), "B7".to_string()],
        };
        assert_eq!(err.to_string(), "seats already sold: B6, B7");

        let err = BookingError::SeatsUnavailable {
            seat_ids: vec![id],
            labels: vec![],
        };
        assert!(err.to_string().contains(&id.to_string()));
    }
}
