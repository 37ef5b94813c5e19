use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Seat-state delta for one committed create or cancel operation.
///
/// Watchers receive these as incremental patches, not snapshots: a viewer
/// joining a room mid-show must fetch current occupancy first and apply
/// deltas on top.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatsChanged {
    pub showing_id: Uuid,
    pub reserved_seat_ids: Vec<Uuid>,
    pub released_seat_ids: Vec<Uuid>,
}
