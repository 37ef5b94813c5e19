use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

use crate::catalog::{SeatInfo, ShowingInfo};
use crate::error::BookingError;
use crate::reservation::Reservation;

/// Read-through lookup of seat metadata. Never authoritative for occupancy.
#[async_trait]
pub trait SeatDirectory: Send + Sync {
    async fn resolve_seats(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, SeatInfo>, BookingError>;
}

/// Read-through lookup of showing metadata.
#[async_trait]
pub trait ShowingDirectory: Send + Sync {
    /// Fails with `ShowingNotFound` when no record exists.
    async fn resolve_showing(&self, id: Uuid) -> Result<ShowingInfo, BookingError>;
}

/// Existence check for the account a reservation is booked against.
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    async fn customer_exists(&self, id: Uuid) -> Result<bool, BookingError>;
}

/// Create-only/delete key store backing the advisory seat locks.
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Attempt an exclusive create of `key` with the given TTL. Returns
    /// false when the key is already held.
    async fn try_lock(&self, key: &str, token: &str, ttl_seconds: u64)
        -> Result<bool, BookingError>;

    async fn unlock(&self, key: &str) -> Result<(), BookingError>;
}

/// Authoritative reservation persistence. Both operations run inside one
/// relational transaction; partial state is never observable.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Double-checks availability and inserts the reservation plus its seat
    /// links atomically. Fails with `SeatsUnavailable` listing the
    /// conflicting seat ids when any requested seat is already sold.
    async fn create_reservation(
        &self,
        customer_id: Uuid,
        showing: &ShowingInfo,
        seat_ids: &[Uuid],
    ) -> Result<Reservation, BookingError>;

    /// Cancels a CONFIRMED reservation and returns it together with the
    /// seat ids it held.
    async fn cancel_reservation(&self, id: Uuid)
        -> Result<(Reservation, Vec<Uuid>), BookingError>;
}
