use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use cine_domain::catalog::{SeatInfo, ShowingInfo};
use cine_domain::error::BookingError;
use cine_domain::events::SeatsChanged;
use cine_domain::repository::{
    CustomerDirectory, ReservationStore, SeatDirectory, ShowingDirectory,
};
use cine_domain::reservation::Reservation;

use crate::locks::SeatLockManager;
use crate::realtime::RoomHub;

/// Result of a successful create, with the metadata the caller already paid
/// to resolve.
#[derive(Debug)]
pub struct ConfirmedBooking {
    pub reservation: Reservation,
    pub showing: ShowingInfo,
    pub seats: Vec<SeatInfo>,
}

/// Sequences the booking pipeline: resolve metadata, lock, transact,
/// release, broadcast.
pub struct BookingService {
    seats: Arc<dyn SeatDirectory>,
    showings: Arc<dyn ShowingDirectory>,
    customers: Arc<dyn CustomerDirectory>,
    reservations: Arc<dyn ReservationStore>,
    locks: SeatLockManager,
    hub: Arc<RoomHub>,
}

impl BookingService {
    pub fn new(
        seats: Arc<dyn SeatDirectory>,
        showings: Arc<dyn ShowingDirectory>,
        customers: Arc<dyn CustomerDirectory>,
        reservations: Arc<dyn ReservationStore>,
        locks: SeatLockManager,
        hub: Arc<RoomHub>,
    ) -> Self {
        Self {
            seats,
            showings,
            customers,
            reservations,
            locks,
            hub,
        }
    }

    pub async fn create(
        &self,
        customer_id: Uuid,
        showing_id: Uuid,
        seat_ids: Vec<Uuid>,
    ) -> Result<ConfirmedBooking, BookingError> {
        if seat_ids.is_empty() {
            return Err(BookingError::Validation(
                "at least one seat is required".to_string(),
            ));
        }

        // Dedupe while preserving request order
        let mut seen = HashSet::new();
        let seat_ids: Vec<Uuid> = seat_ids.into_iter().filter(|id| seen.insert(*id)).collect();

        // Resolve seats and showing (both cache-aside) and confirm the
        // customer account in parallel
        let (seat_map, showing, customer_known) = tokio::try_join!(
            self.seats.resolve_seats(&seat_ids),
            self.showings.resolve_showing(showing_id),
            self.customers.customer_exists(customer_id),
        )?;

        if !customer_known {
            return Err(BookingError::Validation(format!(
                "unknown customer {}",
                customer_id
            )));
        }

        if showing.starts_at <= Utc::now() {
            return Err(BookingError::ShowingAlreadyStarted(showing_id));
        }

        for id in &seat_ids {
            match seat_map.get(id) {
                None => {
                    return Err(BookingError::Validation(format!("unknown seat id {}", id)));
                }
                Some(seat) if seat.room_id != showing.room_id => {
                    return Err(BookingError::Validation(format!(
                        "seat {} does not belong to the showing's room",
                        seat.label()
                    )));
                }
                Some(_) => {}
            }
        }

        // Scoped acquisition: every key of this attempt is released below,
        // on success, business failure and unexpected error alike.
        let token = Uuid::new_v4().to_string();
        let attempt = self
            .locked_create(customer_id, &showing, &seat_ids, &seat_map, &token)
            .await;
        self.locks.release_all(showing.id, &seat_ids).await;
        let reservation = attempt?;

        // The reservation is committed; a failed notification must not undo it
        let reached = self.hub.publish(SeatsChanged {
            showing_id: showing.id,
            reserved_seat_ids: seat_ids.clone(),
            released_seat_ids: vec![],
        });
        info!(reservation_id = %reservation.id, watchers = reached, "seat delta broadcast");

        let seats = seat_ids
            .iter()
            .filter_map(|id| seat_map.get(id).cloned())
            .collect();

        Ok(ConfirmedBooking {
            reservation,
            showing,
            seats,
        })
    }

    async fn locked_create(
        &self,
        customer_id: Uuid,
        showing: &ShowingInfo,
        seat_ids: &[Uuid],
        seat_map: &HashMap<Uuid, SeatInfo>,
        token: &str,
    ) -> Result<Reservation, BookingError> {
        if let Some(blocked) = self.locks.acquire_all(showing.id, seat_ids, token).await? {
            return Err(BookingError::SeatLocked {
                seat_id: blocked,
                label: seat_label(seat_map, blocked),
            });
        }

        self.reservations
            .create_reservation(customer_id, showing, seat_ids)
            .await
            .map_err(|e| match e {
                // The store only knows ids; attach the labels we resolved
                BookingError::SeatsUnavailable { seat_ids, .. } => {
                    let labels = seat_ids
                        .iter()
                        .map(|id| seat_label(seat_map, *id))
                        .collect();
                    BookingError::SeatsUnavailable { seat_ids, labels }
                }
                other => other,
            })
    }

    /// No advisory lock: the in-transaction status check (backed by a row
    /// lock) is the sole guard against a double cancel.
    pub async fn cancel(&self, reservation_id: Uuid) -> Result<Reservation, BookingError> {
        let (reservation, freed) = self.reservations.cancel_reservation(reservation_id).await?;

        let reached = self.hub.publish(SeatsChanged {
            showing_id: reservation.showing_id,
            reserved_seat_ids: vec![],
            released_seat_ids: freed,
        });
        info!(reservation_id = %reservation.id, watchers = reached, "seat delta broadcast");

        Ok(reservation)
    }
}

fn seat_label(seat_map: &HashMap<Uuid, SeatInfo>, seat_id: Uuid) -> String {
    seat_map
        .get(&seat_id)
        .map(SeatInfo::label)
        .unwrap_or_else(|| seat_id.to_string())
}
