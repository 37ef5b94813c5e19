use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use cine_booking::{BookingService, RoomHub, SeatLockManager};
use cine_domain::catalog::{SeatInfo, SeatKind, ShowingInfo};
use cine_domain::error::BookingError;
use cine_domain::repository::{
    CustomerDirectory, LockStore, ReservationStore, SeatDirectory, ShowingDirectory,
};
use cine_domain::reservation::{Reservation, ReservationStatus};

struct FakeCatalog {
    seats: HashMap<Uuid, SeatInfo>,
    showings: HashMap<Uuid, ShowingInfo>,
}

#[async_trait]
impl SeatDirectory for FakeCatalog {
    async fn resolve_seats(
        &self,
        ids: &[Uuid],
    ) -> Result<HashMap<Uuid, SeatInfo>, BookingError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.seats.get(id).map(|s| (*id, s.clone())))
            .collect())
    }
}

#[async_trait]
impl ShowingDirectory for FakeCatalog {
    async fn resolve_showing(&self, id: Uuid) -> Result<ShowingInfo, BookingError> {
        self.showings
            .get(&id)
            .cloned()
            .ok_or(BookingError::ShowingNotFound(id))
    }
}

struct FakeCustomers {
    known: HashSet<Uuid>,
}

#[async_trait]
impl CustomerDirectory for FakeCustomers {
    async fn customer_exists(&self, id: Uuid) -> Result<bool, BookingError> {
        Ok(self.known.contains(&id))
    }
}

#[derive(Default)]
struct FakeLockStore {
    held: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl LockStore for FakeLockStore {
    async fn try_lock(
        &self,
        key: &str,
        token: &str,
        _ttl_seconds: u64,
    ) -> Result<bool, BookingError> {
        let mut held = self.held.lock().unwrap();
        if held.contains_key(key) {
            return Ok(false);
        }
        held.insert(key.to_string(), token.to_string());
        Ok(true)
    }

    async fn unlock(&self, key: &str) -> Result<(), BookingError> {
        self.held.lock().unwrap().remove(key);
        Ok(())
    }
}

#[derive(Default)]
struct StoreState {
    // (showing, seat) -> owning reservation; mirrors the unique constraint
    sold: HashMap<(Uuid, Uuid), Uuid>,
    reservations: HashMap<Uuid, (Reservation, Vec<Uuid>)>,
}

#[derive(Default)]
struct FakeReservationStore {
    state: Mutex<StoreState>,
    fail_create: bool,
}

#[async_trait]
impl ReservationStore for FakeReservationStore {
    async fn create_reservation(
        &self,
        customer_id: Uuid,
        showing: &ShowingInfo,
        seat_ids: &[Uuid],
    ) -> Result<Reservation, BookingError> {
        if self.fail_create {
            return Err(BookingError::Infrastructure(anyhow::anyhow!(
                "store unavailable"
            )));
        }

        let mut state = self.state.lock().unwrap();

        let conflicts: Vec<Uuid> = seat_ids
            .iter()
            .copied()
            .filter(|seat| state.sold.contains_key(&(showing.id, *seat)))
            .collect();
        if !conflicts.is_empty() {
            return Err(BookingError::SeatsUnavailable {
                seat_ids: conflicts,
                labels: vec![],
            });
        }

        let now = Utc::now();
        let reservation = Reservation {
            id: Uuid::new_v4(),
            customer_id,
            showing_id: showing.id,
            status: ReservationStatus::Confirmed,
            seat_count: seat_ids.len() as i32,
            total_amount: showing.unit_price.clone() * BigDecimal::from(seat_ids.len() as i32),
            created_at: now,
            updated_at: now,
        };

        for &seat in seat_ids {
            state.sold.insert((showing.id, seat), reservation.id);
        }
        state
            .reservations
            .insert(reservation.id, (reservation.clone(), seat_ids.to_vec()));

        Ok(reservation)
    }

    async fn cancel_reservation(
        &self,
        id: Uuid,
    ) -> Result<(Reservation, Vec<Uuid>), BookingError> {
        let mut state = self.state.lock().unwrap();

        let (reservation, seats) = state
            .reservations
            .get(&id)
            .cloned()
            .ok_or(BookingError::ReservationNotFound(id))?;
        if reservation.status == ReservationStatus::Cancelled {
            return Err(BookingError::ReservationAlreadyCancelled(id));
        }

        for seat in &seats {
            state.sold.remove(&(reservation.showing_id, *seat));
        }
        let mut cancelled = reservation;
        cancelled.status = ReservationStatus::Cancelled;
        cancelled.updated_at = Utc::now();
        state
            .reservations
            .insert(id, (cancelled.clone(), seats.clone()));

        Ok((cancelled, seats))
    }
}

struct World {
    service: Arc<BookingService>,
    hub: Arc<RoomHub>,
    locks: Arc<FakeLockStore>,
    showing_id: Uuid,
    customer_id: Uuid,
    b5: Uuid,
    b6: Uuid,
    b7: Uuid,
}

fn seat(room_id: Uuid, row: &str, number: i32) -> SeatInfo {
    SeatInfo {
        id: Uuid::new_v4(),
        room_id,
        row_letter: row.to_string(),
        seat_number: number,
        kind: SeatKind::Normal,
    }
}

fn build_world(fail_create: bool, starts_in_past: bool) -> World {
    let room_id = Uuid::new_v4();
    let b5 = seat(room_id, "B", 5);
    let b6 = seat(room_id, "B", 6);
    let b7 = seat(room_id, "B", 7);

    let showing = ShowingInfo {
        id: Uuid::new_v4(),
        room_id,
        movie_id: Uuid::new_v4(),
        starts_at: if starts_in_past {
            Utc::now() - Duration::hours(1)
        } else {
            Utc::now() + Duration::hours(3)
        },
        unit_price: "32.50".parse().unwrap(),
        language: "EN".to_string(),
    };
    let showing_id = showing.id;

    let catalog = Arc::new(FakeCatalog {
        seats: [&b5, &b6, &b7]
            .into_iter()
            .map(|s| (s.id, s.clone()))
            .collect(),
        showings: HashMap::from([(showing.id, showing)]),
    });
    let locks = Arc::new(FakeLockStore::default());
    let store = Arc::new(FakeReservationStore {
        fail_create,
        ..Default::default()
    });
    let hub = Arc::new(RoomHub::new());

    let customer_id = Uuid::new_v4();
    let customers = Arc::new(FakeCustomers {
        known: HashSet::from([customer_id]),
    });

    let service = Arc::new(BookingService::new(
        catalog.clone(),
        catalog,
        customers,
        store,
        SeatLockManager::new(locks.clone(), 60),
        hub.clone(),
    ));

    World {
        service,
        hub,
        locks,
        showing_id,
        customer_id,
        b5: b5.id,
        b6: b6.id,
        b7: b7.id,
    }
}

fn locks_held(world: &World) -> usize {
    world.locks.held.lock().unwrap().len()
}

#[tokio::test]
async fn create_confirms_and_totals_unit_price_times_seats() {
    let w = build_world(false, false);

    let booking = w
        .service
        .create(w.customer_id, w.showing_id, vec![w.b5, w.b6])
        .await
        .unwrap();

    assert_eq!(booking.reservation.status, ReservationStatus::Confirmed);
    assert_eq!(booking.reservation.seat_count, 2);
    assert_eq!(
        booking.reservation.total_amount,
        "65.00".parse::<BigDecimal>().unwrap()
    );
    let labels: Vec<String> = booking.seats.iter().map(|s| s.label()).collect();
    assert_eq!(labels, vec!["B5", "B6"]);
    assert_eq!(locks_held(&w), 0, "all locks released after success");
}

#[tokio::test]
async fn duplicate_seat_ids_are_collapsed() {
    let w = build_world(false, false);

    let booking = w
        .service
        .create(w.customer_id, w.showing_id, vec![w.b5, w.b5, w.b6])
        .await
        .unwrap();

    assert_eq!(booking.reservation.seat_count, 2);
}

#[tokio::test]
async fn empty_seat_list_is_rejected() {
    let w = build_world(false, false);

    let err = w
        .service
        .create(w.customer_id, w.showing_id, vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Validation(_)));
}

#[tokio::test]
async fn unknown_seat_id_is_rejected_before_locking() {
    let w = build_world(false, false);

    let err = w
        .service
        .create(w.customer_id, w.showing_id, vec![Uuid::new_v4()])
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Validation(_)));
    assert_eq!(locks_held(&w), 0);
}

#[tokio::test]
async fn unknown_customer_is_rejected_before_locking() {
    let w = build_world(false, false);

    let err = w
        .service
        .create(Uuid::new_v4(), w.showing_id, vec![w.b5])
        .await
        .unwrap_err();

    // A missing account is a caller error, never an infrastructure failure
    assert!(matches!(err, BookingError::Validation(_)));
    assert_eq!(locks_held(&w), 0);
}

#[tokio::test]
async fn past_showing_is_rejected() {
    let w = build_world(false, true);

    let err = w
        .service
        .create(w.customer_id, w.showing_id, vec![w.b5])
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::ShowingAlreadyStarted(_)));
}

#[tokio::test]
async fn missing_showing_is_rejected() {
    let w = build_world(false, false);

    let err = w
        .service
        .create(w.customer_id, Uuid::new_v4(), vec![w.b5])
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::ShowingNotFound(_)));
}

#[tokio::test]
async fn concurrent_disjoint_creates_both_succeed() {
    let w = build_world(false, false);

    let first = w.service.create(w.customer_id, w.showing_id, vec![w.b5]);
    let second = w.service.create(w.customer_id, w.showing_id, vec![w.b6, w.b7]);
    let (first, second) = tokio::join!(first, second);

    assert!(first.is_ok());
    assert!(second.is_ok());
}

#[tokio::test]
async fn concurrent_overlapping_creates_let_exactly_one_win() {
    let w = build_world(false, false);

    let first = w.service.create(w.customer_id, w.showing_id, vec![w.b5, w.b6]);
    let second = w.service.create(w.customer_id, w.showing_id, vec![w.b6, w.b7]);
    let (first, second) = tokio::join!(first, second);

    let failures: Vec<&BookingError> = [&first, &second]
        .into_iter()
        .filter_map(|r| r.as_ref().err())
        .collect();
    assert_eq!(
        failures.len(),
        1,
        "exactly one of two overlapping attempts must fail"
    );
    // The loser is told which seat blocked it, by label
    match failures[0] {
        BookingError::SeatLocked { label, .. } => assert_eq!(label.as_str(), "B6"),
        BookingError::SeatsUnavailable { labels, .. } => {
            assert_eq!(labels, &vec!["B6".to_string()]);
        }
        other => panic!("unexpected error for the losing attempt: {other}"),
    }
    assert_eq!(locks_held(&w), 0, "both attempts released their locks");
}

#[tokio::test]
async fn lock_contention_names_the_blocking_seat() {
    let w = build_world(false, false);

    // Someone else holds the B6 advisory lock
    w.locks
        .try_lock(
            &cine_booking::locks::seat_lock_key(w.showing_id, w.b6),
            "other-attempt",
            60,
        )
        .await
        .unwrap();

    let err = w
        .service
        .create(w.customer_id, w.showing_id, vec![w.b5, w.b6])
        .await
        .unwrap_err();

    match err {
        BookingError::SeatLocked { seat_id, label } => {
            assert_eq!(seat_id, w.b6);
            assert_eq!(label, "B6");
        }
        other => panic!("expected SeatLocked, got {other}"),
    }
    // Every key of the attempt is released, including the one that blocked it
    assert_eq!(locks_held(&w), 0);
}

#[tokio::test]
async fn store_failure_still_releases_locks() {
    let w = build_world(true, false);

    let err = w
        .service
        .create(w.customer_id, w.showing_id, vec![w.b5, w.b6])
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Infrastructure(_)));
    assert_eq!(locks_held(&w), 0);
}

#[tokio::test]
async fn sold_seats_conflict_with_labels_after_lock_expiry() {
    let w = build_world(false, false);

    w.service
        .create(w.customer_id, w.showing_id, vec![w.b6])
        .await
        .unwrap();

    // Locks are long gone; the transactional double-check still rejects
    let err = w
        .service
        .create(w.customer_id, w.showing_id, vec![w.b6, w.b7])
        .await
        .unwrap_err();

    match err {
        BookingError::SeatsUnavailable { labels, .. } => {
            assert_eq!(labels, vec!["B6".to_string()]);
        }
        other => panic!("expected SeatsUnavailable, got {other}"),
    }
}

#[tokio::test]
async fn cancel_frees_seats_for_rebooking() {
    let w = build_world(false, false);

    let booking = w
        .service
        .create(w.customer_id, w.showing_id, vec![w.b5, w.b6])
        .await
        .unwrap();

    let cancelled = w.service.cancel(booking.reservation.id).await.unwrap();
    assert_eq!(cancelled.status, ReservationStatus::Cancelled);

    // The same seats can be sold again
    assert!(w
        .service
        .create(w.customer_id, w.showing_id, vec![w.b5, w.b6])
        .await
        .is_ok());
}

#[tokio::test]
async fn double_cancel_fails_and_broadcasts_nothing_extra() {
    let w = build_world(false, false);
    let mut watcher = w.hub.join(w.showing_id);

    let booking = w
        .service
        .create(w.customer_id, w.showing_id, vec![w.b5])
        .await
        .unwrap();
    w.service.cancel(booking.reservation.id).await.unwrap();

    let err = w.service.cancel(booking.reservation.id).await.unwrap_err();
    assert!(matches!(err, BookingError::ReservationAlreadyCancelled(_)));

    // Exactly two deltas: one reserve, one release
    assert_eq!(watcher.recv().await.unwrap().reserved_seat_ids, vec![w.b5]);
    assert_eq!(watcher.recv().await.unwrap().released_seat_ids, vec![w.b5]);
    assert!(matches!(
        watcher.try_recv(),
        Err(tokio::sync::broadcast::error::TryRecvError::Empty)
    ));
}

#[tokio::test]
async fn cancel_of_unknown_reservation_is_not_found() {
    let w = build_world(false, false);

    let err = w.service.cancel(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, BookingError::ReservationNotFound(_)));
}

#[tokio::test]
async fn watchers_receive_the_full_delta_per_operation() {
    let w = build_world(false, false);
    let mut watcher = w.hub.join(w.showing_id);

    let booking = w
        .service
        .create(w.customer_id, w.showing_id, vec![w.b5, w.b6])
        .await
        .unwrap();

    let event = watcher.recv().await.unwrap();
    assert_eq!(event.showing_id, w.showing_id);
    assert_eq!(event.reserved_seat_ids, vec![w.b5, w.b6]);
    assert!(event.released_seat_ids.is_empty());

    w.service.cancel(booking.reservation.id).await.unwrap();
    let event = watcher.recv().await.unwrap();
    assert!(event.reserved_seat_ids.is_empty());
    assert_eq!(event.released_seat_ids, vec![w.b5, w.b6]);
}
