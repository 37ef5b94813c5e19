use std::sync::Arc;

use cine_booking::{BookingService, RoomHub};
use cine_store::{CatalogRepository, CustomerRepository, ReservationRepository};

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<CatalogRepository>,
    pub reservations: Arc<ReservationRepository>,
    pub customers: Arc<CustomerRepository>,
    pub booking: Arc<BookingService>,
    pub hub: Arc<RoomHub>,
}
