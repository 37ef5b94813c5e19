pub mod catalog;
pub mod error;
pub mod events;
pub mod repository;
pub mod reservation;

pub use catalog::{Movie, SeatInfo, SeatKind, ShowingInfo};
pub use error::BookingError;
pub use events::SeatsChanged;
pub use reservation::{Customer, Reservation, ReservationDetail, ReservationStatus};
