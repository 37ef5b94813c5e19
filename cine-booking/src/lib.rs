pub mod booking;
pub mod locks;
pub mod realtime;

pub use booking::{BookingService, ConfirmedBooking};
pub use locks::SeatLockManager;
pub use realtime::RoomHub;
