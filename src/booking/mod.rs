pub mod availability;
pub mod capacity;
pub mod engine;
pub mod error;
pub mod validator;

pub use availability::{AvailabilityIndex, SessionAvailability};
pub use capacity::DomeCapacity;
pub use engine::{BookedReservation, ReservationEngine, SeatRequest};
pub use error::BookingError;
pub use validator::{validate_seat, FieldViolation, SeatField, SeatViolation};
