use thiserror::Error;

use super::validator::SeatViolation;
use crate::store::StoreError;

/// Отказы движка бронирования. Все, кроме `Storage`, это ошибки запроса:
/// ничего не записано, повторять автоматически не нужно.
///
/// `ticket`: индекс билета в присланном списке.
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("reservation must contain at least one ticket")]
    EmptyReservationRequest,

    #[error("Invalid pk \"{session}\" - object does not exist.")]
    SessionNotFound { ticket: usize, session: i64 },

    #[error("{violation}")]
    SeatOutOfBounds {
        ticket: usize,
        session: i64,
        row: i32,
        seat: i32,
        violation: SeatViolation,
    },

    #[error("seat ({row}, {seat}) of show session {session} is requested more than once")]
    DuplicateSeatInRequest { ticket: usize, session: i64, row: i32, seat: i32 },

    #[error("seat ({row}, {seat}) of show session {session} is already taken")]
    SeatAlreadyTaken { ticket: usize, session: i64, row: i32, seat: i32 },

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl BookingError {
    pub fn code(&self) -> &'static str {
        match self {
            BookingError::EmptyReservationRequest => "empty_reservation_request",
            BookingError::SessionNotFound { .. } => "session_not_found",
            BookingError::SeatOutOfBounds { .. } => "seat_out_of_bounds",
            BookingError::DuplicateSeatInRequest { .. } => "duplicate_seat_in_request",
            BookingError::SeatAlreadyTaken { .. } => "seat_already_taken",
            BookingError::Storage(_) => "storage_failure",
        }
    }

    /// Индекс билета, к которому относится ошибка.
    pub fn ticket_index(&self) -> Option<usize> {
        match self {
            BookingError::SessionNotFound { ticket, .. }
            | BookingError::SeatOutOfBounds { ticket, .. }
            | BookingError::DuplicateSeatInRequest { ticket, .. }
            | BookingError::SeatAlreadyTaken { ticket, .. } => Some(*ticket),
            _ => None,
        }
    }

    pub fn is_rejection(&self) -> bool {
        !matches!(self, BookingError::Storage(_))
    }
}
