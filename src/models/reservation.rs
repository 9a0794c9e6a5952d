use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Reservation {
    pub id: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub row: i32,
    pub seat: i32,
    pub show_session_id: i64,
    pub reservation_id: i64,
}

/// Место в зале: пара (ряд, номер кресла).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, FromRow, Serialize, Deserialize)]
pub struct SeatPosition {
    pub row: i32,
    pub seat: i32,
}

impl SeatPosition {
    pub fn new(row: i32, seat: i32) -> Self {
        Self { row, seat }
    }
}

impl From<&Ticket> for SeatPosition {
    fn from(ticket: &Ticket) -> Self {
        Self { row: ticket.row, seat: ticket.seat }
    }
}
