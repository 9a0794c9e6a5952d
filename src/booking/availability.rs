use serde::Serialize;
use std::collections::BTreeSet;

use super::capacity::DomeCapacity;
use super::error::BookingError;
use crate::models::SeatPosition;
use crate::store::BookingStore;

/// Занятость сеанса на момент чтения.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionAvailability {
    pub session_id: i64,
    pub capacity: i64,
    pub taken: BTreeSet<SeatPosition>,
}

impl SessionAvailability {
    pub fn available_count(&self) -> i64 {
        available_count(self.capacity, self.taken.len())
    }

    pub fn is_taken(&self, seat: SeatPosition) -> bool {
        self.taken.contains(&seat)
    }
}

pub fn available_count(capacity: i64, taken: usize) -> i64 {
    capacity - i64::try_from(taken).unwrap_or(i64::MAX)
}

/// Чтение занятых мест для отображения. Результат не блокирует места;
/// для брони проверка повторяется внутри транзакции движка.
#[derive(Clone)]
pub struct AvailabilityIndex<S> {
    store: S,
}

impl<S: BookingStore> AvailabilityIndex<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn taken_seats(&self, session_id: i64) -> Result<BTreeSet<SeatPosition>, BookingError> {
        Ok(self.store.taken_seats(session_id).await?)
    }

    pub async fn snapshot(&self, session_id: i64) -> Result<SessionAvailability, BookingError> {
        let dome = self
            .store
            .session_dome(session_id)
            .await?
            .ok_or(BookingError::SessionNotFound { ticket: 0, session: session_id })?;
        let taken = self.store.taken_seats(session_id).await?;

        Ok(SessionAvailability { session_id, capacity: dome.capacity(), taken })
    }

    pub async fn available_count(&self, session_id: i64) -> Result<i64, BookingError> {
        Ok(self.snapshot(session_id).await?.available_count())
    }
}
