//! engine.rs
//!
//! Создание брони с билетами одним атомарным действием.
//!
//! Порядок проверок:
//! 1. Непустой список билетов.
//! 2. Сеансы существуют, места внутри границ зала.
//! 3. В запросе нет повторов одного места.
//! 4. Места не заняты зафиксированными билетами.
//!
//! Шаги 2–4 и запись идут в одной транзакции, которая блокирует строки
//! затронутых сеансов. Если место всё же уходит параллельной брони,
//! срабатывает UNIQUE в хранилище и ошибка приводится к `SeatAlreadyTaken`.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, info, warn};

use super::error::BookingError;
use super::validator::validate_seat;
use crate::models::{Reservation, SeatPosition, Ticket};
use crate::store::{BookingStore, BookingTx, StoreError};

/// Одно запрошенное место.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeatRequest {
    pub show_session: i64,
    pub row: i32,
    pub seat: i32,
}

impl SeatRequest {
    pub fn new(show_session: i64, row: i32, seat: i32) -> Self {
        Self { show_session, row, seat }
    }

    pub fn position(&self) -> SeatPosition {
        SeatPosition::new(self.row, self.seat)
    }
}

/// Зафиксированная бронь вместе с билетами в порядке запроса.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookedReservation {
    pub reservation: Reservation,
    pub tickets: Vec<Ticket>,
}

#[derive(Clone)]
pub struct ReservationEngine<S> {
    store: S,
}

impl<S: BookingStore> ReservationEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn create_reservation(
        &self,
        user_id: i64,
        requests: &[SeatRequest],
    ) -> Result<BookedReservation, BookingError> {
        if requests.is_empty() {
            return Err(BookingError::EmptyReservationRequest);
        }

        let mut tx = self.store.begin().await?;

        let session_ids: Vec<i64> = requests.iter().map(|r| r.show_session).collect();
        let domes = tx.lock_sessions(&session_ids).await?;

        // 1) границы зала
        for (ticket, req) in requests.iter().enumerate() {
            let dome = domes
                .get(&req.show_session)
                .ok_or(BookingError::SessionNotFound { ticket, session: req.show_session })?;

            validate_seat(req.row, req.seat, dome).map_err(|violation| BookingError::SeatOutOfBounds {
                ticket,
                session: req.show_session,
                row: req.row,
                seat: req.seat,
                violation,
            })?;
        }

        // 2) повторы внутри запроса
        find_duplicate(requests)?;

        // 3) уже занятые места
        let mut taken: HashMap<i64, BTreeSet<SeatPosition>> = HashMap::new();
        for (ticket, req) in requests.iter().enumerate() {
            if !taken.contains_key(&req.show_session) {
                let seats = tx.taken_seats(req.show_session).await?;
                taken.insert(req.show_session, seats);
            }
            let is_taken = taken
                .get(&req.show_session)
                .is_some_and(|seats| seats.contains(&req.position()));
            if is_taken {
                debug!("seat ({}, {}) of session {} already taken", req.row, req.seat, req.show_session);
                return Err(BookingError::SeatAlreadyTaken {
                    ticket,
                    session: req.show_session,
                    row: req.row,
                    seat: req.seat,
                });
            }
        }

        // 4) запись; при ошибке tx откатывается на drop
        let reservation = tx.insert_reservation(user_id, Utc::now()).await?;
        let mut tickets = Vec::with_capacity(requests.len());
        for (ticket, req) in requests.iter().enumerate() {
            match tx.insert_ticket(reservation.id, req.show_session, req.position()).await {
                Ok(t) => tickets.push(t),
                Err(StoreError::SeatTaken { session, row, seat }) => {
                    warn!("seat ({}, {}) of session {} lost to a concurrent booking", row, seat, session);
                    return Err(BookingError::SeatAlreadyTaken { ticket, session, row, seat });
                }
                Err(e) => return Err(e.into()),
            }
        }

        tx.commit().await?;

        info!(
            "Reservation {} created for user {} with {} tickets",
            reservation.id,
            user_id,
            tickets.len()
        );

        Ok(BookedReservation { reservation, tickets })
    }
}

fn find_duplicate(requests: &[SeatRequest]) -> Result<(), BookingError> {
    let mut seen = HashSet::with_capacity(requests.len());
    for (ticket, req) in requests.iter().enumerate() {
        if !seen.insert(req) {
            return Err(BookingError::DuplicateSeatInRequest {
                ticket,
                session: req.show_session,
                row: req.row,
                seat: req.seat,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_points_at_second_occurrence() {
        let reqs = [SeatRequest::new(1, 1, 1), SeatRequest::new(1, 1, 2), SeatRequest::new(1, 1, 1)];
        let err = find_duplicate(&reqs).unwrap_err();
        assert!(matches!(err, BookingError::DuplicateSeatInRequest { ticket: 2, session: 1, row: 1, seat: 1 }));
    }

    #[test]
    fn same_seat_in_different_sessions_is_not_a_duplicate() {
        let reqs = [SeatRequest::new(1, 3, 3), SeatRequest::new(2, 3, 3)];
        assert!(find_duplicate(&reqs).is_ok());
    }
}
