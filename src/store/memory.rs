//! In-memory реализация `BookingStore`.
//!
//! Транзакция держит эксклюзивную блокировку всего хранилища, поэтому
//! транзакции выполняются строго по очереди. Записи копятся в буфере
//! транзакции и применяются только в `commit`; при drop буфер выбрасывается.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{BookingStore, BookingTx, StoreError};
use crate::models::{PlanetariumDome, Reservation, SeatPosition, Ticket};

#[derive(Debug, Default)]
struct MemoryState {
    domes: HashMap<i64, PlanetariumDome>,
    // session_id -> dome_id
    sessions: HashMap<i64, i64>,
    reservations: Vec<Reservation>,
    tickets: Vec<Ticket>,
    next_id: i64,
    // Сколько билетов можно вставить до искусственного сбоя
    fail_after_tickets: Option<usize>,
    // Следующая транзакция не видит уже проданные места
    stale_taken_seats: bool,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn dome_of(&self, session_id: i64) -> Option<&PlanetariumDome> {
        self.sessions.get(&session_id).and_then(|dome_id| self.domes.get(dome_id))
    }

    fn taken(&self, session_id: i64) -> BTreeSet<SeatPosition> {
        self.tickets
            .iter()
            .filter(|t| t.show_session_id == session_id)
            .map(SeatPosition::from)
            .collect()
    }
}

#[derive(Clone, Default)]
pub struct InMemoryBookingStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_dome(&self, name: &str, rows: i32, seats_in_row: i32) -> PlanetariumDome {
        let mut state = self.state.lock().await;
        let dome = PlanetariumDome {
            id: state.next_id(),
            name: name.to_string(),
            rows,
            seats_in_row,
        };
        state.domes.insert(dome.id, dome.clone());
        dome
    }

    /// Заводит сеанс в зале и возвращает его id.
    pub async fn add_session(&self, dome_id: i64) -> i64 {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        state.sessions.insert(id, dome_id);
        id
    }

    /// Следующая транзакция упадёт после `count` успешно вставленных билетов.
    pub async fn fail_after_tickets(&self, count: usize) {
        self.state.lock().await.fail_after_tickets = Some(count);
    }

    /// Следующая транзакция читает занятость так, будто проданных билетов нет.
    /// Вставка на проданное место упирается в проверку уникальности, как
    /// проигравший в гонке запрос в Postgres.
    pub async fn serve_stale_taken_seats(&self) {
        self.state.lock().await.stale_taken_seats = true;
    }

    pub async fn reservations(&self) -> Vec<Reservation> {
        self.state.lock().await.reservations.clone()
    }

    pub async fn tickets(&self) -> Vec<Ticket> {
        self.state.lock().await.tickets.clone()
    }
}

pub struct InMemoryTx {
    state: OwnedMutexGuard<MemoryState>,
    reservations: Vec<Reservation>,
    tickets: Vec<Ticket>,
    stale_reads: bool,
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    type Tx = InMemoryTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let mut state = self.state.clone().lock_owned().await;
        let stale_reads = std::mem::take(&mut state.stale_taken_seats);
        Ok(InMemoryTx { state, reservations: Vec::new(), tickets: Vec::new(), stale_reads })
    }

    async fn session_dome(&self, session_id: i64) -> Result<Option<PlanetariumDome>, StoreError> {
        Ok(self.state.lock().await.dome_of(session_id).cloned())
    }

    async fn taken_seats(&self, session_id: i64) -> Result<BTreeSet<SeatPosition>, StoreError> {
        Ok(self.state.lock().await.taken(session_id))
    }
}

#[async_trait]
impl BookingTx for InMemoryTx {
    async fn lock_sessions(
        &mut self,
        session_ids: &[i64],
    ) -> Result<HashMap<i64, PlanetariumDome>, StoreError> {
        Ok(session_ids
            .iter()
            .filter_map(|id| self.state.dome_of(*id).map(|d| (*id, d.clone())))
            .collect())
    }

    async fn taken_seats(&mut self, session_id: i64) -> Result<BTreeSet<SeatPosition>, StoreError> {
        let mut taken = if self.stale_reads {
            BTreeSet::new()
        } else {
            self.state.taken(session_id)
        };
        taken.extend(
            self.tickets
                .iter()
                .filter(|t| t.show_session_id == session_id)
                .map(SeatPosition::from),
        );
        Ok(taken)
    }

    async fn insert_reservation(
        &mut self,
        user_id: i64,
        created_at: DateTime<Utc>,
    ) -> Result<Reservation, StoreError> {
        let reservation = Reservation { id: self.state.next_id(), user_id, created_at };
        self.reservations.push(reservation.clone());
        Ok(reservation)
    }

    async fn insert_ticket(
        &mut self,
        reservation_id: i64,
        session_id: i64,
        seat: SeatPosition,
    ) -> Result<Ticket, StoreError> {
        if self.state.fail_after_tickets == Some(self.tickets.len()) {
            self.state.fail_after_tickets = None;
            return Err(StoreError::Backend("injected ticket insert failure".to_string()));
        }

        // Аналог UNIQUE (show_session_id, row, seat)
        let clash = self
            .state
            .tickets
            .iter()
            .chain(self.tickets.iter())
            .any(|t| t.show_session_id == session_id && SeatPosition::from(t) == seat);
        if clash {
            return Err(StoreError::SeatTaken { session: session_id, row: seat.row, seat: seat.seat });
        }

        let ticket = Ticket {
            id: self.state.next_id(),
            row: seat.row,
            seat: seat.seat,
            show_session_id: session_id,
            reservation_id,
        };
        self.tickets.push(ticket.clone());
        Ok(ticket)
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        let reservations = std::mem::take(&mut self.reservations);
        let tickets = std::mem::take(&mut self.tickets);
        self.state.reservations.extend(reservations);
        self.state.tickets.extend(tickets);
        Ok(())
    }
}
