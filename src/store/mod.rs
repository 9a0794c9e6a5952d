//! store
//!
//! Хранилище, через которое движок бронирования читает залы и билеты
//! и атомарно записывает бронь.
//!
//! - `BookingStore`: хендл хранилища, передаётся в компоненты явно.
//! - `BookingTx`: одна транзакция. `commit` фиксирует изменения, любой
//!   другой выход из области видимости (ошибка, `?`, паника) откатывает её
//!   при drop.
//!
//! Реализации: `PgBookingStore` (боевая) и `InMemoryBookingStore`
//! (тесты и локальные прогоны).

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

use crate::models::{PlanetariumDome, Reservation, SeatPosition, Ticket};

pub use memory::InMemoryBookingStore;
pub use postgres::PgBookingStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Нарушена уникальность (show_session, row, seat). Проигравший в гонке
    /// за место получает именно эту ошибку.
    #[error("seat ({row}, {seat}) of session {session} is already taken")]
    SeatTaken { session: i64, row: i32, seat: i32 },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

#[async_trait]
pub trait BookingStore: Clone + Send + Sync + 'static {
    type Tx: BookingTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    /// Зал сеанса; `None`, если сеанса нет. Без блокировок.
    async fn session_dome(&self, session_id: i64) -> Result<Option<PlanetariumDome>, StoreError>;

    /// Занятые места по зафиксированным билетам сеанса. Без блокировок.
    async fn taken_seats(&self, session_id: i64) -> Result<BTreeSet<SeatPosition>, StoreError>;
}

#[async_trait]
pub trait BookingTx: Send {
    /// Блокирует строки сеансов до конца транзакции и возвращает их залы.
    /// Отсутствующие сеансы в результат не попадают.
    async fn lock_sessions(
        &mut self,
        session_ids: &[i64],
    ) -> Result<HashMap<i64, PlanetariumDome>, StoreError>;

    async fn taken_seats(&mut self, session_id: i64) -> Result<BTreeSet<SeatPosition>, StoreError>;

    async fn insert_reservation(
        &mut self,
        user_id: i64,
        created_at: DateTime<Utc>,
    ) -> Result<Reservation, StoreError>;

    async fn insert_ticket(
        &mut self,
        reservation_id: i64,
        session_id: i64,
        seat: SeatPosition,
    ) -> Result<Ticket, StoreError>;

    async fn commit(self) -> Result<(), StoreError>;
}
