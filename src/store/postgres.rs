use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::collections::{BTreeSet, HashMap};

use super::{BookingStore, BookingTx, StoreError};
use crate::models::{PlanetariumDome, Reservation, SeatPosition, Ticket};

/// Имя UNIQUE-ограничения (show_session_id, row, seat) из миграции.
pub const TICKET_SEAT_CONSTRAINT: &str = "tickets_unique_seat";

#[derive(Clone)]
pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub struct PgBookingTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl BookingStore for PgBookingStore {
    type Tx = PgBookingTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(PgBookingTx { tx })
    }

    async fn session_dome(&self, session_id: i64) -> Result<Option<PlanetariumDome>, StoreError> {
        let dome = sqlx::query_as::<_, PlanetariumDome>(
            r#"
            SELECT d.id, d.name, d.rows, d.seats_in_row
            FROM show_sessions s
            JOIN planetarium_domes d ON d.id = s.planetarium_dome_id
            WHERE s.id = $1
            "#
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(dome)
    }

    async fn taken_seats(&self, session_id: i64) -> Result<BTreeSet<SeatPosition>, StoreError> {
        let seats = sqlx::query_as::<_, SeatPosition>(
            "SELECT row, seat FROM tickets WHERE show_session_id = $1"
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(seats.into_iter().collect())
    }
}

#[async_trait]
impl BookingTx for PgBookingTx {
    async fn lock_sessions(
        &mut self,
        session_ids: &[i64],
    ) -> Result<HashMap<i64, PlanetariumDome>, StoreError> {
        // Блокируем сеансы в порядке id, чтобы параллельные брони
        // на пересекающиеся сеансы не ловили дедлок
        let mut ids = session_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let rows = sqlx::query(
            r#"
            SELECT s.id AS session_id, d.id, d.name, d.rows, d.seats_in_row
            FROM show_sessions s
            JOIN planetarium_domes d ON d.id = s.planetarium_dome_id
            WHERE s.id = ANY($1)
            ORDER BY s.id
            FOR UPDATE OF s
            "#
        )
        .bind(&ids)
        .fetch_all(&mut *self.tx)
        .await?;

        let mut domes = HashMap::with_capacity(rows.len());
        for r in rows {
            let session_id: i64 = r.get("session_id");
            domes.insert(session_id, PlanetariumDome {
                id: r.get("id"),
                name: r.get("name"),
                rows: r.get("rows"),
                seats_in_row: r.get("seats_in_row"),
            });
        }
        Ok(domes)
    }

    async fn taken_seats(&mut self, session_id: i64) -> Result<BTreeSet<SeatPosition>, StoreError> {
        let seats = sqlx::query_as::<_, SeatPosition>(
            "SELECT row, seat FROM tickets WHERE show_session_id = $1"
        )
        .bind(session_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(seats.into_iter().collect())
    }

    async fn insert_reservation(
        &mut self,
        user_id: i64,
        created_at: DateTime<Utc>,
    ) -> Result<Reservation, StoreError> {
        let reservation = sqlx::query_as::<_, Reservation>(
            "INSERT INTO reservations (user_id, created_at)
             VALUES ($1, $2)
             RETURNING id, user_id, created_at"
        )
        .bind(user_id)
        .bind(created_at)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(reservation)
    }

    async fn insert_ticket(
        &mut self,
        reservation_id: i64,
        session_id: i64,
        seat: SeatPosition,
    ) -> Result<Ticket, StoreError> {
        let res = sqlx::query_as::<_, Ticket>(
            "INSERT INTO tickets (row, seat, show_session_id, reservation_id)
             VALUES ($1, $2, $3, $4)
             RETURNING id, row, seat, show_session_id, reservation_id"
        )
        .bind(seat.row)
        .bind(seat.seat)
        .bind(session_id)
        .bind(reservation_id)
        .fetch_one(&mut *self.tx)
        .await;

        match res {
            Ok(ticket) => Ok(ticket),
            Err(sqlx::Error::Database(db)) if is_seat_conflict(db.as_ref()) => {
                Err(StoreError::SeatTaken { session: session_id, row: seat.row, seat: seat.seat })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}

// Только нарушение уникальности места считается конфликтом брони,
// остальные нарушения ограничений считаются обычной ошибкой хранилища
fn is_seat_conflict(err: &dyn sqlx::error::DatabaseError) -> bool {
    err.is_unique_violation() && err.constraint() == Some(TICKET_SEAT_CONSTRAINT)
}
