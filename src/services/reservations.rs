use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;

use crate::error::ApiError;
use crate::models::{Reservation, Ticket};
use crate::pagination::{Page, PageParams};
use crate::views::{ReservationListItem, ReservationWrite, SessionListItem, TicketListItem, TicketWrite};

// Билеты брони вместе со строкой сеанса для списка
#[derive(FromRow)]
struct TicketRow {
    id: i64,
    row: i32,
    seat: i32,
    reservation_id: i64,
    session_id: i64,
    show_time: DateTime<Utc>,
    astronomy_show_title: String,
    planetarium_dome_name: String,
    planetarium_dome_capacity: i64,
    tickets_available: i64,
    astronomy_show_image: Option<String>,
}

impl From<TicketRow> for TicketListItem {
    fn from(r: TicketRow) -> Self {
        TicketListItem {
            id: r.id,
            row: r.row,
            seat: r.seat,
            show_session: SessionListItem {
                id: r.session_id,
                show_time: r.show_time,
                astronomy_show_title: r.astronomy_show_title,
                planetarium_dome_name: r.planetarium_dome_name,
                planetarium_dome_capacity: r.planetarium_dome_capacity,
                tickets_available: r.tickets_available,
                astronomy_show_image: r.astronomy_show_image,
            },
        }
    }
}

/// Чтение броней. Пользователь видит только свои брони.
#[derive(Clone)]
pub struct ReservationService {
    pool: PgPool,
}

impl ReservationService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_for_user(
        &self,
        user_id: i64,
        params: &PageParams,
    ) -> Result<Page<ReservationListItem>, ApiError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reservations WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        let reservations = sqlx::query_as::<_, Reservation>(
            "SELECT id, user_id, created_at FROM reservations
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        )
        .bind(user_id)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<i64> = reservations.iter().map(|r| r.id).collect();
        let mut tickets = self.load_ticket_items(&ids).await?;

        let results = reservations
            .into_iter()
            .map(|r| ReservationListItem {
                id: r.id,
                tickets: tickets.remove(&r.id).unwrap_or_default(),
                created_at: r.created_at,
            })
            .collect();

        Ok(Page::new(params, count, results))
    }

    pub async fn get_for_user(&self, user_id: i64, id: i64) -> Result<Option<ReservationWrite>, ApiError> {
        let reservation = sqlx::query_as::<_, Reservation>(
            "SELECT id, user_id, created_at FROM reservations WHERE id = $1 AND user_id = $2"
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(reservation) = reservation else { return Ok(None) };

        let tickets = sqlx::query_as::<_, Ticket>(
            "SELECT id, row, seat, show_session_id, reservation_id
             FROM tickets WHERE reservation_id = $1 ORDER BY id"
        )
        .bind(reservation.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(ReservationWrite {
            id: reservation.id,
            tickets: tickets.into_iter().map(TicketWrite::from).collect(),
            created_at: reservation.created_at,
        }))
    }

    async fn load_ticket_items(
        &self,
        reservation_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<TicketListItem>>, ApiError> {
        if reservation_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, TicketRow>(
            r#"
            SELECT t.id, t.row, t.seat, t.reservation_id,
                   ss.id AS session_id,
                   ss.show_time,
                   a.title AS astronomy_show_title,
                   d.name AS planetarium_dome_name,
                   (d.rows::BIGINT * d.seats_in_row::BIGINT) AS planetarium_dome_capacity,
                   (d.rows::BIGINT * d.seats_in_row::BIGINT)
                       - (SELECT COUNT(*) FROM tickets sold WHERE sold.show_session_id = ss.id)
                       AS tickets_available,
                   a.image AS astronomy_show_image
            FROM tickets t
            JOIN show_sessions ss ON ss.id = t.show_session_id
            JOIN astronomy_shows a ON a.id = ss.astronomy_show_id
            JOIN planetarium_domes d ON d.id = ss.planetarium_dome_id
            WHERE t.reservation_id = ANY($1)
            ORDER BY t.id
            "#
        )
        .bind(reservation_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<i64, Vec<TicketListItem>> = HashMap::new();
        for row in rows {
            grouped.entry(row.reservation_id).or_default().push(row.into());
        }
        Ok(grouped)
    }
}
