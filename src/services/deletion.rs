//! deletion.rs
//!
//! Каскадное удаление. Внешние ключи в схеме без ON DELETE, поэтому
//! зависимые строки удаляются здесь явно, в одной транзакции.
//!
//! - программа: сеансы -> билеты, связи с темами
//! - купол: сеансы -> билеты
//! - сеанс: билеты
//! - бронь: билеты
//! - тема: только связи с программами

use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use tracing::info;

use crate::error::ApiError;

/// Что было удалено. `sessions` нужны для сброса кеша занятости.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionReport {
    pub sessions: Vec<i64>,
    pub sessions_deleted: u64,
    pub tickets_deleted: u64,
}

impl DeletionReport {
    // По одной записи на удалённый билет: id его сеанса
    fn released_tickets(mut sessions: Vec<i64>) -> Self {
        let tickets_deleted = u64::try_from(sessions.len()).unwrap_or(u64::MAX);
        sessions.sort_unstable();
        sessions.dedup();
        Self { sessions, sessions_deleted: 0, tickets_deleted }
    }
}

#[derive(Clone)]
pub struct DeletionService {
    pool: PgPool,
}

impl DeletionService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn delete_theme(&self, id: i64) -> Result<Option<DeletionReport>, ApiError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM astronomy_show_themes WHERE show_theme_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM show_themes WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Ok(None);
        }

        tx.commit().await?;
        info!("Theme {} deleted", id);
        Ok(Some(DeletionReport::default()))
    }

    pub async fn delete_show(&self, id: i64) -> Result<Option<DeletionReport>, ApiError> {
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM astronomy_shows WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Ok(None);
        }

        let sessions = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM show_sessions WHERE astronomy_show_id = $1 ORDER BY id FOR UPDATE"
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let report = delete_sessions(&mut tx, sessions).await?;

        sqlx::query("DELETE FROM astronomy_show_themes WHERE astronomy_show_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM astronomy_shows WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!(
            "Show {} deleted with {} sessions and {} tickets",
            id, report.sessions_deleted, report.tickets_deleted
        );
        Ok(Some(report))
    }

    pub async fn delete_dome(&self, id: i64) -> Result<Option<DeletionReport>, ApiError> {
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM planetarium_domes WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Ok(None);
        }

        let sessions = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM show_sessions WHERE planetarium_dome_id = $1 ORDER BY id FOR UPDATE"
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let report = delete_sessions(&mut tx, sessions).await?;

        sqlx::query("DELETE FROM planetarium_domes WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!(
            "Dome {} deleted with {} sessions and {} tickets",
            id, report.sessions_deleted, report.tickets_deleted
        );
        Ok(Some(report))
    }

    pub async fn delete_session(&self, id: i64) -> Result<Option<DeletionReport>, ApiError> {
        let mut tx = self.pool.begin().await?;

        let session = sqlx::query_scalar::<_, i64>("SELECT id FROM show_sessions WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(session) = session else { return Ok(None) };

        let report = delete_sessions(&mut tx, vec![session]).await?;
        tx.commit().await?;

        info!("Session {} deleted with {} tickets", id, report.tickets_deleted);
        Ok(Some(report))
    }

    /// Удаление своей брони. Чужая бронь выглядит как несуществующая.
    pub async fn delete_reservation(&self, user_id: i64, id: i64) -> Result<Option<DeletionReport>, ApiError> {
        let mut tx = self.pool.begin().await?;

        let owned = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM reservations WHERE id = $1 AND user_id = $2 FOR UPDATE"
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;
        if owned.is_none() {
            return Ok(None);
        }

        let sessions = sqlx::query_scalar::<_, i64>(
            "DELETE FROM tickets WHERE reservation_id = $1 RETURNING show_session_id"
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM reservations WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let report = DeletionReport::released_tickets(sessions);
        info!("Reservation {} of user {} deleted, {} seats released", id, user_id, report.tickets_deleted);
        Ok(Some(report))
    }
}

// Удаляет сеансы вместе с билетами. Сами брони остаются.
async fn delete_sessions(conn: &mut PgConnection, sessions: Vec<i64>) -> Result<DeletionReport, sqlx::Error> {
    if sessions.is_empty() {
        return Ok(DeletionReport::default());
    }

    let tickets_deleted = sqlx::query("DELETE FROM tickets WHERE show_session_id = ANY($1)")
        .bind(&sessions)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    let sessions_deleted = sqlx::query("DELETE FROM show_sessions WHERE id = ANY($1)")
        .bind(&sessions)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    Ok(DeletionReport {
        sessions,
        sessions_deleted,
        tickets_deleted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn released_tickets_counts_every_seat_and_dedups_sessions() {
        let report = DeletionReport::released_tickets(vec![7, 3, 7, 7]);
        assert_eq!(report.tickets_deleted, 4);
        assert_eq!(report.sessions, vec![3, 7]);
        assert_eq!(report.sessions_deleted, 0);
    }

    #[test]
    fn reservation_without_tickets_releases_nothing() {
        assert_eq!(DeletionReport::released_tickets(Vec::new()), DeletionReport::default());
    }
}
