use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use crate::booking::{availability, AvailabilityIndex, DomeCapacity};
use crate::error::ApiError;
use crate::models::{AstronomyShow, PlanetariumDome, ShowSession};
use crate::services::catalog::load_show_themes;
use crate::store::PgBookingStore;
use crate::views::{project_show, SessionDetail, SessionListItem, ShowView, ViewKind};

// Строка списка сеансов: свободные места считаются как вместимость минус проданные билеты
const SESSION_LIST_SELECT: &str = r#"
    SELECT ss.id,
           ss.show_time,
           a.title AS astronomy_show_title,
           d.name AS planetarium_dome_name,
           (d.rows::BIGINT * d.seats_in_row::BIGINT) AS planetarium_dome_capacity,
           (d.rows::BIGINT * d.seats_in_row::BIGINT) - COUNT(t.id) AS tickets_available,
           a.image AS astronomy_show_image
    FROM show_sessions ss
    JOIN astronomy_shows a ON a.id = ss.astronomy_show_id
    JOIN planetarium_domes d ON d.id = ss.planetarium_dome_id
    LEFT JOIN tickets t ON t.show_session_id = ss.id
"#;

const SESSION_LIST_GROUP: &str = " GROUP BY ss.id, a.id, d.id";

#[derive(Debug, Deserialize)]
pub struct SessionPayload {
    pub astronomy_show: i64,
    pub planetarium_dome: i64,
    pub show_time: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SessionFilters {
    pub astronomy_show: Option<i64>,
    pub date: Option<String>,
}

impl SessionFilters {
    // Некорректная дата не ошибка: фильтр просто не применяется
    pub fn date(&self) -> Option<NaiveDate> {
        self.date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
    }
}

#[derive(FromRow)]
struct SessionDetailRow {
    id: i64,
    show_time: DateTime<Utc>,
    show_id: i64,
    show_title: String,
    show_description: String,
    show_image: Option<String>,
    dome_id: i64,
    dome_name: String,
    dome_rows: i32,
    dome_seats_in_row: i32,
}

#[derive(Clone)]
pub struct SessionService {
    pool: PgPool,
    availability: AvailabilityIndex<PgBookingStore>,
}

impl SessionService {
    pub fn new(pool: PgPool, availability: AvailabilityIndex<PgBookingStore>) -> Self {
        Self { pool, availability }
    }

    pub async fn list(&self, filters: &SessionFilters) -> Result<Vec<SessionListItem>, ApiError> {
        let mut qb = QueryBuilder::<Postgres>::new(SESSION_LIST_SELECT);
        qb.push(" WHERE TRUE");
        if let Some(show_id) = filters.astronomy_show {
            qb.push(" AND ss.astronomy_show_id = ").push_bind(show_id);
        }
        if let Some(date) = filters.date() {
            qb.push(" AND (ss.show_time AT TIME ZONE 'UTC')::date = ").push_bind(date);
        }
        qb.push(SESSION_LIST_GROUP);
        qb.push(" ORDER BY ss.show_time DESC, ss.id DESC");

        let sessions = qb
            .build_query_as::<SessionListItem>()
            .fetch_all(&self.pool)
            .await?;
        Ok(sessions)
    }

    /// Карточка сеанса с занятыми местами.
    pub async fn detail(&self, id: i64) -> Result<Option<SessionDetail>, ApiError> {
        let row = sqlx::query_as::<_, SessionDetailRow>(
            r#"
            SELECT ss.id, ss.show_time,
                   a.id AS show_id, a.title AS show_title,
                   a.description AS show_description, a.image AS show_image,
                   d.id AS dome_id, d.name AS dome_name,
                   d.rows AS dome_rows, d.seats_in_row AS dome_seats_in_row
            FROM show_sessions ss
            JOIN astronomy_shows a ON a.id = ss.astronomy_show_id
            JOIN planetarium_domes d ON d.id = ss.planetarium_dome_id
            WHERE ss.id = $1
            "#
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else { return Ok(None) };

        let show = AstronomyShow {
            id: row.show_id,
            title: row.show_title,
            description: row.show_description,
            image: row.show_image,
        };
        let dome = PlanetariumDome {
            id: row.dome_id,
            name: row.dome_name,
            rows: row.dome_rows,
            seats_in_row: row.dome_seats_in_row,
        };

        let themes = load_show_themes(&self.pool, &[show.id])
            .await?
            .remove(&show.id)
            .unwrap_or_default();
        let ShowView::List(astronomy_show) = project_show(ViewKind::List, show, themes) else {
            return Err(ApiError::Internal("unexpected show projection".into()));
        };

        let taken = self.availability.taken_seats(row.id).await?;
        let tickets_available = availability::available_count(dome.capacity(), taken.len());

        Ok(Some(SessionDetail {
            id: row.id,
            show_time: row.show_time,
            astronomy_show,
            planetarium_dome: dome.into(),
            taken_places: taken.into_iter().collect(),
            tickets_available,
        }))
    }

    pub async fn create(&self, payload: &SessionPayload) -> Result<ShowSession, ApiError> {
        self.ensure_references(payload).await?;

        let session = sqlx::query_as::<_, ShowSession>(
            "INSERT INTO show_sessions (astronomy_show_id, planetarium_dome_id, show_time)
             VALUES ($1, $2, $3)
             RETURNING id, astronomy_show_id, planetarium_dome_id, show_time"
        )
        .bind(payload.astronomy_show)
        .bind(payload.planetarium_dome)
        .bind(payload.show_time)
        .fetch_one(&self.pool)
        .await?;
        Ok(session)
    }

    pub async fn update(&self, id: i64, payload: &SessionPayload) -> Result<Option<ShowSession>, ApiError> {
        self.ensure_references(payload).await?;

        let session = sqlx::query_as::<_, ShowSession>(
            "UPDATE show_sessions
             SET astronomy_show_id = $2, planetarium_dome_id = $3, show_time = $4
             WHERE id = $1
             RETURNING id, astronomy_show_id, planetarium_dome_id, show_time"
        )
        .bind(id)
        .bind(payload.astronomy_show)
        .bind(payload.planetarium_dome)
        .bind(payload.show_time)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    // Ссылки на несуществующие программу или купол -> 400 по полю
    async fn ensure_references(&self, payload: &SessionPayload) -> Result<(), ApiError> {
        let show_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM astronomy_shows WHERE id = $1)")
            .bind(payload.astronomy_show)
            .fetch_one(&self.pool)
            .await?;
        if !show_exists {
            return Err(ApiError::field(
                "astronomy_show",
                format!("Invalid pk \"{}\" - object does not exist.", payload.astronomy_show),
            ));
        }

        let dome_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM planetarium_domes WHERE id = $1)")
            .bind(payload.planetarium_dome)
            .fetch_one(&self.pool)
            .await?;
        if !dome_exists {
            return Err(ApiError::field(
                "planetarium_dome",
                format!("Invalid pk \"{}\" - object does not exist.", payload.planetarium_dome),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_filter_parses_iso_dates() {
        let filters = SessionFilters { astronomy_show: None, date: Some("2024-10-05".into()) };
        assert_eq!(filters.date(), NaiveDate::from_ymd_opt(2024, 10, 5));
    }

    #[test]
    fn malformed_date_is_ignored() {
        for raw in ["05.10.2024", "2024-13-01", ""] {
            let filters = SessionFilters { astronomy_show: None, date: Some(raw.into()) };
            assert_eq!(filters.date(), None, "{raw}");
        }
    }

    #[test]
    fn payload_accepts_rfc3339_show_time() {
        let payload: SessionPayload = serde_json::from_str(
            r#"{"astronomy_show": 1, "planetarium_dome": 2, "show_time": "2024-10-05T18:30:00Z"}"#,
        )
        .unwrap();
        assert_eq!(payload.planetarium_dome, 2);
        assert_eq!(payload.show_time.to_rfc3339(), "2024-10-05T18:30:00+00:00");
    }
}
