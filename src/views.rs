//! views.rs
//!
//! Представления сущностей для API. Форма ответа выбирается явно по виду
//! операции (`ViewKind`): список, карточка или результат записи.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::booking::{BookedReservation, DomeCapacity};
use crate::models::{AstronomyShow, PlanetariumDome, SeatPosition, ShowSession, ShowTheme, Ticket};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    List,
    Detail,
    Write,
}

/* ---------- DOMES ---------- */

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomeView {
    pub id: i64,
    pub name: String,
    pub rows: i32,
    pub seats_in_row: i32,
    pub capacity: i64,
}

impl From<PlanetariumDome> for DomeView {
    fn from(dome: PlanetariumDome) -> Self {
        let capacity = dome.capacity();
        Self {
            id: dome.id,
            name: dome.name,
            rows: dome.rows,
            seats_in_row: dome.seats_in_row,
            capacity,
        }
    }
}

/* ---------- SHOWS ---------- */

// В списке темы отдаются именами
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShowListItem {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub show_themes: Vec<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShowDetail {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub show_themes: Vec<ShowTheme>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShowWrite {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub show_themes: Vec<i64>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ShowView {
    List(ShowListItem),
    Detail(ShowDetail),
    Write(ShowWrite),
}

pub fn project_show(kind: ViewKind, show: AstronomyShow, themes: Vec<ShowTheme>) -> ShowView {
    match kind {
        ViewKind::List => ShowView::List(ShowListItem {
            id: show.id,
            title: show.title,
            description: show.description,
            show_themes: themes.into_iter().map(|t| t.name).collect(),
            image: show.image,
        }),
        ViewKind::Detail => ShowView::Detail(ShowDetail {
            id: show.id,
            title: show.title,
            description: show.description,
            show_themes: themes,
            image: show.image,
        }),
        ViewKind::Write => ShowView::Write(ShowWrite {
            id: show.id,
            title: show.title,
            description: show.description,
            show_themes: themes.into_iter().map(|t| t.id).collect(),
            image: show.image,
        }),
    }
}

/// Ответ на загрузку изображения.
#[derive(Debug, Clone, Serialize)]
pub struct ShowImageView {
    pub id: i64,
    pub image: Option<String>,
}

/* ---------- SESSIONS ---------- */

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct SessionListItem {
    pub id: i64,
    pub show_time: DateTime<Utc>,
    pub astronomy_show_title: String,
    pub planetarium_dome_name: String,
    pub planetarium_dome_capacity: i64,
    pub tickets_available: i64,
    pub astronomy_show_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionDetail {
    pub id: i64,
    pub show_time: DateTime<Utc>,
    pub astronomy_show: ShowListItem,
    pub planetarium_dome: DomeView,
    pub taken_places: Vec<SeatPosition>,
    pub tickets_available: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionWrite {
    pub id: i64,
    pub astronomy_show: i64,
    pub planetarium_dome: i64,
    pub show_time: DateTime<Utc>,
}

impl From<ShowSession> for SessionWrite {
    fn from(s: ShowSession) -> Self {
        Self {
            id: s.id,
            astronomy_show: s.astronomy_show_id,
            planetarium_dome: s.planetarium_dome_id,
            show_time: s.show_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SessionView {
    List(Vec<SessionListItem>),
    Detail(Box<SessionDetail>),
    Write(SessionWrite),
}

/* ---------- RESERVATIONS ---------- */

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketWrite {
    pub id: i64,
    pub row: i32,
    pub seat: i32,
    pub show_session: i64,
}

impl From<Ticket> for TicketWrite {
    fn from(t: Ticket) -> Self {
        Self { id: t.id, row: t.row, seat: t.seat, show_session: t.show_session_id }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReservationWrite {
    pub id: i64,
    pub tickets: Vec<TicketWrite>,
    pub created_at: DateTime<Utc>,
}

impl From<BookedReservation> for ReservationWrite {
    fn from(booked: BookedReservation) -> Self {
        Self {
            id: booked.reservation.id,
            tickets: booked.tickets.into_iter().map(TicketWrite::from).collect(),
            created_at: booked.reservation.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketListItem {
    pub id: i64,
    pub row: i32,
    pub seat: i32,
    pub show_session: SessionListItem,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReservationListItem {
    pub id: i64,
    pub tickets: Vec<TicketListItem>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ReservationView {
    List(ReservationListItem),
    Write(ReservationWrite),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn show() -> AstronomyShow {
        AstronomyShow {
            id: 3,
            title: "The Big Bang".into(),
            description: "An astronomy show about the beginning of space.".into(),
            image: None,
        }
    }

    fn themes() -> Vec<ShowTheme> {
        vec![
            ShowTheme { id: 1, name: "Planets and their features".into() },
            ShowTheme { id: 2, name: "Life in space".into() },
        ]
    }

    #[test]
    fn list_view_uses_theme_names() {
        let value = serde_json::to_value(project_show(ViewKind::List, show(), themes())).unwrap();
        assert_eq!(value["show_themes"], json!(["Planets and their features", "Life in space"]));
    }

    #[test]
    fn detail_view_embeds_theme_objects() {
        let value = serde_json::to_value(project_show(ViewKind::Detail, show(), themes())).unwrap();
        assert_eq!(value["show_themes"][1], json!({ "id": 2, "name": "Life in space" }));
    }

    #[test]
    fn write_view_uses_theme_ids() {
        let value = serde_json::to_value(project_show(ViewKind::Write, show(), themes())).unwrap();
        assert_eq!(value["show_themes"], json!([1, 2]));
        assert_eq!(value["id"], 3);
    }

    #[test]
    fn dome_view_exposes_capacity() {
        let dome = PlanetariumDome { id: 1, name: "North".into(), rows: 10, seats_in_row: 15 };
        let view = DomeView::from(dome);
        assert_eq!(view.capacity, 150);
    }
}
