use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::booking::SeatRequest;
use super::ApiJson;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::pagination::PageParams;
use crate::views::{ReservationView, ReservationWrite};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/reservations/", get(list_reservations).post(create_reservation))
        .route("/reservations/{id}/", get(get_reservation).delete(delete_reservation))
}

#[derive(Debug, Deserialize)]
pub struct ReservationRequest {
    #[serde(default)]
    pub tickets: Vec<SeatRequest>,
}

pub async fn list_reservations(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .reservations
        .list_for_user(user.user_id, &params)
        .await?
        .map(ReservationView::List);
    Ok(Json(page))
}

/// Бронь из нескольких билетов: либо все места, либо ничего.
pub async fn create_reservation(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiJson(request): ApiJson<ReservationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let booked = state
        .booking
        .create_reservation(user.user_id, &request.tickets)
        .await?;

    let mut sessions: Vec<i64> = booked.tickets.iter().map(|t| t.show_session_id).collect();
    sessions.sort_unstable();
    sessions.dedup();
    state.cache.invalidate_sessions(&sessions).await;

    Ok((
        StatusCode::CREATED,
        Json(ReservationView::Write(ReservationWrite::from(booked))),
    ))
}

pub async fn get_reservation(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let reservation = state
        .reservations
        .get_for_user(user.user_id, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Reservation", id))?;
    Ok(Json(ReservationView::Write(reservation)))
}

pub async fn delete_reservation(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state
        .deletion
        .delete_reservation(user.user_id, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Reservation", id))?;

    state.cache.invalidate_sessions(&report.sessions).await;
    Ok(StatusCode::NO_CONTENT)
}
