use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use super::{ApiJson, cached_json, to_json};
use crate::error::ApiError;
use crate::middleware::{AdminUser, AuthUser};
use crate::services::sessions::{SessionFilters, SessionPayload};
use crate::views::{SessionView, SessionWrite};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/show_sessions/", get(list_sessions).post(create_session))
        .route(
            "/show_sessions/{id}/",
            get(get_session).put(update_session).delete(delete_session),
        )
}

/// Фильтры: `astronomy_show=<id>`, `date=YYYY-MM-DD`.
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Query(filters): Query<SessionFilters>,
) -> Result<impl IntoResponse, ApiError> {
    let sessions = state.sessions.list(&filters).await?;
    Ok(Json(SessionView::List(sessions)))
}

// Карточка сеанса кешируется до ближайшей брони или изменения
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(cached) = state.cache.get_session_detail(id).await {
        return Ok(cached_json(cached, true));
    }

    let detail = state
        .sessions
        .detail(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Show session", id))?;

    let body = to_json(&SessionView::Detail(Box::new(detail)))?;
    state.cache.cache_session_detail(id, &body).await;
    Ok(cached_json(body, false))
}

pub async fn create_session(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    ApiJson(payload): ApiJson<SessionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.sessions.create(&payload).await?;
    Ok((StatusCode::CREATED, Json(SessionView::Write(SessionWrite::from(session)))))
}

pub async fn update_session(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    ApiJson(payload): ApiJson<SessionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state
        .sessions
        .update(id, &payload)
        .await?
        .ok_or_else(|| ApiError::not_found("Show session", id))?;

    state.cache.invalidate_sessions(&[id]).await;
    Ok(Json(SessionView::Write(SessionWrite::from(session))))
}

pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state
        .deletion
        .delete_session(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Show session", id))?;

    state.cache.invalidate_sessions(&report.sessions).await;
    Ok(StatusCode::NO_CONTENT)
}
