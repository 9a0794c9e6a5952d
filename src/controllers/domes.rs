use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use validator::Validate;

use super::ApiJson;
use crate::cache::CatalogChange;
use crate::error::ApiError;
use crate::middleware::{AdminUser, AuthUser};
use crate::services::catalog::DomePayload;
use crate::views::DomeView;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/planetarium_dome/", get(list_domes).post(create_dome))
        .route(
            "/planetarium_dome/{id}/",
            get(get_dome).put(update_dome).delete(delete_dome),
        )
}

pub async fn list_domes(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let domes: Vec<DomeView> = state
        .catalog
        .list_domes()
        .await?
        .into_iter()
        .map(DomeView::from)
        .collect();
    Ok(Json(domes))
}

pub async fn get_dome(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let dome = state
        .catalog
        .get_dome(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Planetarium dome", id))?;
    Ok(Json(DomeView::from(dome)))
}

pub async fn create_dome(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    ApiJson(payload): ApiJson<DomePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()?;
    let dome = state.catalog.create_dome(&payload).await?;
    Ok((StatusCode::CREATED, Json(DomeView::from(dome))))
}

pub async fn update_dome(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    ApiJson(payload): ApiJson<DomePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()?;
    let dome = state
        .catalog
        .update_dome(id, &payload)
        .await?
        .ok_or_else(|| ApiError::not_found("Planetarium dome", id))?;

    // Размеры купола входят в карточки всех его сеансов
    state.cache.invalidate_catalog(CatalogChange::Dome).await;
    Ok(Json(DomeView::from(dome)))
}

pub async fn delete_dome(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state
        .deletion
        .delete_dome(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Planetarium dome", id))?;

    state.cache.invalidate_sessions(&report.sessions).await;
    Ok(StatusCode::NO_CONTENT)
}
