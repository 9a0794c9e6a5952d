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
use crate::services::catalog::ThemePayload;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/show_theme/", get(list_themes).post(create_theme))
        .route(
            "/show_theme/{id}/",
            get(get_theme).put(update_theme).delete(delete_theme),
        )
}

pub async fn list_themes(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.catalog.list_themes().await?))
}

pub async fn get_theme(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let theme = state
        .catalog
        .get_theme(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Show theme", id))?;
    Ok(Json(theme))
}

pub async fn create_theme(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    ApiJson(payload): ApiJson<ThemePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()?;
    let theme = state.catalog.create_theme(&payload).await?;
    Ok((StatusCode::CREATED, Json(theme)))
}

pub async fn update_theme(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    ApiJson(payload): ApiJson<ThemePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()?;
    let theme = state
        .catalog
        .update_theme(id, &payload)
        .await?
        .ok_or_else(|| ApiError::not_found("Show theme", id))?;

    state.cache.invalidate_catalog(CatalogChange::Theme).await;
    Ok(Json(theme))
}

pub async fn delete_theme(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .deletion
        .delete_theme(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Show theme", id))?;

    state.cache.invalidate_catalog(CatalogChange::Theme).await;
    Ok(StatusCode::NO_CONTENT)
}
