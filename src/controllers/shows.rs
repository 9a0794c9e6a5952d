use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use validator::Validate;

use super::{ApiJson, cached_json, to_json};
use crate::cache::search::{search_key, SHOW_SEARCH_SCOPE};
use crate::cache::CatalogChange;
use crate::error::ApiError;
use crate::middleware::{AdminUser, AuthUser};
use crate::services::catalog::{ShowFilters, ShowPayload};
use crate::views::{project_show, ShowImageView, ShowView, ViewKind};
use crate::AppState;

pub fn routes(max_upload_bytes: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route("/astronomy_show/", get(list_shows).post(create_show))
        .route(
            "/astronomy_show/{id}/",
            get(get_show).put(update_show).delete(delete_show),
        )
        .route(
            "/astronomy_show/{id}/upload-image/",
            post(upload_image).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
}

/// Список программ с фильтрами `title` и `show_themes=1,2`.
pub async fn list_shows(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Query(filters): Query<ShowFilters>,
) -> Result<impl IntoResponse, ApiError> {
    let cache_key = search_key(SHOW_SEARCH_SCOPE, &filters);
    if let Some(cached) = state.cache.get_cached_search(&cache_key).await {
        return Ok(cached_json(cached, true));
    }

    let shows: Vec<ShowView> = state
        .catalog
        .list_shows(&filters)
        .await?
        .into_iter()
        .map(|(show, themes)| project_show(ViewKind::List, show, themes))
        .collect();

    let body = to_json(&shows)?;
    state.cache.cache_search_result(&cache_key, &body).await;
    Ok(cached_json(body, false))
}

pub async fn get_show(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let (show, themes) = state
        .catalog
        .get_show(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Astronomy show", id))?;
    Ok(Json(project_show(ViewKind::Detail, show, themes)))
}

pub async fn create_show(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    ApiJson(payload): ApiJson<ShowPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()?;
    let (show, themes) = state.catalog.create_show(&payload).await?;

    state.cache.invalidate_search(SHOW_SEARCH_SCOPE).await;
    Ok((StatusCode::CREATED, Json(project_show(ViewKind::Write, show, themes))))
}

pub async fn update_show(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    ApiJson(payload): ApiJson<ShowPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()?;
    let (show, themes) = state
        .catalog
        .update_show(id, &payload)
        .await?
        .ok_or_else(|| ApiError::not_found("Astronomy show", id))?;

    state.cache.invalidate_catalog(CatalogChange::Show).await;
    Ok(Json(project_show(ViewKind::Write, show, themes)))
}

pub async fn delete_show(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state
        .deletion
        .delete_show(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Astronomy show", id))?;

    state.cache.invalidate_search(SHOW_SEARCH_SCOPE).await;
    state.cache.invalidate_sessions(&report.sessions).await;
    Ok(StatusCode::NO_CONTENT)
}

/// multipart/form-data с полем `image`.
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let (show, _) = state
        .catalog
        .get_show(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Astronomy show", id))?;

    let mut stored = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::field("image", e.body_text()))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::field("image", e.body_text()))?;

        let path = state
            .media
            .save_show_image(&show.title, file_name.as_deref(), content_type.as_deref(), &bytes)
            .await?;
        stored = Some(path);
        break;
    }

    let image = stored.ok_or_else(|| ApiError::field("image", "No file was submitted."))?;
    let show = state
        .catalog
        .set_show_image(id, &image)
        .await?
        .ok_or_else(|| ApiError::not_found("Astronomy show", id))?;

    state.cache.invalidate_search(SHOW_SEARCH_SCOPE).await;
    Ok(Json(ShowImageView { id: show.id, image: show.image }))
}
