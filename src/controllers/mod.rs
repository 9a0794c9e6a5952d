pub mod domes;
pub mod health;
pub mod reservations;
pub mod sessions;
pub mod shows;
pub mod themes;

use axum::{
    extract::FromRequest,
    http::{header, HeaderName},
    response::{IntoResponse, Response},
    Router,
};
use std::sync::Arc;

use crate::config::Config;
use crate::error::ApiError;

const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

pub fn routes(config: &Config) -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(themes::routes())
        .merge(domes::routes())
        .merge(shows::routes(config.media.max_upload_bytes))
        .merge(sessions::routes())
        .merge(reservations::routes())
}

/// `Json`, который на плохом теле отвечает 400 с ошибками по полям.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

// Готовый JSON из кеша или только что сериализованный, с пометкой X-Cache
pub(crate) fn cached_json(body: String, hit: bool) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/json"),
            (X_CACHE, if hit { "HIT" } else { "MISS" }),
        ],
        body,
    )
        .into_response()
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string(value).map_err(|e| ApiError::Internal(format!("serialization failed: {}", e)))
}
