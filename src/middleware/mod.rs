use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use base64::{Engine as _, engine::general_purpose};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::models::User;
use crate::AppState;

/// Аутентифицированный пользователь (Basic auth).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: i64,
    pub email: String,
    pub is_staff: bool,
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            is_staff: user.is_staff,
        }
    }
}

/// Администратор. Обычный пользователь получает 403.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

// "Basic base64(email:password)" -> (email, password)
pub fn parse_basic_credentials(header_value: &str) -> Option<(String, String)> {
    let encoded = header_value.strip_prefix("Basic ")?.trim();
    let decoded = general_purpose::STANDARD.decode(encoded).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;

    let (email, password) = credentials.split_once(':')?;
    if email.is_empty() {
        return None;
    }
    Some((email.to_string(), password.to_string()))
}

// Basic Auth extractor
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let (email, password) = parse_basic_credentials(auth_header).ok_or(ApiError::Unauthorized)?;

        // Сначала кеш: bcrypt дорогой
        if let Some(cached) = state.cache.get_cached_auth_user(&email, &password).await {
            match serde_json::from_str::<AuthUser>(&cached) {
                Ok(user) => return Ok(user),
                Err(e) => warn!("Broken auth cache entry for {}: {:?}", email, e),
            }
        }

        let user = User::find_active_by_email(&email, &state.db)
            .await?
            .ok_or(ApiError::Unauthorized)?;

        let (user, valid) = {
            let check_password = password.clone();
            tokio::task::spawn_blocking(move || {
                let valid = user.verify_password(&check_password);
                (user, valid)
            })
            .await
            .map_err(|e| ApiError::Internal(format!("password check failed: {}", e)))?
        };

        if !valid {
            debug!("Invalid password for {}", email);
            return Err(ApiError::Unauthorized);
        }

        let auth_user = AuthUser::from(&user);
        if let Ok(json) = serde_json::to_string(&auth_user) {
            state.cache.cache_auth_user(&email, &password, &json).await;
        }

        Ok(auth_user)
    }
}

impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_staff {
            return Err(ApiError::Forbidden(
                "You do not have permission to perform this action.".to_string(),
            ));
        }
        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic(raw: &str) -> String {
        format!("Basic {}", general_purpose::STANDARD.encode(raw))
    }

    #[test]
    fn parses_email_and_password() {
        let creds = parse_basic_credentials(&basic("astro@example.com:s3cret"));
        assert_eq!(creds, Some(("astro@example.com".into(), "s3cret".into())));
    }

    #[test]
    fn password_may_contain_colons() {
        let creds = parse_basic_credentials(&basic("astro@example.com:a:b:c"));
        assert_eq!(creds.map(|(_, p)| p), Some("a:b:c".into()));
    }

    #[test]
    fn rejects_other_schemes_and_garbage() {
        assert_eq!(parse_basic_credentials("Bearer abc.def"), None);
        assert_eq!(parse_basic_credentials("Basic !!!not-base64"), None);
        assert_eq!(parse_basic_credentials(&basic("no-separator")), None);
        assert_eq!(parse_basic_credentials(&basic(":password")), None);
    }

    #[test]
    fn auth_user_round_trips_through_cache_json() {
        let user = AuthUser { user_id: 9, email: "staff@example.com".into(), is_staff: true };
        let json = serde_json::to_string(&user).unwrap();
        assert_eq!(serde_json::from_str::<AuthUser>(&json).unwrap(), user);
    }
}
