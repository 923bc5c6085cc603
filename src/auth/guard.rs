//! Extractor gating admin routes: `Authorization: Bearer <token>`.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::token;
use crate::config::get_config;
use crate::errors::AppError;

/// Present in a handler signature means the route requires a valid admin
/// token; carries the username from the token.
pub struct AdminUser(pub String);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Auth("Access denied. No token provided.".to_string()))?;

        let raw = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Auth("Access denied. No token provided.".to_string()))?;

        let claims = token::decode(raw).map_err(AppError::Auth)?;

        let auth = &get_config().auth;
        token::validate(&claims, &auth.admin_username, auth.token_ttl_secs)
            .map_err(AppError::Auth)?;

        Ok(AdminUser(claims.username))
    }
}
