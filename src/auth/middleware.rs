//! Bearer-token gate for the authenticated part of the router.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use time::OffsetDateTime;
use tracing::{debug, warn};

use super::{claims::TokenKind, jwt::JwtKeys};
use crate::error::AppError;

/// Identity resolved by `require_auth`, stored in request extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: i64,
}

pub fn authenticate(
    keys: &JwtKeys,
    headers: &HeaderMap,
    now: OffsetDateTime,
) -> Result<AuthUser, AppError> {
    let raw = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .trim_start();
    if raw.trim_end().is_empty() {
        return Err(AppError::Unauthorized("Missing token"));
    }

    // "Bearer " with nothing after it arrives trimmed as "Bearer"
    let token = if raw.trim_end() == "Bearer" {
        ""
    } else {
        raw.strip_prefix("Bearer ")
            .ok_or(AppError::Unauthorized("Invalid token"))?
            .trim()
    };
    if token.is_empty() {
        return Err(AppError::Unauthorized("Missing token"));
    }

    let claims = keys.verify(token).map_err(|e| {
        warn!(error = %e, "rejected bearer token");
        AppError::Unauthorized("Invalid token")
    })?;

    if claims.is_expired_at(now) {
        debug!(user_id = claims.subject_user_id(), expired_at = %claims.expires_at(), "expired access token");
        return Err(AppError::Unauthorized("Expired token"));
    }

    if claims.kind() != TokenKind::Access {
        warn!(user_id = claims.subject_user_id(), kind = ?claims.kind(), "non-access token presented");
        return Err(AppError::Unauthorized("Invalid token claims"));
    }

    Ok(AuthUser {
        user_id: claims.subject_user_id(),
    })
}

pub async fn require_auth(
    State(keys): State<JwtKeys>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = authenticate(&keys, req.headers(), OffsetDateTime::now_utc())?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .copied()
            .ok_or_else(|| AppError::internal("authenticated user missing from request context"))
    }
}
