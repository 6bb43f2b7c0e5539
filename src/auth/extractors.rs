use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::CookieJar;
use tracing::warn;
use uuid::Uuid;

use super::jwt::SessionKeys;
use crate::error::AppError;

/// Cookie carrying the session credential.
pub const SESSION_COOKIE: &str = "auth_token";

/// Caller identity decoded from a valid session credential.
///
/// Handlers take this as an argument; it is the only trusted source of
/// who is calling. A missing cookie rejects with `Unauthenticated`, a
/// cookie that fails verification with `Forbidden`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub name: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    SessionKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_owned())
            .filter(|v| !v.is_empty())
            .ok_or(AppError::Unauthenticated)?;

        let keys = SessionKeys::from_ref(state);
        let claims = keys.verify(&token).map_err(|e| {
            warn!(error = %e, "invalid or expired session");
            AppError::Forbidden
        })?;

        Ok(AuthUser {
            id: claims.sub,
            name: claims.name,
        })
    }
}
