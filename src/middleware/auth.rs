//! JWT session extractors for Axum handlers.

use axum::{extract::FromRequestParts, http::header::AUTHORIZATION, http::request::Parts};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use uuid::Uuid;

use crate::errors::AppError;
use crate::services::auth::{self as auth_service, Session};
use crate::AppState;

/// Caller identity from an optional Bearer token.
///
/// No `Authorization` header means an anonymous session. A header that is
/// present but malformed, expired or signed for another audience is a 401,
/// never a silent downgrade to anonymous.
impl FromRequestParts<AppState> for Session {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(AUTHORIZATION) {
            return Ok(Session::anonymous());
        }

        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::Unauthorized)?;

        let claims = auth_service::validate_token(
            bearer.token(),
            &state.config.jwt_secret,
            &state.config.jwt_audience,
        )?;
        Ok(Session::for_user(claims.user_id()?))
    }
}

/// Authenticated user; rejects anonymous requests.
///
/// ```ignore
/// async fn handler(current_user: CurrentUser) -> impl IntoResponse { ... }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    pub id: Uuid,
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state).await?;
        session
            .user_id
            .map(|id| CurrentUser { id })
            .ok_or(AppError::Unauthorized)
    }
}
