//! Role-based access control extractors for Axum handlers.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::errors::AppError;
use crate::middleware::auth::CurrentUser;
use crate::models::role::AppRole;
use crate::services::roles;
use crate::AppState;

/// Extractor that requires the `employer` role in `user_roles`.
#[derive(Debug, Clone, Copy)]
pub struct RequireEmployer(pub CurrentUser);

impl FromRequestParts<AppState> for RequireEmployer {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if !roles::has_role(state.gateway.as_ref(), user.id, AppRole::Employer).await? {
            return Err(AppError::Forbidden("Employer access required".to_string()));
        }
        Ok(RequireEmployer(user))
    }
}
