use axum::{extract::State, Json};

use crate::errors::{ApiResponse, AppError};
use crate::middleware::auth::CurrentUser;
use crate::services::auth::Session;
use crate::services::employer::{self, EmployerOverview};
use crate::AppState;

/// GET /api/v1/employer/overview: own jobs with applicants and the skill catalogue.
pub async fn overview(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ApiResponse<EmployerOverview>>, AppError> {
    let overview = employer::load_employer_overview(
        state.gateway.as_ref(),
        &Session::for_user(user.id),
        &state.config.dashboard_policy,
    )
    .await?;
    Ok(ApiResponse::success(overview))
}
