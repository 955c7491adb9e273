//! Role lookups in `user_roles`.

use serde::Deserialize;
use uuid::Uuid;

use crate::gateway::{fetch_optional, Gateway, GatewayError, Query};
use crate::models::role::AppRole;

#[derive(Debug, Deserialize)]
struct RoleRow {
    #[allow(dead_code)]
    role: AppRole,
}

/// Whether `user_id` has been granted `role`.
pub async fn has_role(
    gateway: &dyn Gateway,
    user_id: Uuid,
    role: AppRole,
) -> Result<bool, GatewayError> {
    let query = Query::table("user_roles")
        .select(&["role"])
        .eq("user_id", user_id)
        .eq("role", role.as_str());
    let row: Option<RoleRow> = fetch_optional(gateway, &query).await?;
    Ok(row.is_some())
}
