//! Profile projections owned by the identity system.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The signed-in user's own profile as shown on the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub headline: Option<String>,
    pub bio: Option<String>,
}

impl Profile {
    pub const COLUMNS: &'static [&'static str] = &["id", "full_name", "avatar_url", "headline", "bio"];
}

/// Profile fields attached to other entities by stitching.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileSummary {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub headline: Option<String>,
}

impl ProfileSummary {
    pub const COLUMNS: &'static [&'static str] =
        &["id", "full_name", "email", "avatar_url", "headline"];
}
