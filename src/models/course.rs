//! Course likes and reviews on learning paths.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::profile::ProfileSummary;
use crate::services::stitch::Stitched;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CourseReview {
    pub id: Uuid,
    pub learning_path_id: Uuid,
    pub user_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub type ReviewWithProfile = Stitched<CourseReview, ProfileSummary>;

/// Reviews of one path as shown to a viewer.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReviewListing {
    /// Everyone else's reviews, newest first.
    pub reviews: Vec<ReviewWithProfile>,
    pub own_review: Option<ReviewWithProfile>,
    /// Mean rating over every review, one decimal place; 0.0 when none.
    pub average_rating: f64,
    pub total: usize,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitReview {
    #[validate(range(min = 1, max = 5, message = "rating must be between 1 and 5"))]
    pub rating: i32,
    #[validate(length(max = 2000, message = "comment is too long"))]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewUpsert {
    pub learning_path_id: Uuid,
    pub user_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewCourseLike {
    pub learning_path_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LikeSummary {
    pub count: i64,
    pub liked: bool,
}
