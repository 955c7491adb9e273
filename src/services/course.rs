//! Likes and reviews on learning paths.

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::errors::AppError;
use crate::gateway::{
    decode, eq, fetch_all, fetch_optional, insert_one, to_record, Direction, Gateway,
    GatewayError, Query, Record,
};
use crate::models::course::{
    CourseReview, LikeSummary, NewCourseLike, ReviewListing, ReviewUpsert, SubmitReview,
};
use crate::services::auth::Session;
use crate::services::stitch::attach_profiles;

async fn ensure_path_exists(gateway: &dyn Gateway, path_id: Uuid) -> Result<(), AppError> {
    let query = Query::table("learning_paths").select(&["id"]).eq("id", path_id);
    match fetch_optional::<Record>(gateway, &query).await? {
        Some(_) => Ok(()),
        None => Err(AppError::NotFound(format!(
            "Learning path {path_id} not found"
        ))),
    }
}

pub async fn like_summary(
    gateway: &dyn Gateway,
    path_id: Uuid,
    session: &Session,
) -> Result<LikeSummary, AppError> {
    let count_query = Query::table("course_likes").eq("learning_path_id", path_id);
    let (count, liked) = tokio::try_join!(
        gateway.count(&count_query),
        liked_by(gateway, path_id, session),
    )?;
    Ok(LikeSummary { count, liked })
}

async fn liked_by(
    gateway: &dyn Gateway,
    path_id: Uuid,
    session: &Session,
) -> Result<bool, GatewayError> {
    let Some(user_id) = session.user_id else {
        return Ok(false);
    };
    let query = Query::table("course_likes")
        .eq("learning_path_id", path_id)
        .eq("user_id", user_id);
    Ok(gateway.count(&query).await? > 0)
}

/// Like the path if the user has not yet, otherwise remove the like.
pub async fn toggle_like(
    gateway: &dyn Gateway,
    user_id: Uuid,
    path_id: Uuid,
) -> Result<LikeSummary, AppError> {
    let filters = [eq("learning_path_id", path_id), eq("user_id", user_id)];
    let removed = gateway.delete("course_likes", &filters).await?;
    if removed == 0 {
        ensure_path_exists(gateway, path_id).await?;
        let like = NewCourseLike {
            learning_path_id: path_id,
            user_id,
        };
        match insert_one::<_, Record>(gateway, "course_likes", &like).await {
            // A concurrent like from the same user already landed.
            Ok(_) | Err(GatewayError::UniqueViolation(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }
    like_summary(gateway, path_id, &Session::for_user(user_id)).await
}

fn average_rating(reviews: &[CourseReview]) -> f64 {
    if reviews.is_empty() {
        return 0.0;
    }
    let sum: i64 = reviews.iter().map(|r| i64::from(r.rating)).sum();
    let mean = sum as f64 / reviews.len() as f64;
    (mean * 10.0).round() / 10.0
}

/// Reviews newest first with author profiles. The viewer's own review is
/// returned separately and left out of `reviews`.
pub async fn list_reviews(
    gateway: &dyn Gateway,
    path_id: Uuid,
    session: &Session,
) -> Result<ReviewListing, AppError> {
    let query = Query::table("course_reviews")
        .eq("learning_path_id", path_id)
        .order_by("created_at", Direction::Desc);
    let reviews: Vec<CourseReview> = fetch_all(gateway, &query).await?;

    let average_rating = average_rating(&reviews);
    let total = reviews.len();
    let stitched = attach_profiles(gateway, reviews, |r| r.user_id).await?;

    let (own, others): (Vec<_>, Vec<_>) = stitched
        .into_iter()
        .partition(|r| Some(r.item.user_id) == session.user_id);

    Ok(ReviewListing {
        reviews: others,
        own_review: own.into_iter().next(),
        average_rating,
        total,
    })
}

/// Create or replace the user's review of a path.
pub async fn submit_review(
    gateway: &dyn Gateway,
    user_id: Uuid,
    path_id: Uuid,
    input: SubmitReview,
) -> Result<CourseReview, AppError> {
    input.validate()?;
    ensure_path_exists(gateway, path_id).await?;

    let row = ReviewUpsert {
        learning_path_id: path_id,
        user_id,
        rating: input.rating,
        comment: input
            .comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty()),
        updated_at: Utc::now(),
    };
    let stored = gateway
        .upsert(
            "course_reviews",
            to_record("course_reviews", &row)?,
            &["learning_path_id", "user_id"],
        )
        .await?;
    let review: CourseReview = decode("course_reviews", stored)?;
    tracing::info!(review_id = %review.id, %path_id, %user_id, rating = review.rating, "Review saved");
    Ok(review)
}
