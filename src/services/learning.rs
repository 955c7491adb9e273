//! Learning paths, lessons and per-user lesson completion.

use std::collections::HashSet;

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::gateway::{
    decode, fetch_all, fetch_optional, to_record, Direction, Embed, Gateway, GatewayError, Query,
};
use crate::models::learning::{
    LearningPath, LearningPathDetail, LearningPathFilters, Lesson, LessonDetail, LessonOutline,
    ProgressRecord, ProgressUpsert,
};
use crate::services::auth::Session;

#[derive(Debug, Deserialize)]
struct PathWithLessons {
    #[serde(flatten)]
    path: LearningPath,
    #[serde(default)]
    lessons: Vec<LessonOutline>,
}

#[derive(Debug, Deserialize)]
struct LessonWithPath {
    #[serde(flatten)]
    lesson: Lesson,
    learning_paths: Option<PathWithLessons>,
}

#[derive(Debug, Deserialize)]
struct CompletedLesson {
    lesson_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
struct LessonParent {
    learning_path_id: Uuid,
}

/// Published paths, newest first.
pub async fn list_learning_paths(
    gateway: &dyn Gateway,
    filters: &LearningPathFilters,
) -> Result<Vec<LearningPath>, AppError> {
    let mut query = Query::table("learning_paths").eq("is_published", true);
    if let Some(category) = filters.category.as_deref().filter(|c| !c.is_empty()) {
        query = query.eq("category", category);
    }
    let query = query.order_by("created_at", Direction::Desc);
    Ok(fetch_all(gateway, &query).await?)
}

pub async fn get_learning_path(
    gateway: &dyn Gateway,
    path_id: Uuid,
    session: &Session,
) -> Result<LearningPathDetail, AppError> {
    let path_query = Query::table("learning_paths").eq("id", path_id);
    let lessons_query = Query::table("lessons")
        .select(LessonOutline::COLUMNS)
        .eq("learning_path_id", path_id)
        .order_by("order_index", Direction::Asc);

    let (path, lessons, completed) = tokio::join!(
        fetch_optional::<LearningPath>(gateway, &path_query),
        fetch_all::<LessonOutline>(gateway, &lessons_query),
        completed_lesson_ids(gateway, path_id, session),
    );
    let path = path?.ok_or_else(|| AppError::NotFound(format!("Learning path {path_id} not found")))?;

    Ok(LearningPathDetail {
        path,
        lessons: lessons?,
        completed_lesson_ids: completed?,
    })
}

async fn completed_lesson_ids(
    gateway: &dyn Gateway,
    path_id: Uuid,
    session: &Session,
) -> Result<Vec<Uuid>, GatewayError> {
    let Some(user_id) = session.user_id else {
        return Ok(Vec::new());
    };
    let query = Query::table("user_progress")
        .select(&["lesson_id"])
        .eq("user_id", user_id)
        .eq("learning_path_id", path_id)
        .eq("completed", true)
        .order_by("created_at", Direction::Asc);
    let rows: Vec<CompletedLesson> = fetch_all(gateway, &query).await?;
    let mut seen = HashSet::new();
    Ok(rows
        .into_iter()
        .filter_map(|r| r.lesson_id)
        .filter(|id| seen.insert(*id))
        .collect())
}

/// A lesson with its path, the path's lessons in order and the neighbours
/// of this lesson within them.
pub async fn get_lesson(
    gateway: &dyn Gateway,
    lesson_id: Uuid,
    session: &Session,
) -> Result<LessonDetail, AppError> {
    let query = Query::table("lessons").eq("id", lesson_id).embed(
        Embed::new("learning_paths", &[]).with(Embed::new("lessons", LessonOutline::COLUMNS)),
    );

    let (lesson, completed) = tokio::join!(
        fetch_optional::<LessonWithPath>(gateway, &query),
        lesson_completed(gateway, lesson_id, session),
    );
    let row = lesson?.ok_or_else(|| AppError::NotFound(format!("Lesson {lesson_id} not found")))?;

    let (learning_path, mut lessons) = match row.learning_paths {
        Some(parent) => (Some(parent.path), parent.lessons),
        None => (None, Vec::new()),
    };
    lessons.sort_by_key(|l| l.order_index);

    let position = lessons.iter().position(|l| l.id == lesson_id);
    let previous_lesson_id = position
        .and_then(|i| i.checked_sub(1))
        .and_then(|i| lessons.get(i))
        .map(|l| l.id);
    let next_lesson_id = position.and_then(|i| lessons.get(i + 1)).map(|l| l.id);

    Ok(LessonDetail {
        lesson: row.lesson,
        learning_path,
        lessons,
        previous_lesson_id,
        next_lesson_id,
        completed: completed?,
    })
}

async fn lesson_completed(
    gateway: &dyn Gateway,
    lesson_id: Uuid,
    session: &Session,
) -> Result<bool, GatewayError> {
    let Some(user_id) = session.user_id else {
        return Ok(false);
    };
    let query = Query::table("user_progress")
        .eq("user_id", user_id)
        .eq("lesson_id", lesson_id)
        .eq("completed", true);
    Ok(gateway.count(&query).await? > 0)
}

/// Record a lesson as completed for `user_id`. Repeating it only refreshes
/// `completed_at`.
pub async fn mark_lesson_complete(
    gateway: &dyn Gateway,
    user_id: Uuid,
    lesson_id: Uuid,
) -> Result<ProgressRecord, AppError> {
    let query = Query::table("lessons")
        .select(&["learning_path_id"])
        .eq("id", lesson_id);
    let parent: LessonParent = fetch_optional(gateway, &query)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Lesson {lesson_id} not found")))?;

    let row = ProgressUpsert {
        user_id,
        learning_path_id: parent.learning_path_id,
        lesson_id,
        completed: true,
        completed_at: Utc::now(),
    };
    let stored = gateway
        .upsert("user_progress", to_record("user_progress", &row)?, &["user_id", "lesson_id"])
        .await?;
    let progress: ProgressRecord = decode("user_progress", stored)?;
    tracing::info!(%user_id, %lesson_id, "Lesson completed");
    Ok(progress)
}
