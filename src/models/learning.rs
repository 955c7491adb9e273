//! Learning paths, lessons and per-lesson progress.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LearningPath {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub category: Option<String>,
    pub duration_hours: Option<f64>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Path fields attached to a group of progress records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LearningPathSummary {
    pub title: String,
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
}

impl LearningPathSummary {
    pub const COLUMNS: &'static [&'static str] = &["title", "category", "difficulty"];
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Lesson {
    pub id: Uuid,
    pub learning_path_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub video_url: Option<String>,
    pub duration_minutes: Option<i32>,
    pub order_index: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lesson entry in a path's table of contents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LessonOutline {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub duration_minutes: Option<i32>,
    pub order_index: i32,
}

impl LessonOutline {
    pub const COLUMNS: &'static [&'static str] =
        &["id", "title", "description", "duration_minutes", "order_index"];
}

/// One `user_progress` row, optionally with its path summary embedded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressRecord {
    pub id: Uuid,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub learning_path_id: Uuid,
    pub lesson_id: Option<Uuid>,
    #[serde(default, alias = "learning_paths")]
    pub learning_path: Option<LearningPathSummary>,
}

impl ProgressRecord {
    pub const COLUMNS: &'static [&'static str] = &[
        "id",
        "completed",
        "completed_at",
        "learning_path_id",
        "lesson_id",
    ];
}

/// Per-path progress derived from a user's progress records.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LearningProgressView {
    /// The learning path id.
    pub id: Uuid,
    pub completed: bool,
    pub learning_path: Option<LearningPathSummary>,
    pub progress_percent: u8,
    pub completed_lessons: usize,
    pub total_lessons: usize,
}

/// Path page: the path, its ordered lessons and the viewer's completions.
#[derive(Debug, Clone, Serialize)]
pub struct LearningPathDetail {
    #[serde(flatten)]
    pub path: LearningPath,
    pub lessons: Vec<LessonOutline>,
    pub completed_lesson_ids: Vec<Uuid>,
}

/// Lesson page: the lesson, its path, sibling navigation and completion.
#[derive(Debug, Clone, Serialize)]
pub struct LessonDetail {
    #[serde(flatten)]
    pub lesson: Lesson,
    pub learning_path: Option<LearningPath>,
    pub lessons: Vec<LessonOutline>,
    pub previous_lesson_id: Option<Uuid>,
    pub next_lesson_id: Option<Uuid>,
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressUpsert {
    pub user_id: Uuid,
    pub learning_path_id: Uuid,
    pub lesson_id: Uuid,
    pub completed: bool,
    pub completed_at: DateTime<Utc>,
}

/// Query parameters of `GET /api/v1/learning-paths`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LearningPathFilters {
    pub category: Option<String>,
}

/// Lesson entry of `POST /create-learning-path`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateLesson {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub video_url: Option<String>,
    pub duration_minutes: Option<i32>,
    pub order_index: Option<i32>,
}

/// Body of `POST /create-learning-path`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateLearningPath {
    #[serde(default)]
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub category: Option<String>,
    #[validate(range(min = 0.0, message = "duration_hours must be non-negative"))]
    pub duration_hours: Option<f64>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub lessons: Vec<CreateLesson>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewLearningPath {
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub category: Option<String>,
    pub duration_hours: Option<f64>,
    pub is_published: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewLesson {
    pub learning_path_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub video_url: Option<String>,
    pub duration_minutes: Option<i32>,
    pub order_index: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_accepts_only_known_levels() {
        let parsed: Difficulty = serde_json::from_str("\"intermediate\"").unwrap();
        assert_eq!(parsed, Difficulty::Intermediate);
        assert!(serde_json::from_str::<Difficulty>("\"expert\"").is_err());
    }

    #[test]
    fn progress_record_reads_embedded_path() {
        let raw = serde_json::json!({
            "id": Uuid::nil(),
            "completed": true,
            "completed_at": "2026-02-01T08:30:00.000001+00:00",
            "learning_path_id": Uuid::nil(),
            "lesson_id": null,
            "learning_paths": { "title": "Rust", "category": null, "difficulty": "beginner" }
        });
        let record: ProgressRecord = serde_json::from_value(raw).unwrap();
        assert_eq!(record.learning_path.unwrap().difficulty, Some(Difficulty::Beginner));
    }

    #[test]
    fn missing_title_validates_as_empty() {
        let body: CreateLearningPath = serde_json::from_str("{}").unwrap();
        assert!(body.validate().is_err());
    }
}
