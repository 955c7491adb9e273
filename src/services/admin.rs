//! Back-office writes behind the API key: jobs and learning paths.
//!
//! Skill links on a job are best-effort. Lessons on a learning path are
//! not: a failed lesson batch fails the request, but the path row already
//! written stays in place.

use serde::Serialize;
use validator::Validate;

use crate::errors::AdminError;
use crate::gateway::{insert_many, insert_one, Gateway};
use crate::models::job::{AdminCreateJob, Job, NewJob};
use crate::models::learning::{CreateLearningPath, LearningPath, Lesson, NewLearningPath, NewLesson};
use crate::services::jobs::create_job;

#[derive(Debug, Serialize)]
pub struct CreatedJob {
    pub success: bool,
    pub job: Job,
}

#[derive(Debug, Serialize)]
pub struct CreatedLearningPath {
    pub success: bool,
    #[serde(rename = "learningPath")]
    pub learning_path: LearningPath,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lessons: Option<Vec<Lesson>>,
}

pub async fn create_job_from_admin(
    gateway: &dyn Gateway,
    body: AdminCreateJob,
) -> Result<CreatedJob, AdminError> {
    let input = body.job.normalized();
    input.validate()?;

    let new_job = NewJob {
        employer_id: body.employer_id,
        title: input.title,
        description: input.description,
        company_name: input.company_name,
        company_logo: input.company_logo,
        budget_min: input.budget_min,
        budget_max: input.budget_max,
        duration_days: input.duration_days,
        category: input.category,
        status: body.status,
        is_verified: body.is_verified,
    };
    let job = create_job(gateway, &new_job, &input.skills).await?;
    Ok(CreatedJob { success: true, job })
}

pub async fn create_learning_path(
    gateway: &dyn Gateway,
    body: CreateLearningPath,
) -> Result<CreatedLearningPath, AdminError> {
    let body = CreateLearningPath {
        title: body.title.trim().to_string(),
        ..body
    };
    body.validate()?;

    let new_path = NewLearningPath {
        title: body.title,
        description: body.description,
        image_url: body.image_url,
        difficulty: body.difficulty,
        category: body.category,
        duration_hours: body.duration_hours,
        is_published: body.is_published,
    };
    let learning_path: LearningPath = insert_one(gateway, "learning_paths", &new_path).await?;
    tracing::info!(learning_path_id = %learning_path.id, title = %learning_path.title, "Learning path created");

    if body.lessons.is_empty() {
        return Ok(CreatedLearningPath {
            success: true,
            learning_path,
            lessons: None,
        });
    }

    let mut rows = Vec::with_capacity(body.lessons.len());
    for (index, lesson) in body.lessons.into_iter().enumerate() {
        let position = index + 1;
        let Some(title) = lesson.title.filter(|t| !t.trim().is_empty()) else {
            tracing::error!(
                learning_path_id = %learning_path.id,
                position,
                "Lesson without title, lessons not created"
            );
            return Err(AdminError::Upstream(format!(
                "Lesson {position} is missing a title"
            )));
        };
        rows.push(NewLesson {
            learning_path_id: learning_path.id,
            title,
            description: lesson.description,
            content: lesson.content,
            video_url: lesson.video_url,
            duration_minutes: lesson.duration_minutes,
            order_index: lesson
                .order_index
                .unwrap_or_else(|| i32::try_from(position).unwrap_or(i32::MAX)),
        });
    }

    let lessons: Vec<Lesson> = insert_many(gateway, "lessons", &rows).await.map_err(|e| {
        tracing::error!(learning_path_id = %learning_path.id, error = %e, "Failed to create lessons");
        AdminError::from(e)
    })?;
    tracing::info!(learning_path_id = %learning_path.id, count = lessons.len(), "Lessons created");

    Ok(CreatedLearningPath {
        success: true,
        learning_path,
        lessons: Some(lessons),
    })
}
