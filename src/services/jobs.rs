use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use crate::errors::AppError;
use crate::gateway::{
    decode, eq, fetch_all, fetch_optional, insert_many, insert_one, Direction, Embed, Gateway,
    GatewayError, Query, Record,
};
use crate::models::job::{
    CreateJob, Job, JobDetail, JobFilters, JobSkillRow, JobStatus, NewJob, NewJobSkill, Skill,
};
use crate::services::auth::Session;

#[derive(Debug, Deserialize)]
struct JobWithSkills {
    #[serde(flatten)]
    job: Job,
    #[serde(default)]
    job_skills: Vec<JobSkillRow>,
}

/// Insert a job, then link its skills. Linking is best-effort: malformed
/// ids are skipped, a failed insert is logged, and the job is still returned.
pub async fn create_job(
    gateway: &dyn Gateway,
    new_job: &NewJob,
    skill_ids: &[Value],
) -> Result<Job, GatewayError> {
    let job: Job = insert_one(gateway, "jobs", new_job).await?;

    let links: Vec<NewJobSkill> = skill_ids
        .iter()
        .filter_map(|raw| match parse_skill_id(raw) {
            Some(skill_id) => Some(NewJobSkill {
                job_id: job.id,
                skill_id,
            }),
            None => {
                tracing::error!(job_id = %job.id, skill = %raw, "Skipping malformed skill id");
                None
            }
        })
        .collect();
    if !links.is_empty() {
        if let Err(e) = insert_many::<_, Record>(gateway, "job_skills", &links).await {
            tracing::error!(job_id = %job.id, error = %e, "Failed to link job skills");
        }
    }

    tracing::info!(job_id = %job.id, title = %job.title, "Job created");
    Ok(job)
}

fn parse_skill_id(raw: &Value) -> Option<Uuid> {
    raw.as_str().and_then(|s| Uuid::parse_str(s.trim()).ok())
}

/// Post a job as the calling employer.
pub async fn post_job(
    gateway: &dyn Gateway,
    employer_id: Uuid,
    input: CreateJob,
) -> Result<Job, AppError> {
    let input = input.normalized();
    input.validate()?;

    let new_job = NewJob {
        employer_id: Some(employer_id),
        title: input.title,
        description: input.description,
        company_name: input.company_name,
        company_logo: input.company_logo,
        budget_min: input.budget_min,
        budget_max: input.budget_max,
        duration_days: input.duration_days,
        category: input.category,
        status: JobStatus::Open,
        is_verified: false,
    };
    Ok(create_job(gateway, &new_job, &input.skills).await?)
}

/// Flip an own job between open and closed.
pub async fn toggle_job_status(
    gateway: &dyn Gateway,
    employer_id: Uuid,
    job_id: Uuid,
) -> Result<Job, AppError> {
    let query = Query::table("jobs")
        .eq("id", job_id)
        .eq("employer_id", employer_id);
    let job: Job = fetch_optional(gateway, &query)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;

    let next = job.status.toggled();
    let mut patch = Record::new();
    patch.insert("status".to_string(), json!(next));
    patch.insert("updated_at".to_string(), json!(Utc::now()));

    let filters = [
        eq("id", job_id),
        eq("employer_id", employer_id),
        eq("status", job.status),
    ];
    let mut updated = gateway.update("jobs", &filters, patch).await?;
    let Some(record) = updated.pop() else {
        return Err(AppError::Conflict(format!(
            "Job {job_id} status changed concurrently"
        )));
    };
    let job: Job = decode("jobs", record)?;
    tracing::info!(job_id = %job.id, status = ?job.status, "Job status toggled");
    Ok(job)
}

/// Open jobs, newest first.
pub async fn list_jobs(gateway: &dyn Gateway, filters: &JobFilters) -> Result<Vec<Job>, AppError> {
    let mut query = Query::table("jobs").eq("status", JobStatus::Open);
    if let Some(category) = filters.category.as_deref().filter(|c| !c.is_empty()) {
        query = query.eq("category", category);
    }
    let query = query
        .order_by("created_at", Direction::Desc)
        .limit(filters.limit());
    Ok(fetch_all(gateway, &query).await?)
}

/// One job with its skills, and whether the viewer already applied.
pub async fn get_job(
    gateway: &dyn Gateway,
    job_id: Uuid,
    session: &Session,
) -> Result<JobDetail, AppError> {
    let query = Query::table("jobs").eq("id", job_id).embed(
        Embed::new("job_skills", &["skill_id"]).with(Embed::new("skills", Skill::COLUMNS)),
    );

    let (job, has_applied) = tokio::join!(
        fetch_optional::<JobWithSkills>(gateway, &query),
        has_applied(gateway, job_id, session),
    );
    let row = job?.ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;

    let mut skills: Vec<Skill> = row.job_skills.into_iter().filter_map(|js| js.skill).collect();
    skills.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(JobDetail {
        job: row.job,
        skills,
        has_applied: has_applied?,
    })
}

async fn has_applied(
    gateway: &dyn Gateway,
    job_id: Uuid,
    session: &Session,
) -> Result<bool, GatewayError> {
    let Some(user_id) = session.user_id else {
        return Ok(false);
    };
    let query = Query::table("applications")
        .eq("job_id", job_id)
        .eq("applicant_id", user_id);
    Ok(gateway.count(&query).await? > 0)
}

/// Skill catalogue ordered by name.
pub async fn list_skills(gateway: &dyn Gateway) -> Result<Vec<Skill>, GatewayError> {
    let query = Query::table("skills")
        .select(Skill::COLUMNS)
        .order_by("name", Direction::Asc);
    fetch_all(gateway, &query).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::InMemoryGateway;

    fn create_input(title: &str, skills: Vec<Uuid>) -> CreateJob {
        serde_json::from_value(json!({
            "title": title,
            "description": "  Build a storefront  ",
            "company_name": "",
            "budget_min": 500,
            "skills": skills,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn post_job_trims_and_links_skills() {
        let gw = InMemoryGateway::new();
        let employer = Uuid::new_v4();
        let skill = gw.seed("skills", json!({ "name": "Rust" })).unwrap();
        let skill_id: Uuid = skill["id"].as_str().unwrap().parse().unwrap();

        let job = post_job(&gw, employer, create_input(" Shop ", vec![skill_id]))
            .await
            .unwrap();
        assert_eq!(job.title, "Shop");
        assert_eq!(job.description, "Build a storefront");
        assert_eq!(job.company_name, None);
        assert_eq!(job.status, JobStatus::Open);
        assert_eq!(job.employer_id, Some(employer));
        assert_eq!(gw.rows("job_skills").len(), 1);

        let detail = get_job(&gw, job.id, &Session::anonymous()).await.unwrap();
        assert_eq!(detail.skills.len(), 1);
        assert_eq!(detail.skills[0].name, "Rust");
        assert!(!detail.has_applied);
    }

    #[tokio::test]
    async fn blank_title_is_rejected_before_any_write() {
        let gw = InMemoryGateway::new();
        let err = post_job(&gw, Uuid::new_v4(), create_input("   ", vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "title is required"));
        assert_eq!(gw.calls(), 0);
    }

    #[tokio::test]
    async fn skill_link_failure_keeps_the_job() {
        let gw = InMemoryGateway::new();
        gw.fail_table("job_skills");
        let job = post_job(&gw, Uuid::new_v4(), create_input("Shop", vec![Uuid::new_v4()]))
            .await
            .unwrap();
        assert_eq!(gw.rows("jobs").len(), 1);
        assert_eq!(job.title, "Shop");
    }

    #[tokio::test]
    async fn malformed_skill_ids_are_skipped() {
        let gw = InMemoryGateway::new();
        let skill = gw.seed("skills", json!({ "name": "Rust" })).unwrap();
        let input: CreateJob = serde_json::from_value(json!({
            "title": "Shop",
            "description": "d",
            "skills": ["not-a-uuid", 42, skill["id"]],
        }))
        .unwrap();

        let job = post_job(&gw, Uuid::new_v4(), input).await.unwrap();
        let links = gw.rows("job_skills");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0]["job_id"], json!(job.id));
        assert_eq!(links[0]["skill_id"], skill["id"]);
    }

    #[tokio::test]
    async fn toggle_only_touches_own_job() {
        let gw = InMemoryGateway::new();
        let employer = Uuid::new_v4();
        let job = post_job(&gw, employer, create_input("Shop", vec![])).await.unwrap();

        let closed = toggle_job_status(&gw, employer, job.id).await.unwrap();
        assert_eq!(closed.status, JobStatus::Closed);
        let reopened = toggle_job_status(&gw, employer, job.id).await.unwrap();
        assert_eq!(reopened.status, JobStatus::Open);

        let err = toggle_job_status(&gw, Uuid::new_v4(), job.id).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn list_jobs_returns_open_jobs_newest_first() {
        let gw = InMemoryGateway::new();
        for (title, status, day) in [("a", "open", 1), ("b", "closed", 2), ("c", "open", 3)] {
            gw.seed("jobs", json!({
                "title": title,
                "description": "d",
                "status": status,
                "category": "design",
                "created_at": format!("2026-01-0{day}T00:00:00+00:00"),
            }))
            .unwrap();
        }
        let jobs = list_jobs(&gw, &JobFilters::default()).await.unwrap();
        let titles: Vec<&str> = jobs.iter().map(|j| j.title.as_str()).collect();
        assert_eq!(titles, vec!["c", "a"]);

        let filtered = list_jobs(
            &gw,
            &JobFilters {
                category: Some("writing".to_string()),
                limit: None,
            },
        )
        .await
        .unwrap();
        assert!(filtered.is_empty());
    }

    #[tokio::test]
    async fn get_job_reports_viewer_application() {
        let gw = InMemoryGateway::new();
        let user = Uuid::new_v4();
        let job = gw.seed("jobs", json!({ "title": "t", "description": "d" })).unwrap();
        let job_id: Uuid = job["id"].as_str().unwrap().parse().unwrap();
        gw.seed("applications", json!({ "job_id": job_id, "applicant_id": user }))
            .unwrap();

        let detail = get_job(&gw, job_id, &Session::for_user(user)).await.unwrap();
        assert!(detail.has_applied);
        assert!(get_job(&gw, Uuid::new_v4(), &Session::anonymous())
            .await
            .unwrap_err()
            .is_not_found());
    }
}
