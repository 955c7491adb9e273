//! Employer overview: own jobs with received applications and applicant
//! profiles, plus the skill catalogue for posting new jobs.
//!
//! The jobs -> applicant ids -> profiles chain is strictly sequential since
//! each step needs the previous result. The skill catalogue does not depend
//! on it and is read alongside.

use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::gateway::{fetch_all, Direction, Embed, Gateway, GatewayError, Query};
use crate::models::application::ReceivedApplication;
use crate::models::job::{EmployerJob, EmployerJobView, Skill};
use crate::models::role::AppRole;
use crate::services::auth::Session;
use crate::services::dashboard::{settle, DashboardPolicy};
use crate::services::jobs::list_skills;
use crate::services::roles::has_role;
use crate::services::stitch::{distinct_keys, fetch_profiles, stitch};

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct EmployerOverview {
    pub is_employer: bool,
    pub jobs: Vec<EmployerJobView>,
    pub skills: Vec<Skill>,
}

pub async fn load_employer_overview(
    gateway: &dyn Gateway,
    session: &Session,
    policy: &DashboardPolicy,
) -> Result<EmployerOverview, AppError> {
    let Some(user_id) = session.user_id else {
        return Ok(EmployerOverview::default());
    };

    let is_employer = settle(
        "role",
        policy.role,
        user_id,
        has_role(gateway, user_id, AppRole::Employer).await,
    )?;
    if !is_employer {
        return Ok(EmployerOverview::default());
    }

    let (jobs, skills) = tokio::join!(
        load_jobs_with_applicants(gateway, user_id, policy),
        list_skills(gateway),
    );
    let jobs = jobs?;
    let skills = settle("skills", policy.skills, user_id, skills)?;

    Ok(EmployerOverview {
        is_employer,
        jobs,
        skills,
    })
}

async fn load_jobs_with_applicants(
    gateway: &dyn Gateway,
    employer_id: Uuid,
    policy: &DashboardPolicy,
) -> Result<Vec<EmployerJobView>, AppError> {
    let jobs = settle(
        "jobs",
        policy.jobs,
        employer_id,
        fetch_employer_jobs(gateway, employer_id).await,
    )?;

    let applicant_ids = distinct_keys(
        jobs.iter().flat_map(|job| job.applications.iter()),
        |application: &ReceivedApplication| application.applicant_id,
    );
    let profiles = settle(
        "applicant_profiles",
        policy.applicant_profiles,
        employer_id,
        fetch_profiles(gateway, &applicant_ids).await,
    )?;

    Ok(jobs
        .into_iter()
        .map(|job| {
            let mut applications = job.applications;
            applications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            EmployerJobView {
                id: job.id,
                title: job.title,
                description: job.description,
                company_name: job.company_name,
                budget_min: job.budget_min,
                budget_max: job.budget_max,
                duration_days: job.duration_days,
                category: job.category,
                status: job.status,
                created_at: job.created_at,
                applications: stitch(applications, |a| a.applicant_id, &profiles),
            }
        })
        .collect())
}

async fn fetch_employer_jobs(
    gateway: &dyn Gateway,
    employer_id: Uuid,
) -> Result<Vec<EmployerJob>, GatewayError> {
    let query = Query::table("jobs")
        .select(EmployerJob::COLUMNS)
        .eq("employer_id", employer_id)
        .order_by("created_at", Direction::Desc)
        .embed(Embed::new("applications", ReceivedApplication::COLUMNS));
    fetch_all(gateway, &query).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::InMemoryGateway;
    use serde_json::json;

    struct Fixture {
        gw: InMemoryGateway,
        employer: Uuid,
        applicant: Uuid,
    }

    fn fixture() -> Fixture {
        let gw = InMemoryGateway::new();
        let employer = Uuid::new_v4();
        let applicant = Uuid::new_v4();
        gw.seed("user_roles", json!({ "user_id": employer, "role": "employer" }))
            .unwrap();
        gw.seed("profiles", json!({ "id": applicant, "full_name": "Sam Applicant" }))
            .unwrap();
        gw.seed("skills", json!({ "name": "Rust" })).unwrap();
        gw.seed("skills", json!({ "name": "Figma" })).unwrap();

        let older = gw
            .seed("jobs", json!({
                "employer_id": employer,
                "title": "Older",
                "description": "d",
                "created_at": "2026-01-01T00:00:00+00:00",
            }))
            .unwrap();
        gw.seed("jobs", json!({
            "employer_id": employer,
            "title": "Newer",
            "description": "d",
            "created_at": "2026-02-01T00:00:00+00:00",
        }))
        .unwrap();
        gw.seed("applications", json!({ "job_id": older["id"], "applicant_id": applicant }))
            .unwrap();
        Fixture { gw, employer, applicant }
    }

    #[tokio::test]
    async fn anonymous_overview_is_empty_and_call_free() {
        let gw = InMemoryGateway::new();
        let overview = load_employer_overview(&gw, &Session::anonymous(), &DashboardPolicy::default())
            .await
            .unwrap();
        assert_eq!(overview, EmployerOverview::default());
        assert_eq!(gw.calls(), 0);
    }

    #[tokio::test]
    async fn non_employer_stops_after_role_lookup() {
        let f = fixture();
        let overview = load_employer_overview(
            &f.gw,
            &Session::for_user(f.applicant),
            &DashboardPolicy::default(),
        )
        .await
        .unwrap();
        assert!(!overview.is_employer);
        assert!(overview.jobs.is_empty());
        assert_eq!(f.gw.calls(), 1);
    }

    #[tokio::test]
    async fn jobs_carry_stitched_applicant_profiles() {
        let f = fixture();
        let overview = load_employer_overview(
            &f.gw,
            &Session::for_user(f.employer),
            &DashboardPolicy::default(),
        )
        .await
        .unwrap();

        assert!(overview.is_employer);
        let titles: Vec<&str> = overview.jobs.iter().map(|j| j.title.as_str()).collect();
        assert_eq!(titles, vec!["Newer", "Older"]);
        assert!(overview.jobs[0].applications.is_empty());

        let application = &overview.jobs[1].applications[0];
        assert_eq!(application.item.applicant_id, f.applicant);
        assert_eq!(
            application.profile.as_ref().and_then(|p| p.full_name.as_deref()),
            Some("Sam Applicant")
        );

        let skills: Vec<&str> = overview.skills.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(skills, vec!["Figma", "Rust"]);
    }

    #[tokio::test]
    async fn failed_profile_lookup_leaves_applications_unstitched() {
        let f = fixture();
        f.gw.fail_table("profiles");
        let overview = load_employer_overview(
            &f.gw,
            &Session::for_user(f.employer),
            &DashboardPolicy::default(),
        )
        .await
        .unwrap();
        let application = &overview.jobs[1].applications[0];
        assert!(application.profile.is_none());
    }

    #[tokio::test]
    async fn failed_role_lookup_reads_as_not_employer() {
        let f = fixture();
        f.gw.fail_table("user_roles");
        let overview = load_employer_overview(
            &f.gw,
            &Session::for_user(f.employer),
            &DashboardPolicy::default(),
        )
        .await
        .unwrap();
        assert!(!overview.is_employer);

        let strict = DashboardPolicy::from_field_list("role");
        let err = load_employer_overview(&f.gw, &Session::for_user(f.employer), &strict)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
    }

    #[tokio::test]
    async fn no_applications_means_no_profile_lookup() {
        let gw = InMemoryGateway::new();
        let employer = Uuid::new_v4();
        gw.seed("user_roles", json!({ "user_id": employer, "role": "employer" }))
            .unwrap();
        gw.seed("jobs", json!({ "employer_id": employer, "title": "Solo", "description": "d" }))
            .unwrap();
        let overview = load_employer_overview(&gw, &Session::for_user(employer), &DashboardPolicy::default())
            .await
            .unwrap();
        assert_eq!(overview.jobs.len(), 1);
        // role + jobs + skills
        assert_eq!(gw.calls(), 3);
    }
}
