//! Learner dashboard aggregation.
//!
//! One load issues four independent reads (profile, recent applications,
//! all progress records, recent payments) concurrently, then reduces them
//! into a [`DashboardSnapshot`] with pure functions. A failed read is either
//! replaced by an empty value or turned into an error of the whole load,
//! as chosen per field by [`DashboardPolicy`].

use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::errors::AppError;
use crate::gateway::{fetch_all, fetch_optional, Direction, Embed, Gateway, GatewayError, Query};
use crate::models::application::ApplicationSummary;
use crate::models::job::JobSummary;
use crate::models::learning::{LearningPathSummary, LearningProgressView, ProgressRecord};
use crate::models::payment::{Payment, PaymentStatus};
use crate::models::profile::Profile;
use crate::services::auth::Session;
use crate::services::sequencing::Sequencer;

/// Rows fetched for the recent applications and payments lists.
pub const RECENT_LIMIT: i64 = 5;

pub type DashboardSequencer = Sequencer<DashboardSnapshot>;

/// What to do when one sub-fetch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log and continue with an empty value for that field.
    #[default]
    Substitute,
    /// Fail the whole load.
    Propagate,
}

/// Per-field failure handling for the dashboard and employer views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DashboardPolicy {
    pub profile: FailurePolicy,
    pub applications: FailurePolicy,
    pub progress: FailurePolicy,
    pub payments: FailurePolicy,
    pub role: FailurePolicy,
    pub jobs: FailurePolicy,
    pub applicant_profiles: FailurePolicy,
    pub skills: FailurePolicy,
}

impl DashboardPolicy {
    /// Parse a comma separated list of fields that should propagate,
    /// e.g. `"payments, jobs"`. Unknown names are logged and ignored.
    pub fn from_field_list(list: &str) -> Self {
        let mut policy = Self::default();
        for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            let field = match name {
                "profile" => &mut policy.profile,
                "applications" => &mut policy.applications,
                "progress" => &mut policy.progress,
                "payments" => &mut policy.payments,
                "role" => &mut policy.role,
                "jobs" => &mut policy.jobs,
                "applicant_profiles" => &mut policy.applicant_profiles,
                "skills" => &mut policy.skills,
                other => {
                    tracing::warn!(field = other, "Unknown dashboard field in failure policy");
                    continue;
                }
            };
            *field = FailurePolicy::Propagate;
        }
        policy
    }
}

/// Apply `policy` to one sub-fetch result.
pub(crate) fn settle<T: Default>(
    field: &'static str,
    policy: FailurePolicy,
    user_id: Uuid,
    result: Result<T, GatewayError>,
) -> Result<T, AppError> {
    match result {
        Ok(value) => Ok(value),
        Err(e) => match policy {
            FailurePolicy::Substitute => {
                tracing::warn!(%user_id, field, error = %e, "Sub-fetch failed, substituting empty value");
                Ok(T::default())
            }
            FailurePolicy::Propagate => Err(e.into()),
        },
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct DashboardStats {
    /// Completed payments, major currency units.
    pub total_earned: f64,
    /// Pending and processing payments, major currency units.
    pub pending_earnings: f64,
    /// Length of the fetched applications page, not a full count.
    pub total_applications: usize,
    pub completed_lessons: usize,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct DashboardSnapshot {
    pub profile: Option<Profile>,
    pub applications: Vec<ApplicationSummary>,
    pub learning_progress: Vec<LearningProgressView>,
    pub payments: Vec<Payment>,
    pub stats: DashboardStats,
}

/// Load the dashboard for the session's user; empty and call-free when
/// nobody is signed in.
pub async fn load_dashboard(
    gateway: &dyn Gateway,
    session: &Session,
    policy: &DashboardPolicy,
) -> Result<DashboardSnapshot, AppError> {
    let Some(user_id) = session.user_id else {
        return Ok(DashboardSnapshot::default());
    };

    let (profile, applications, progress, payments) = tokio::join!(
        fetch_profile(gateway, user_id),
        fetch_recent_applications(gateway, user_id),
        fetch_progress(gateway, user_id),
        fetch_recent_payments(gateway, user_id),
    );

    let profile = settle("profile", policy.profile, user_id, profile)?;
    let applications = settle("applications", policy.applications, user_id, applications)?;
    let progress = settle("progress", policy.progress, user_id, progress)?;
    let payments = settle("payments", policy.payments, user_id, payments)?;

    Ok(build_snapshot(profile, applications, &progress, payments))
}

/// [`load_dashboard`] behind the per-user sequencing guard: if a newer load
/// for the same user finished first, its snapshot is returned instead.
pub async fn load_dashboard_latest(
    gateway: &dyn Gateway,
    sequencer: &DashboardSequencer,
    session: &Session,
    policy: &DashboardPolicy,
) -> Result<DashboardSnapshot, AppError> {
    let Some(user_id) = session.user_id else {
        return Ok(DashboardSnapshot::default());
    };
    let ticket = sequencer.begin(user_id);
    let snapshot = load_dashboard(gateway, session, policy).await?;
    let outcome = ticket.publish(snapshot);
    if outcome.is_superseded() {
        tracing::debug!(%user_id, "Dashboard load superseded by a newer one");
    }
    Ok(outcome.into_inner())
}

/// Pure reduction of fetched rows into a snapshot.
pub fn build_snapshot(
    profile: Option<Profile>,
    applications: Vec<ApplicationSummary>,
    progress: &[ProgressRecord],
    payments: Vec<Payment>,
) -> DashboardSnapshot {
    let totals = summarize_payments(&payments);
    let stats = DashboardStats {
        total_earned: totals.total_earned,
        pending_earnings: totals.pending_earnings,
        total_applications: applications.len(),
        completed_lessons: progress.iter().filter(|p| p.completed).count(),
    };
    DashboardSnapshot {
        profile,
        applications,
        learning_progress: group_progress(progress),
        payments,
        stats,
    }
}

/// Round-half-up integer percentage; `total` must be non-zero.
/// Only a fully completed path reports 100.
pub fn percent(completed: usize, total: usize) -> u8 {
    let pct = (200 * completed + total) / (2 * total);
    let cap = if completed < total { 99 } else { 100 };
    pct.min(cap) as u8
}

/// Group progress records by learning path in first-seen order.
pub fn group_progress(records: &[ProgressRecord]) -> Vec<LearningProgressView> {
    struct Group {
        path_id: Uuid,
        summary: Option<LearningPathSummary>,
        total: usize,
        completed: usize,
    }

    let mut index: HashMap<Uuid, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();
    for record in records {
        let slot = *index.entry(record.learning_path_id).or_insert_with(|| {
            groups.push(Group {
                path_id: record.learning_path_id,
                summary: record.learning_path.clone(),
                total: 0,
                completed: 0,
            });
            groups.len() - 1
        });
        let group = &mut groups[slot];
        group.total += 1;
        if record.completed {
            group.completed += 1;
        }
    }

    groups
        .into_iter()
        .map(|g| LearningProgressView {
            id: g.path_id,
            completed: g.total > 0 && g.completed == g.total,
            learning_path: g.summary,
            progress_percent: percent(g.completed, g.total),
            completed_lessons: g.completed,
            total_lessons: g.total,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PaymentTotals {
    pub total_earned: f64,
    pub pending_earnings: f64,
}

/// Sum completed and pending/processing payments. Amounts are summed in
/// minor units and converted once; negative amounts and unknown statuses
/// count in neither bucket.
pub fn summarize_payments(payments: &[Payment]) -> PaymentTotals {
    let mut earned: i64 = 0;
    let mut pending: i64 = 0;
    for payment in payments {
        if payment.amount < 0 {
            tracing::warn!(payment_id = %payment.id, amount = payment.amount, "Ignoring negative payment amount");
            continue;
        }
        match &payment.status {
            PaymentStatus::Completed => earned = earned.saturating_add(payment.amount),
            PaymentStatus::Pending | PaymentStatus::Processing => {
                pending = pending.saturating_add(payment.amount)
            }
            PaymentStatus::Other(status) => {
                tracing::debug!(payment_id = %payment.id, status = %status, "Payment status counts in no bucket");
            }
        }
    }
    PaymentTotals {
        total_earned: earned as f64 / 100.0,
        pending_earnings: pending as f64 / 100.0,
    }
}

async fn fetch_profile(gateway: &dyn Gateway, user_id: Uuid) -> Result<Option<Profile>, GatewayError> {
    let query = Query::table("profiles")
        .select(Profile::COLUMNS)
        .eq("id", user_id);
    fetch_optional(gateway, &query).await
}

async fn fetch_recent_applications(
    gateway: &dyn Gateway,
    user_id: Uuid,
) -> Result<Vec<ApplicationSummary>, GatewayError> {
    let query = Query::table("applications")
        .select(ApplicationSummary::COLUMNS)
        .eq("applicant_id", user_id)
        .order_by("created_at", Direction::Desc)
        .limit(RECENT_LIMIT)
        .embed(Embed::new("jobs", JobSummary::COLUMNS));
    fetch_all(gateway, &query).await
}

async fn fetch_progress(gateway: &dyn Gateway, user_id: Uuid) -> Result<Vec<ProgressRecord>, GatewayError> {
    let query = Query::table("user_progress")
        .select(ProgressRecord::COLUMNS)
        .eq("user_id", user_id)
        .order_by("created_at", Direction::Asc)
        .embed(Embed::new("learning_paths", LearningPathSummary::COLUMNS));
    fetch_all(gateway, &query).await
}

async fn fetch_recent_payments(gateway: &dyn Gateway, user_id: Uuid) -> Result<Vec<Payment>, GatewayError> {
    let query = Query::table("payments")
        .select(Payment::COLUMNS)
        .eq("payee_id", user_id)
        .order_by("created_at", Direction::Desc)
        .limit(RECENT_LIMIT);
    fetch_all(gateway, &query).await
}
