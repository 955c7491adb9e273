//! Development seed script. Populates a fresh database with sample data
//! and prints access tokens for the seeded users.
//!
//! Usage: `cargo run --bin seed`
//!
//! Requires `DATABASE_URL` and `JWT_SECRET` environment variables (reads .env).

use anyhow::Context;
use sqlx::PgPool;
use uuid::{uuid, Uuid};

const LEARNER_ID: Uuid = uuid!("00000000-0000-4000-8000-000000000001");
const EMPLOYER_ID: Uuid = uuid!("00000000-0000-4000-8000-000000000002");
const TOKEN_TTL_SECS: i64 = 7 * 24 * 3600;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let db_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let jwt_secret = std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
    let audience = std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "authenticated".to_string());

    let pool = skilllink::db::create_pool(&db_url, 5, 5).await?;
    skilllink::db::migrate(&pool).await?;

    println!("=== SkillLink Seed Script ===");

    seed_users(&pool).await?;
    let skills = seed_skills(&pool).await?;
    let job_id = seed_job(&pool, &skills).await?;
    seed_learning(&pool).await?;
    seed_payments(&pool, job_id).await?;

    println!("\n=== Seed complete! ===");
    for (label, id) in [("learner", LEARNER_ID), ("employer", EMPLOYER_ID)] {
        let token =
            skilllink::services::auth::issue_token(id, &jwt_secret, &audience, TOKEN_TTL_SECS)?;
        println!("{label} ({id}):\n  Bearer {token}");
    }

    Ok(())
}

async fn seed_users(pool: &PgPool) -> anyhow::Result<()> {
    for (id, name, email, headline) in [
        (LEARNER_ID, "Ada Learner", "ada@skilllink.local", "Aspiring Rust developer"),
        (EMPLOYER_ID, "Grace Employer", "grace@skilllink.local", "Hiring at Acme"),
    ] {
        sqlx::query(
            "INSERT INTO profiles (id, full_name, email, headline)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(headline)
        .execute(pool)
        .await?;
    }

    for (id, role) in [(LEARNER_ID, "learner"), (EMPLOYER_ID, "employer")] {
        sqlx::query(
            "INSERT INTO user_roles (user_id, role) VALUES ($1, $2)
             ON CONFLICT (user_id, role) DO NOTHING",
        )
        .bind(id)
        .bind(role)
        .execute(pool)
        .await?;
    }

    println!("[done] Profiles and roles");
    Ok(())
}

async fn seed_skills(pool: &PgPool) -> anyhow::Result<Vec<Uuid>> {
    let mut ids = Vec::new();
    for (name, category) in [
        ("Rust", "development"),
        ("PostgreSQL", "development"),
        ("Figma", "design"),
        ("Copywriting", "writing"),
    ] {
        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO skills (name, category) VALUES ($1, $2)
             ON CONFLICT (name) DO UPDATE SET category = EXCLUDED.category
             RETURNING id",
        )
        .bind(name)
        .bind(category)
        .fetch_one(pool)
        .await?;
        ids.push(id);
    }
    println!("[done] {} skills", ids.len());
    Ok(ids)
}

async fn seed_job(pool: &PgPool, skills: &[Uuid]) -> anyhow::Result<Uuid> {
    let existing: Option<Uuid> = sqlx::query_scalar(
        "SELECT id FROM jobs WHERE employer_id = $1 AND title = 'Build a Rust API'",
    )
    .bind(EMPLOYER_ID)
    .fetch_optional(pool)
    .await?;
    if let Some(id) = existing {
        println!("[skip] Sample job already exists");
        return Ok(id);
    }

    let job_id: Uuid = sqlx::query_scalar(
        "INSERT INTO jobs (employer_id, title, description, company_name, budget_min, budget_max, duration_days, category, is_verified)
         VALUES ($1, 'Build a Rust API', 'Small axum service with Postgres', 'Acme', 50000, 120000, 30, 'development', TRUE)
         RETURNING id",
    )
    .bind(EMPLOYER_ID)
    .fetch_one(pool)
    .await?;

    for skill_id in skills.iter().take(2) {
        sqlx::query("INSERT INTO job_skills (job_id, skill_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(job_id)
            .bind(skill_id)
            .execute(pool)
            .await?;
    }

    sqlx::query(
        "INSERT INTO applications (job_id, applicant_id, cover_letter, proposed_budget)
         VALUES ($1, $2, 'I have shipped two axum services.', 90000)
         ON CONFLICT (job_id, applicant_id) DO NOTHING",
    )
    .bind(job_id)
    .bind(LEARNER_ID)
    .execute(pool)
    .await?;

    println!("[done] Sample job with one application");
    Ok(job_id)
}

async fn seed_learning(pool: &PgPool) -> anyhow::Result<()> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM learning_paths WHERE title = 'Rust Foundations')",
    )
    .fetch_one(pool)
    .await?;
    if exists {
        println!("[skip] Learning path already exists");
        return Ok(());
    }

    let path_id: Uuid = sqlx::query_scalar(
        "INSERT INTO learning_paths (title, description, difficulty, category, duration_hours, is_published)
         VALUES ('Rust Foundations', 'Ownership, traits and async', 'beginner', 'development', 6.5, TRUE)
         RETURNING id",
    )
    .fetch_one(pool)
    .await?;

    let lessons = ["Ownership", "Borrowing", "Traits", "Async basics"];
    for (index, title) in lessons.iter().enumerate() {
        let lesson_id: Uuid = sqlx::query_scalar(
            "INSERT INTO lessons (learning_path_id, title, duration_minutes, order_index)
             VALUES ($1, $2, 20, $3)
             RETURNING id",
        )
        .bind(path_id)
        .bind(title)
        .bind(index as i32 + 1)
        .fetch_one(pool)
        .await?;

        // First two lessons done for the learner
        if index < 2 {
            sqlx::query(
                "INSERT INTO user_progress (user_id, learning_path_id, lesson_id, completed, completed_at)
                 VALUES ($1, $2, $3, TRUE, NOW())
                 ON CONFLICT (user_id, lesson_id) DO NOTHING",
            )
            .bind(LEARNER_ID)
            .bind(path_id)
            .bind(lesson_id)
            .execute(pool)
            .await?;
        }
    }

    println!("[done] Learning path with {} lessons", lessons.len());
    Ok(())
}

async fn seed_payments(pool: &PgPool, job_id: Uuid) -> anyhow::Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE payee_id = $1")
        .bind(LEARNER_ID)
        .fetch_one(pool)
        .await?;
    if count > 0 {
        println!("[skip] Payments already exist");
        return Ok(());
    }

    for (amount, status) in [(45000_i64, "completed"), (12050, "completed"), (30000, "pending")] {
        sqlx::query(
            "INSERT INTO payments (payer_id, payee_id, job_id, amount, status)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(EMPLOYER_ID)
        .bind(LEARNER_ID)
        .bind(job_id)
        .bind(amount)
        .bind(status)
        .execute(pool)
        .await?;
    }

    println!("[done] Payments");
    Ok(())
}
