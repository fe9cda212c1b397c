use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs the versioned schema migrations. Safe to call on every start.
///
/// Version 1 creates quizzes with their questions, the per-user profile, the
/// per-certification progress with its domain counters, and achievements.
#[allow(clippy::too_many_lines)]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS quizzes (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    certification_id TEXT NOT NULL,
                    difficulty TEXT NOT NULL CHECK (difficulty IN ('easy', 'medium', 'hard')),
                    created_at TEXT NOT NULL,
                    score INTEGER CHECK (score >= 0),
                    total INTEGER CHECK (total > 0),
                    percentage INTEGER CHECK (percentage BETWEEN 0 AND 100),
                    xp_earned INTEGER CHECK (xp_earned >= 0),
                    completed_at TEXT,
                    CHECK (score IS NULL OR score <= total)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS questions (
                    id TEXT PRIMARY KEY,
                    quiz_id TEXT NOT NULL,
                    position INTEGER NOT NULL CHECK (position >= 0),
                    text TEXT NOT NULL,
                    question_type TEXT NOT NULL,
                    options TEXT NOT NULL,
                    correct_answer TEXT NOT NULL,
                    explanation TEXT,
                    domain TEXT NOT NULL,
                    difficulty TEXT NOT NULL CHECK (difficulty IN ('easy', 'medium', 'hard')),
                    user_answer TEXT,
                    is_correct INTEGER CHECK (is_correct IN (0, 1)),
                    xp_earned INTEGER CHECK (xp_earned >= 0),
                    UNIQUE (quiz_id, position),
                    FOREIGN KEY (quiz_id) REFERENCES quizzes(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS user_profiles (
                    user_id TEXT PRIMARY KEY,
                    total_xp INTEGER NOT NULL CHECK (total_xp >= 0),
                    level INTEGER NOT NULL CHECK (level >= 1),
                    current_streak INTEGER NOT NULL CHECK (current_streak >= 0),
                    last_quiz_date TEXT,
                    version INTEGER NOT NULL CHECK (version >= 1)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS user_progress (
                    user_id TEXT NOT NULL,
                    certification_id TEXT NOT NULL,
                    total_xp INTEGER NOT NULL CHECK (total_xp >= 0),
                    total_quizzes INTEGER NOT NULL CHECK (total_quizzes >= 0),
                    total_questions_answered INTEGER NOT NULL CHECK (total_questions_answered >= 0),
                    correct_answers INTEGER NOT NULL CHECK (correct_answers >= 0),
                    current_difficulty TEXT NOT NULL
                        CHECK (current_difficulty IN ('easy', 'medium', 'hard')),
                    updated_at TEXT,
                    version INTEGER NOT NULL CHECK (version >= 1),
                    PRIMARY KEY (user_id, certification_id),
                    CHECK (correct_answers <= total_questions_answered)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS progress_domains (
                    user_id TEXT NOT NULL,
                    certification_id TEXT NOT NULL,
                    domain TEXT NOT NULL,
                    seen INTEGER NOT NULL CHECK (seen >= 0),
                    correct INTEGER NOT NULL CHECK (correct >= 0),
                    PRIMARY KEY (user_id, certification_id, domain),
                    CHECK (correct <= seen),
                    FOREIGN KEY (user_id, certification_id)
                        REFERENCES user_progress(user_id, certification_id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS achievements (
                    id INTEGER PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    kind TEXT NOT NULL,
                    earned_at TEXT NOT NULL,
                    UNIQUE (user_id, kind)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_quizzes_user_cert_created
                    ON quizzes (user_id, certification_id, created_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_achievements_user_earned
                    ON achievements (user_id, earned_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::debug!(version = 1, "applied schema migration");
    }

    Ok(())
}
