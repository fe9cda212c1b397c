use quiz_core::model::{QuizAttempt, UserProfile, UserProgress};
use sqlx::{Sqlite, Transaction};

use super::SqliteRepository;
use super::mapping::{db, ser, u64_to_i64};
use crate::repository::{EvaluationCommit, EvaluationPersistence, StorageError};

fn expect_one_row(rows_affected: u64, what: &'static str) -> Result<(), StorageError> {
    if rows_affected == 1 {
        Ok(())
    } else {
        tracing::debug!(what, "evaluation commit conflict");
        Err(StorageError::Conflict)
    }
}

async fn complete_quiz(
    tx: &mut Transaction<'_, Sqlite>,
    quiz: &QuizAttempt,
) -> Result<(), StorageError> {
    let summary = quiz
        .summary()
        .ok_or_else(|| StorageError::Serialization("quiz has no score summary".into()))?;
    let completed_at = quiz
        .completed_at()
        .ok_or_else(|| StorageError::Serialization("quiz has no completion time".into()))?;

    let result = sqlx::query(
        r"
        UPDATE quizzes
        SET score = ?1, total = ?2, percentage = ?3, xp_earned = ?4, completed_at = ?5
        WHERE id = ?6 AND completed_at IS NULL
        ",
    )
    .bind(i64::from(summary.score))
    .bind(i64::from(summary.total))
    .bind(i64::from(summary.percentage))
    .bind(i64::from(summary.xp_earned))
    .bind(completed_at)
    .bind(quiz.id().to_string())
    .execute(&mut **tx)
    .await
    .map_err(db)?;
    expect_one_row(result.rows_affected(), "quiz")?;

    for question in quiz.questions() {
        let outcome = question
            .outcome()
            .ok_or_else(|| StorageError::Serialization("question has no outcome".into()))?;
        let result = sqlx::query(
            r"
            UPDATE questions
            SET user_answer = ?1, is_correct = ?2, xp_earned = ?3
            WHERE id = ?4 AND quiz_id = ?5
            ",
        )
        .bind(serde_json::to_string(&outcome.submitted).map_err(ser)?)
        .bind(outcome.is_correct)
        .bind(i64::from(outcome.xp_earned))
        .bind(question.id().to_string())
        .bind(quiz.id().to_string())
        .execute(&mut **tx)
        .await
        .map_err(db)?;
        expect_one_row(result.rows_affected(), "question")?;
    }
    Ok(())
}

async fn store_profile(
    tx: &mut Transaction<'_, Sqlite>,
    profile: &UserProfile,
) -> Result<(), StorageError> {
    let total_xp = u64_to_i64("total_xp", profile.total_xp())?;
    let result = if profile.version() == 0 {
        sqlx::query(
            r"
            INSERT INTO user_profiles (
                user_id, total_xp, level, current_streak, last_quiz_date, version
            )
            VALUES (?1, ?2, ?3, ?4, ?5, 1)
            ON CONFLICT(user_id) DO NOTHING
            ",
        )
        .bind(profile.user_id().to_string())
        .bind(total_xp)
        .bind(i64::from(profile.level()))
        .bind(i64::from(profile.current_streak()))
        .bind(profile.last_quiz_date())
        .execute(&mut **tx)
        .await
    } else {
        sqlx::query(
            r"
            UPDATE user_profiles
            SET total_xp = ?2, level = ?3, current_streak = ?4, last_quiz_date = ?5,
                version = version + 1
            WHERE user_id = ?1 AND version = ?6
            ",
        )
        .bind(profile.user_id().to_string())
        .bind(total_xp)
        .bind(i64::from(profile.level()))
        .bind(i64::from(profile.current_streak()))
        .bind(profile.last_quiz_date())
        .bind(u64_to_i64("version", profile.version())?)
        .execute(&mut **tx)
        .await
    }
    .map_err(db)?;
    expect_one_row(result.rows_affected(), "profile")
}

async fn store_progress(
    tx: &mut Transaction<'_, Sqlite>,
    progress: &UserProgress,
) -> Result<(), StorageError> {
    let user_id = progress.user_id().to_string();
    let certification_id = progress.certification_id().to_string();
    let total_xp = u64_to_i64("total_xp", progress.total_xp())?;

    let result = if progress.version() == 0 {
        sqlx::query(
            r"
            INSERT INTO user_progress (
                user_id, certification_id, total_xp, total_quizzes,
                total_questions_answered, correct_answers, current_difficulty,
                updated_at, version
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1)
            ON CONFLICT(user_id, certification_id) DO NOTHING
            ",
        )
        .bind(&user_id)
        .bind(&certification_id)
        .bind(total_xp)
        .bind(i64::from(progress.total_quizzes()))
        .bind(i64::from(progress.total_questions_answered()))
        .bind(i64::from(progress.correct_answers()))
        .bind(progress.current_difficulty().as_str())
        .bind(progress.updated_at())
        .execute(&mut **tx)
        .await
    } else {
        sqlx::query(
            r"
            UPDATE user_progress
            SET total_xp = ?3, total_quizzes = ?4, total_questions_answered = ?5,
                correct_answers = ?6, current_difficulty = ?7, updated_at = ?8,
                version = version + 1
            WHERE user_id = ?1 AND certification_id = ?2 AND version = ?9
            ",
        )
        .bind(&user_id)
        .bind(&certification_id)
        .bind(total_xp)
        .bind(i64::from(progress.total_quizzes()))
        .bind(i64::from(progress.total_questions_answered()))
        .bind(i64::from(progress.correct_answers()))
        .bind(progress.current_difficulty().as_str())
        .bind(progress.updated_at())
        .bind(u64_to_i64("version", progress.version())?)
        .execute(&mut **tx)
        .await
    }
    .map_err(db)?;
    expect_one_row(result.rows_affected(), "progress")?;

    for (domain, accuracy) in progress.domains().iter() {
        sqlx::query(
            r"
            INSERT INTO progress_domains (user_id, certification_id, domain, seen, correct)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(user_id, certification_id, domain) DO UPDATE SET
                seen = excluded.seen,
                correct = excluded.correct
            ",
        )
        .bind(&user_id)
        .bind(&certification_id)
        .bind(domain)
        .bind(i64::from(accuracy.seen()))
        .bind(i64::from(accuracy.correct()))
        .execute(&mut **tx)
        .await
        .map_err(db)?;
    }
    Ok(())
}

#[async_trait::async_trait]
impl EvaluationPersistence for SqliteRepository {
    async fn commit_evaluation(&self, commit: &EvaluationCommit) -> Result<(), StorageError> {
        // Any early return drops `tx`, which rolls everything back.
        let mut tx = self.pool.begin().await.map_err(db)?;

        complete_quiz(&mut tx, &commit.quiz).await?;
        store_profile(&mut tx, &commit.profile).await?;
        store_progress(&mut tx, &commit.progress).await?;

        for achievement in &commit.achievements {
            let result = sqlx::query(
                r"
                INSERT INTO achievements (user_id, kind, earned_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(user_id, kind) DO NOTHING
                ",
            )
            .bind(achievement.user_id().to_string())
            .bind(achievement.kind().as_str())
            .bind(achievement.earned_at())
            .execute(&mut *tx)
            .await
            .map_err(db)?;
            expect_one_row(result.rows_affected(), "achievement")?;
        }

        tx.commit().await.map_err(db)?;
        Ok(())
    }
}
