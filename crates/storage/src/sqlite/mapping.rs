use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use quiz_core::domains::{DomainAccuracy, DomainStats};
use quiz_core::model::{
    Achievement, AchievementKind, AnswerKey, Difficulty, QuestionOutcome, QuestionRecord,
    QuizAttempt, SubmittedAnswer, UserProfile, UserProgress,
};
use quiz_core::scoring::ScoreSummary;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Map driver errors; unique-key violations become `Conflict`.
pub(crate) fn db(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(inner) if inner.is_unique_violation() => StorageError::Conflict,
        _ => StorageError::Connection(e.to_string()),
    }
}

pub(crate) fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} out of range: {v}")))
}

pub(crate) fn u64_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn parse<T>(row: &SqliteRow, column: &str) -> Result<T, StorageError>
where
    T: FromStr,
    T::Err: core::fmt::Display,
{
    row.try_get::<String, _>(column)
        .map_err(ser)?
        .parse::<T>()
        .map_err(ser)
}

fn get_u32(row: &SqliteRow, column: &'static str) -> Result<u32, StorageError> {
    i64_to_u32(column, row.try_get::<i64, _>(column).map_err(ser)?)
}

fn get_opt_u32(row: &SqliteRow, column: &'static str) -> Result<Option<u32>, StorageError> {
    row.try_get::<Option<i64>, _>(column)
        .map_err(ser)?
        .map(|v| i64_to_u32(column, v))
        .transpose()
}

pub(crate) fn map_question_row(row: &SqliteRow) -> Result<QuestionRecord, StorageError> {
    let question_type: String = row.try_get("question_type").map_err(ser)?;
    let raw_key: String = row.try_get("correct_answer").map_err(ser)?;
    let key_json: serde_json::Value = serde_json::from_str(&raw_key).map_err(ser)?;
    let key = AnswerKey::from_parts(&question_type, &key_json)?;

    let options: Vec<String> =
        serde_json::from_str(&row.try_get::<String, _>("options").map_err(ser)?).map_err(ser)?;

    let outcome = match row.try_get::<Option<String>, _>("user_answer").map_err(ser)? {
        Some(raw) => {
            let submitted: SubmittedAnswer = serde_json::from_str(&raw).map_err(ser)?;
            let is_correct = row
                .try_get::<Option<bool>, _>("is_correct")
                .map_err(ser)?
                .ok_or_else(|| StorageError::Serialization("missing is_correct".into()))?;
            let xp_earned = get_opt_u32(row, "xp_earned")?
                .ok_or_else(|| StorageError::Serialization("missing xp_earned".into()))?;
            Some(QuestionOutcome {
                submitted,
                is_correct,
                xp_earned,
            })
        }
        None => None,
    };

    Ok(QuestionRecord::from_persisted(
        parse(row, "id")?,
        row.try_get("text").map_err(ser)?,
        options,
        key,
        row.try_get("explanation").map_err(ser)?,
        row.try_get("domain").map_err(ser)?,
        parse::<Difficulty>(row, "difficulty")?,
        outcome,
    )?)
}

pub(crate) fn map_quiz_row(
    row: &SqliteRow,
    questions: Vec<QuestionRecord>,
) -> Result<QuizAttempt, StorageError> {
    let summary = match get_opt_u32(row, "score")? {
        Some(score) => {
            let total = get_opt_u32(row, "total")?
                .ok_or_else(|| StorageError::Serialization("missing total".into()))?;
            let xp = get_opt_u32(row, "xp_earned")?
                .ok_or_else(|| StorageError::Serialization("missing xp_earned".into()))?;
            Some(ScoreSummary::new(score, total, xp).map_err(ser)?)
        }
        None => None,
    };

    QuizAttempt::from_persisted(
        parse(row, "id")?,
        parse(row, "user_id")?,
        parse(row, "certification_id")?,
        parse::<Difficulty>(row, "difficulty")?,
        questions,
        row.try_get::<DateTime<Utc>, _>("created_at").map_err(ser)?,
        summary,
        row.try_get::<Option<DateTime<Utc>>, _>("completed_at")
            .map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_profile_row(row: &SqliteRow) -> Result<UserProfile, StorageError> {
    Ok(UserProfile::from_persisted(
        parse(row, "user_id")?,
        i64_to_u64("total_xp", row.try_get("total_xp").map_err(ser)?)?,
        get_u32(row, "current_streak")?,
        row.try_get::<Option<NaiveDate>, _>("last_quiz_date")
            .map_err(ser)?,
        i64_to_u64("version", row.try_get("version").map_err(ser)?)?,
    ))
}

pub(crate) fn map_domain_row(row: &SqliteRow) -> Result<(String, DomainAccuracy), StorageError> {
    let accuracy =
        DomainAccuracy::new(get_u32(row, "seen")?, get_u32(row, "correct")?).map_err(ser)?;
    Ok((row.try_get("domain").map_err(ser)?, accuracy))
}

pub(crate) fn map_progress_row(
    row: &SqliteRow,
    domains: DomainStats,
) -> Result<UserProgress, StorageError> {
    UserProgress::from_persisted(
        parse(row, "user_id")?,
        parse(row, "certification_id")?,
        i64_to_u64("total_xp", row.try_get("total_xp").map_err(ser)?)?,
        get_u32(row, "total_quizzes")?,
        get_u32(row, "total_questions_answered")?,
        get_u32(row, "correct_answers")?,
        parse::<Difficulty>(row, "current_difficulty")?,
        domains,
        row.try_get::<Option<DateTime<Utc>>, _>("updated_at")
            .map_err(ser)?,
        i64_to_u64("version", row.try_get("version").map_err(ser)?)?,
    )
    .map_err(ser)
}

pub(crate) fn map_achievement_row(row: &SqliteRow) -> Result<Achievement, StorageError> {
    Ok(Achievement::new(
        parse(row, "user_id")?,
        parse::<AchievementKind>(row, "kind")?,
        row.try_get::<DateTime<Utc>, _>("earned_at").map_err(ser)?,
    ))
}
