use quiz_core::model::{CertificationId, QuestionRecord, QuizAttempt, QuizId, UserId};
use sqlx::SqliteConnection;

use super::SqliteRepository;
use super::mapping::{db, map_question_row, map_quiz_row, ser};
use crate::repository::{QuizRepository, StorageError};

const QUIZ_COLUMNS: &str = r"
    id, user_id, certification_id, difficulty, created_at,
    score, total, percentage, xp_earned, completed_at
";

async fn load_questions(
    conn: &mut SqliteConnection,
    quiz_id: QuizId,
) -> Result<Vec<QuestionRecord>, StorageError> {
    let rows = sqlx::query(
        r"
        SELECT
            id, text, question_type, options, correct_answer, explanation,
            domain, difficulty, user_answer, is_correct, xp_earned
        FROM questions
        WHERE quiz_id = ?1
        ORDER BY position ASC
        ",
    )
    .bind(quiz_id.to_string())
    .fetch_all(&mut *conn)
    .await
    .map_err(db)?;

    rows.iter().map(map_question_row).collect()
}

#[async_trait::async_trait]
impl QuizRepository for SqliteRepository {
    async fn insert_quiz(&self, quiz: &QuizAttempt) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(db)?;

        sqlx::query(
            r"
            INSERT INTO quizzes (id, user_id, certification_id, difficulty, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(quiz.id().to_string())
        .bind(quiz.user_id().to_string())
        .bind(quiz.certification_id().to_string())
        .bind(quiz.difficulty().as_str())
        .bind(quiz.created_at())
        .execute(&mut *tx)
        .await
        .map_err(db)?;

        for (position, question) in quiz.questions().iter().enumerate() {
            let position = i64::try_from(position)
                .map_err(|_| StorageError::Serialization("position overflow".into()))?;
            sqlx::query(
                r"
                INSERT INTO questions (
                    id, quiz_id, position, text, question_type, options,
                    correct_answer, explanation, domain, difficulty
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                ",
            )
            .bind(question.id().to_string())
            .bind(quiz.id().to_string())
            .bind(position)
            .bind(question.text())
            .bind(question.question_type().as_str())
            .bind(serde_json::to_string(question.options()).map_err(ser)?)
            .bind(question.key().to_json().to_string())
            .bind(question.explanation())
            .bind(question.domain())
            .bind(question.difficulty().as_str())
            .execute(&mut *tx)
            .await
            .map_err(db)?;
        }

        tx.commit().await.map_err(db)?;
        Ok(())
    }

    async fn get_quiz(&self, id: QuizId) -> Result<QuizAttempt, StorageError> {
        let mut tx = self.pool.begin().await.map_err(db)?;
        let row = sqlx::query(&format!("SELECT {QUIZ_COLUMNS} FROM quizzes WHERE id = ?1"))
            .bind(id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(db)?
            .ok_or(StorageError::NotFound)?;

        let questions = load_questions(&mut tx, id).await?;
        tx.commit().await.map_err(db)?;
        map_quiz_row(&row, questions)
    }

    async fn list_quizzes(
        &self,
        user_id: UserId,
        certification_id: Option<CertificationId>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<QuizAttempt>, StorageError> {
        let mut tx = self.pool.begin().await.map_err(db)?;
        let rows = sqlx::query(&format!(
            r"
            SELECT {QUIZ_COLUMNS}
            FROM quizzes
            WHERE user_id = ?1 AND (?2 IS NULL OR certification_id = ?2)
            ORDER BY created_at DESC, id DESC
            LIMIT ?3 OFFSET ?4
            "
        ))
        .bind(user_id.to_string())
        .bind(certification_id.map(|c| c.to_string()))
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&mut *tx)
        .await
        .map_err(db)?;

        let mut quizzes = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: QuizId = sqlx::Row::try_get::<String, _>(row, "id")
                .map_err(ser)?
                .parse()
                .map_err(ser)?;
            let questions = load_questions(&mut tx, id).await?;
            quizzes.push(map_quiz_row(row, questions)?);
        }
        tx.commit().await.map_err(db)?;
        Ok(quizzes)
    }
}
