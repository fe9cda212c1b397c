use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use quiz_core::model::{
    CertificationId, Difficulty, QuestionId, QuizAttempt, QuizDraft, QuizId,
    SubmittedAnswer, UserId,
};
use storage::repository::{QuizRepository, StorageError};

use crate::Clock;
use crate::error::QuizServiceError;

/// Default page size for quiz history.
pub const DEFAULT_HISTORY_LIMIT: u32 = 20;

//
// ─── VIEWS ─────────────────────────────────────────────────────────────────────
//

/// One row of a user's quiz history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizHistoryItem {
    pub id: QuizId,
    pub certification_id: CertificationId,
    pub difficulty: Difficulty,
    pub total_questions: usize,
    pub score: Option<u32>,
    pub percentage: Option<u32>,
    pub xp_earned: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&QuizAttempt> for QuizHistoryItem {
    fn from(quiz: &QuizAttempt) -> Self {
        let summary = quiz.summary();
        Self {
            id: quiz.id(),
            certification_id: quiz.certification_id(),
            difficulty: quiz.difficulty(),
            total_questions: quiz.questions().len(),
            score: summary.map(|s| s.score),
            percentage: summary.map(|s| s.percentage),
            xp_earned: summary.map(|s| s.xp_earned),
            created_at: quiz.created_at(),
            completed_at: quiz.completed_at(),
        }
    }
}

/// A question as shown to its owner. The reference answer is only revealed
/// once the quiz has been evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionDetail {
    pub id: QuestionId,
    pub text: String,
    pub question_type: String,
    pub options: Vec<String>,
    pub domain: String,
    pub difficulty: Difficulty,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_answer: Option<SubmittedAnswer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<SubmittedAnswer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizDetail {
    #[serde(flatten)]
    pub summary: QuizHistoryItem,
    pub questions: Vec<QuestionDetail>,
}

impl From<&QuizAttempt> for QuizDetail {
    fn from(quiz: &QuizAttempt) -> Self {
        let revealed = quiz.is_completed();
        let questions = quiz
            .questions()
            .iter()
            .map(|q| {
                let outcome = q.outcome();
                QuestionDetail {
                    id: q.id(),
                    text: q.text().to_owned(),
                    question_type: q.question_type().as_str().to_owned(),
                    options: q.options().to_vec(),
                    domain: q.domain().to_owned(),
                    difficulty: q.difficulty(),
                    user_answer: outcome.map(|o| o.submitted.clone()),
                    is_correct: outcome.map(|o| o.is_correct),
                    correct_answer: revealed.then(|| q.key().expected()),
                    explanation: revealed.then(|| q.explanation().map(str::to_owned)).flatten(),
                }
            })
            .collect();
        Self {
            summary: QuizHistoryItem::from(quiz),
            questions,
        }
    }
}

/// Aggregates over a user's evaluated quizzes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizStats {
    pub total_quizzes: u32,
    pub avg_score: f64,
    pub total_xp: u64,
    pub avg_accuracy: f64,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Ingests generated quizzes and serves quiz history.
#[derive(Clone)]
pub struct QuizService {
    clock: Clock,
    quizzes: Arc<dyn QuizRepository>,
}

impl QuizService {
    #[must_use]
    pub fn new(clock: Clock, quizzes: Arc<dyn QuizRepository>) -> Self {
        Self { clock, quizzes }
    }

    /// Validate a generator draft and persist it as an unevaluated quiz.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Quiz` if the draft is invalid (including
    /// unknown question types) and `QuizServiceError::Storage` if persistence fails.
    pub async fn import_draft(&self, draft: QuizDraft) -> Result<QuizAttempt, QuizServiceError> {
        let quiz = QuizAttempt::from_draft(draft, self.clock.now())?;
        self.quizzes.insert_quiz(&quiz).await?;
        tracing::info!(
            quiz_id = %quiz.id(),
            user_id = %quiz.user_id(),
            questions = quiz.questions().len(),
            "imported quiz"
        );
        Ok(quiz)
    }

    /// Quizzes for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Storage` if repository access fails.
    pub async fn history(
        &self,
        user_id: UserId,
        certification_id: Option<CertificationId>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<QuizHistoryItem>, QuizServiceError> {
        let quizzes = self
            .quizzes
            .list_quizzes(user_id, certification_id, limit, offset)
            .await?;
        Ok(quizzes.iter().map(QuizHistoryItem::from).collect())
    }

    /// Fetch a quiz its owner may see.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::NotFound` if the quiz is missing or owned by
    /// another user, and `QuizServiceError::Storage` for other failures.
    pub async fn quiz_detail(
        &self,
        quiz_id: QuizId,
        user_id: UserId,
    ) -> Result<QuizAttempt, QuizServiceError> {
        let quiz = match self.quizzes.get_quiz(quiz_id).await {
            Ok(quiz) => quiz,
            Err(StorageError::NotFound) => return Err(QuizServiceError::NotFound),
            Err(err) => return Err(err.into()),
        };
        if quiz.user_id() != user_id {
            return Err(QuizServiceError::NotFound);
        }
        Ok(quiz)
    }

    /// Totals and averages over a user's evaluated quizzes.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Storage` if repository access fails.
    pub async fn stats(&self, user_id: UserId) -> Result<QuizStats, QuizServiceError> {
        let quizzes = self
            .quizzes
            .list_quizzes(user_id, None, u32::MAX, 0)
            .await?;

        let mut stats = QuizStats {
            total_quizzes: 0,
            avg_score: 0.0,
            total_xp: 0,
            avg_accuracy: 0.0,
        };
        let mut total_score = 0u64;
        let mut total_questions = 0u64;
        for summary in quizzes.iter().filter_map(QuizAttempt::summary) {
            stats.total_quizzes += 1;
            stats.total_xp += u64::from(summary.xp_earned);
            total_score += u64::from(summary.score);
            total_questions += u64::from(summary.total);
        }

        if stats.total_quizzes > 0 {
            #[allow(clippy::cast_precision_loss)]
            {
                stats.avg_score = total_score as f64 / f64::from(stats.total_quizzes);
                stats.avg_accuracy = total_score as f64 / total_questions as f64 * 100.0;
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::time::fixed_clock;
    use serde_json::json;
    use storage::repository::InMemoryRepository;

    fn draft(user: UserId, cert: CertificationId) -> QuizDraft {
        serde_json::from_value(json!({
            "user_id": user,
            "certification_id": cert,
            "difficulty": "medium",
            "questions": [
                {
                    "question_text": "Which service is a managed relational database?",
                    "question_type": "multiple_choice",
                    "options": ["RDS", "S3", "SQS"],
                    "correct_answer": "RDS",
                    "explanation": "RDS runs relational engines.",
                    "domain": "Databases",
                    "difficulty": "medium"
                },
                {
                    "text": "S3 is block storage.",
                    "question_type": "true_false",
                    "correct_answer": "false",
                    "domain": "Storage",
                    "difficulty": "easy"
                }
            ]
        }))
        .unwrap()
    }

    fn service() -> (QuizService, InMemoryRepository) {
        let repo = InMemoryRepository::new();
        (QuizService::new(fixed_clock(), Arc::new(repo.clone())), repo)
    }

    #[tokio::test]
    async fn import_persists_a_fresh_quiz() {
        let (svc, repo) = service();
        let user = UserId::generate();
        let quiz = svc
            .import_draft(draft(user, CertificationId::generate()))
            .await
            .unwrap();

        let stored = repo.get_quiz(quiz.id()).await.unwrap();
        assert_eq!(stored.questions().len(), 2);
        assert_eq!(stored.difficulty(), Difficulty::Medium);
        assert!(!stored.is_completed());
    }

    #[tokio::test]
    async fn import_rejects_unknown_question_type() {
        let (svc, _) = service();
        let mut bad = draft(UserId::generate(), CertificationId::generate());
        bad.questions[1].question_type = "fill_in".into();
        let err = svc.import_draft(bad).await.unwrap_err();
        assert!(matches!(err, QuizServiceError::Quiz(_)));
    }

    #[tokio::test]
    async fn detail_enforces_ownership() {
        let (svc, _) = service();
        let owner = UserId::generate();
        let quiz = svc
            .import_draft(draft(owner, CertificationId::generate()))
            .await
            .unwrap();

        assert!(svc.quiz_detail(quiz.id(), owner).await.is_ok());
        assert!(matches!(
            svc.quiz_detail(quiz.id(), UserId::generate()).await,
            Err(QuizServiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn unevaluated_detail_hides_answers() {
        let (svc, _) = service();
        let quiz = svc
            .import_draft(draft(UserId::generate(), CertificationId::generate()))
            .await
            .unwrap();
        let detail = QuizDetail::from(&quiz);
        assert!(detail.questions.iter().all(|q| q.correct_answer.is_none()));
        assert_eq!(detail.questions[0].question_type, "single_select");
        assert_eq!(detail.summary.score, None);
    }

    #[tokio::test]
    async fn stats_are_zero_without_evaluated_quizzes() {
        let (svc, _) = service();
        let user = UserId::generate();
        svc.import_draft(draft(user, CertificationId::generate()))
            .await
            .unwrap();

        let stats = svc.stats(user).await.unwrap();
        assert_eq!(stats.total_quizzes, 0);
        assert_eq!(stats.avg_accuracy, 0.0);
        assert_eq!(svc.history(user, None, DEFAULT_HISTORY_LIMIT, 0).await.unwrap().len(), 1);
    }
}
