use std::sync::Arc;

use quiz_core::achievements::AchievementEngine;
use quiz_core::model::{QuizId, SubmittedAnswers, UserId};
use storage::repository::{
    EvaluationPersistence, ProgressRepository, QuizRepository, StorageError,
};

use super::plan::{LoadedState, plan_evaluation};
use super::view::EvaluationResult;
use crate::Clock;
use crate::error::EvaluationError;

/// Commit attempts before a conflicting evaluation gives up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Turns a submitted quiz into XP, streak, difficulty, and achievement updates,
/// committed as one unit.
#[derive(Clone)]
pub struct EvaluationService {
    clock: Clock,
    quizzes: Arc<dyn QuizRepository>,
    progress: Arc<dyn ProgressRepository>,
    evaluations: Arc<dyn EvaluationPersistence>,
    achievements: AchievementEngine,
    max_attempts: u32,
}

impl EvaluationService {
    #[must_use]
    pub fn new(
        clock: Clock,
        quizzes: Arc<dyn QuizRepository>,
        progress: Arc<dyn ProgressRepository>,
        evaluations: Arc<dyn EvaluationPersistence>,
    ) -> Self {
        Self {
            clock,
            quizzes,
            progress,
            evaluations,
            achievements: AchievementEngine::new(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Override the clock (usually for deterministic testing).
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Bound the optimistic-commit retries. Values below 1 are treated as 1.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    #[must_use]
    pub fn with_achievement_engine(mut self, engine: AchievementEngine) -> Self {
        self.achievements = engine;
        self
    }

    /// Grade a quiz and persist every resulting update atomically.
    ///
    /// On a commit conflict the whole evaluation is replayed against freshly
    /// loaded state, up to the configured number of attempts.
    ///
    /// # Errors
    ///
    /// Returns `EvaluationError::QuizNotFound` if the quiz does not exist or
    /// belongs to someone else, `QuizAlreadyEvaluated` for a completed quiz,
    /// `MissingAnswer` if any question is unanswered, `ConcurrentUpdate` when
    /// retries are exhausted, and `Storage` for other persistence failures.
    /// No state changes on any error.
    #[tracing::instrument(skip_all, fields(%user_id, %quiz_id))]
    pub async fn evaluate(
        &self,
        user_id: UserId,
        quiz_id: QuizId,
        answers: &SubmittedAnswers,
    ) -> Result<EvaluationResult, EvaluationError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let state = self.load(user_id, quiz_id).await?;
            let now = self.clock.now();
            let plan = plan_evaluation(state, answers, &self.achievements, now, now.date_naive())?;

            match self.evaluations.commit_evaluation(&plan.commit).await {
                Ok(()) => {
                    let result = plan.result;
                    tracing::info!(
                        score = result.score,
                        total = result.total_questions,
                        percentage = result.percentage,
                        xp = result.xp_earned,
                        next_difficulty = %result.next_difficulty,
                        unlocked = result.newly_unlocked_achievements.len(),
                        "quiz evaluated"
                    );
                    return Ok(result);
                }
                Err(StorageError::Conflict) if attempt < self.max_attempts => {
                    tracing::warn!(attempt, "evaluation commit conflicted, retrying");
                }
                Err(StorageError::Conflict) => {
                    tracing::warn!(attempt, "evaluation commit conflicted, giving up");
                    return Err(EvaluationError::ConcurrentUpdate { attempts: attempt });
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    async fn load(&self, user_id: UserId, quiz_id: QuizId) -> Result<LoadedState, EvaluationError> {
        let quiz = match self.quizzes.get_quiz(quiz_id).await {
            Ok(quiz) => quiz,
            Err(StorageError::NotFound) => return Err(EvaluationError::QuizNotFound),
            Err(err) => return Err(err.into()),
        };
        if quiz.user_id() != user_id {
            return Err(EvaluationError::QuizNotFound);
        }
        if quiz.is_completed() {
            return Err(EvaluationError::QuizAlreadyEvaluated);
        }

        let profile = self.progress.load_or_create_profile(user_id).await?;
        let progress = self
            .progress
            .load_or_create_progress(user_id, quiz.certification_id(), quiz.difficulty())
            .await?;
        let earned = self.progress.earned_achievement_kinds(user_id).await?;

        Ok(LoadedState {
            quiz,
            profile,
            progress,
            earned,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{
        AnswerKey, CertificationId, Difficulty, QuestionId, QuestionRecord, QuizAttempt,
        SubmittedAnswer,
    };
    use quiz_core::time::{fixed_clock, fixed_now};
    use storage::repository::InMemoryRepository;

    fn service(repo: &InMemoryRepository) -> EvaluationService {
        EvaluationService::new(
            fixed_clock(),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        )
    }

    async fn seed_quiz(repo: &InMemoryRepository, user: UserId) -> QuizAttempt {
        let question = QuestionRecord::new(
            QuestionId::generate(),
            "Which database is relational?",
            vec!["RDS".into(), "DynamoDB".into()],
            AnswerKey::SingleSelect("RDS".into()),
            None,
            "Databases",
            Difficulty::Easy,
        )
        .unwrap();
        let quiz = QuizAttempt::new(
            QuizId::generate(),
            user,
            CertificationId::generate(),
            Difficulty::Easy,
            vec![question],
            fixed_now(),
        )
        .unwrap();
        repo.insert_quiz(&quiz).await.unwrap();
        quiz
    }

    #[tokio::test]
    async fn unknown_quiz_is_not_found() {
        let repo = InMemoryRepository::new();
        let err = service(&repo)
            .evaluate(UserId::generate(), QuizId::generate(), &SubmittedAnswers::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EvaluationError::QuizNotFound));
    }

    #[tokio::test]
    async fn someone_elses_quiz_is_not_found() {
        let repo = InMemoryRepository::new();
        let quiz = seed_quiz(&repo, UserId::generate()).await;
        let answers = SubmittedAnswers::from([(
            quiz.questions()[0].id(),
            SubmittedAnswer::Text("RDS".into()),
        )]);
        let err = service(&repo)
            .evaluate(UserId::generate(), quiz.id(), &answers)
            .await
            .unwrap_err();
        assert!(matches!(err, EvaluationError::QuizNotFound));
        assert!(!repo.get_quiz(quiz.id()).await.unwrap().is_completed());
    }

    #[tokio::test]
    async fn max_attempts_never_drops_below_one() {
        let repo = InMemoryRepository::new();
        let user = UserId::generate();
        let quiz = seed_quiz(&repo, user).await;
        let answers = SubmittedAnswers::from([(
            quiz.questions()[0].id(),
            SubmittedAnswer::Text("rds".into()),
        )]);
        let result = service(&repo)
            .with_max_attempts(0)
            .evaluate(user, quiz.id(), &answers)
            .await
            .unwrap();
        assert_eq!(result.score, 1);
        assert_eq!(result.completed_at, fixed_now());
    }
}
