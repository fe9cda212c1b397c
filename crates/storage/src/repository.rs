use async_trait::async_trait;
use quiz_core::model::{
    Achievement, AchievementKind, CertificationId, Difficulty, QuestionError, QuizAttempt, QuizId,
    UserId, UserProfile, UserProgress,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    /// A versioned write lost a race, or a uniquely-keyed row already exists.
    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid stored question: {0}")]
    InvalidQuestion(#[from] QuestionError),
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Repository contract for quiz attempts and their questions.
#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// Persist a new quiz together with its questions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the id is taken, or other storage errors.
    async fn insert_quiz(&self, quiz: &QuizAttempt) -> Result<(), StorageError>;

    /// Fetch a quiz (questions in order, outcomes if evaluated).
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_quiz(&self, id: QuizId) -> Result<QuizAttempt, StorageError>;

    /// A user's quizzes, newest first, optionally limited to one certification.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn list_quizzes(
        &self,
        user_id: UserId,
        certification_id: Option<CertificationId>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<QuizAttempt>, StorageError>;
}

/// Read side of the gamification state.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn get_progress(
        &self,
        user_id: UserId,
        certification_id: CertificationId,
    ) -> Result<Option<UserProgress>, StorageError>;

    /// Stored progress, or an unsaved empty row (version 0) starting at `seed`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn load_or_create_progress(
        &self,
        user_id: UserId,
        certification_id: CertificationId,
        seed: Difficulty,
    ) -> Result<UserProgress, StorageError> {
        Ok(self
            .get_progress(user_id, certification_id)
            .await?
            .unwrap_or_else(|| UserProgress::new(user_id, certification_id, seed)))
    }

    /// Every certification track of a user, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn list_progress(&self, user_id: UserId) -> Result<Vec<UserProgress>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn get_profile(&self, user_id: UserId) -> Result<Option<UserProfile>, StorageError>;

    /// Stored profile, or an unsaved fresh one (version 0).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn load_or_create_profile(&self, user_id: UserId) -> Result<UserProfile, StorageError> {
        Ok(self
            .get_profile(user_id)
            .await?
            .unwrap_or_else(|| UserProfile::new(user_id)))
    }

    /// Achievements held by a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn list_achievements(&self, user_id: UserId) -> Result<Vec<Achievement>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn earned_achievement_kinds(
        &self,
        user_id: UserId,
    ) -> Result<HashSet<AchievementKind>, StorageError> {
        Ok(self
            .list_achievements(user_id)
            .await?
            .iter()
            .map(Achievement::kind)
            .collect())
    }
}

/// Everything one evaluation writes.
///
/// `profile` and `progress` carry the version they were loaded at (0 for rows
/// that did not exist yet); the commit only lands if those versions are still
/// current and the quiz is still unevaluated in storage.
#[derive(Debug, Clone)]
pub struct EvaluationCommit {
    pub quiz: QuizAttempt,
    pub profile: UserProfile,
    pub progress: UserProgress,
    pub achievements: Vec<Achievement>,
}

/// All-or-nothing write of an evaluation.
#[async_trait]
pub trait EvaluationPersistence: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if any versioned row moved underneath
    /// the caller, the quiz was already completed, or an achievement is
    /// already held. Nothing is written in that case.
    async fn commit_evaluation(&self, commit: &EvaluationCommit) -> Result<(), StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct State {
    quizzes: HashMap<QuizId, QuizAttempt>,
    profiles: HashMap<UserId, UserProfile>,
    progress: HashMap<(UserId, CertificationId), UserProgress>,
    achievements: HashMap<UserId, Vec<Achievement>>,
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// One lock guards all state so a commit is atomic with respect to readers.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<State>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, State>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl QuizRepository for InMemoryRepository {
    async fn insert_quiz(&self, quiz: &QuizAttempt) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if guard.quizzes.contains_key(&quiz.id()) {
            return Err(StorageError::Conflict);
        }
        guard.quizzes.insert(quiz.id(), quiz.clone());
        Ok(())
    }

    async fn get_quiz(&self, id: QuizId) -> Result<QuizAttempt, StorageError> {
        let guard = self.lock()?;
        guard.quizzes.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_quizzes(
        &self,
        user_id: UserId,
        certification_id: Option<CertificationId>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<QuizAttempt>, StorageError> {
        let guard = self.lock()?;
        let mut quizzes: Vec<QuizAttempt> = guard
            .quizzes
            .values()
            .filter(|q| q.user_id() == user_id)
            .filter(|q| certification_id.is_none_or(|c| q.certification_id() == c))
            .cloned()
            .collect();
        quizzes.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id().cmp(&a.id()))
        });
        Ok(quizzes
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_progress(
        &self,
        user_id: UserId,
        certification_id: CertificationId,
    ) -> Result<Option<UserProgress>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.progress.get(&(user_id, certification_id)).cloned())
    }

    async fn list_progress(&self, user_id: UserId) -> Result<Vec<UserProgress>, StorageError> {
        let guard = self.lock()?;
        let mut rows: Vec<UserProgress> = guard
            .progress
            .values()
            .filter(|p| p.user_id() == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.updated_at()
                .cmp(&a.updated_at())
                .then_with(|| a.certification_id().cmp(&b.certification_id()))
        });
        Ok(rows)
    }

    async fn get_profile(&self, user_id: UserId) -> Result<Option<UserProfile>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.profiles.get(&user_id).cloned())
    }

    async fn list_achievements(&self, user_id: UserId) -> Result<Vec<Achievement>, StorageError> {
        let guard = self.lock()?;
        let mut held = guard.achievements.get(&user_id).cloned().unwrap_or_default();
        held.reverse();
        held.sort_by(|a, b| b.earned_at().cmp(&a.earned_at()));
        Ok(held)
    }
}

#[async_trait]
impl EvaluationPersistence for InMemoryRepository {
    async fn commit_evaluation(&self, commit: &EvaluationCommit) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let user_id = commit.profile.user_id();
        let progress_key = (
            commit.progress.user_id(),
            commit.progress.certification_id(),
        );

        // Validate everything before touching state.
        match guard.quizzes.get(&commit.quiz.id()) {
            None => return Err(StorageError::NotFound),
            Some(stored) if stored.is_completed() => return Err(StorageError::Conflict),
            Some(_) => {}
        }
        let profile_version = guard.profiles.get(&user_id).map_or(0, UserProfile::version);
        if profile_version != commit.profile.version() {
            return Err(StorageError::Conflict);
        }
        let progress_version = guard
            .progress
            .get(&progress_key)
            .map_or(0, UserProgress::version);
        if progress_version != commit.progress.version() {
            return Err(StorageError::Conflict);
        }
        let held = guard.achievements.get(&user_id);
        let already_held = commit.achievements.iter().any(|new| {
            held.is_some_and(|list| list.iter().any(|a| a.kind() == new.kind()))
        });
        if already_held {
            return Err(StorageError::Conflict);
        }

        guard.quizzes.insert(commit.quiz.id(), commit.quiz.clone());
        guard.profiles.insert(
            user_id,
            commit.profile.clone().with_version(profile_version + 1),
        );
        guard.progress.insert(
            progress_key,
            commit.progress.clone().with_version(progress_version + 1),
        );
        guard
            .achievements
            .entry(user_id)
            .or_default()
            .extend(commit.achievements.iter().cloned());
        Ok(())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub quizzes: Arc<dyn QuizRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub evaluations: Arc<dyn EvaluationPersistence>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let quizzes: Arc<dyn QuizRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        let evaluations: Arc<dyn EvaluationPersistence> = Arc::new(repo);
        Self {
            quizzes,
            progress,
            evaluations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{AnswerKey, QuestionId, QuestionOutcome, QuestionRecord, SubmittedAnswer};
    use quiz_core::scoring::ScoreSummary;
    use quiz_core::time::fixed_now;

    fn build_quiz(user_id: UserId) -> QuizAttempt {
        let question = QuestionRecord::new(
            QuestionId::generate(),
            "IAM roles can be assumed by EC2 instances.",
            Vec::new(),
            AnswerKey::TrueFalse(true),
            None,
            "IAM",
            Difficulty::Easy,
        )
        .unwrap();
        QuizAttempt::new(
            QuizId::generate(),
            user_id,
            CertificationId::generate(),
            Difficulty::Easy,
            vec![question],
            fixed_now(),
        )
        .unwrap()
    }

    fn completed(mut quiz: QuizAttempt) -> QuizAttempt {
        let outcome = QuestionOutcome {
            submitted: SubmittedAnswer::Flag(true),
            is_correct: true,
            xp_earned: 10,
        };
        quiz.complete(vec![outcome], ScoreSummary::new(1, 1, 10).unwrap(), fixed_now())
            .unwrap();
        quiz
    }

    fn commit_for(quiz: &QuizAttempt) -> EvaluationCommit {
        EvaluationCommit {
            quiz: completed(quiz.clone()),
            profile: UserProfile::new(quiz.user_id()),
            progress: UserProgress::new(quiz.user_id(), quiz.certification_id(), Difficulty::Easy),
            achievements: vec![Achievement::new(
                quiz.user_id(),
                AchievementKind::Sharpshooter,
                fixed_now(),
            )],
        }
    }

    #[tokio::test]
    async fn insert_and_fetch_quiz() {
        let repo = InMemoryRepository::new();
        let quiz = build_quiz(UserId::generate());
        repo.insert_quiz(&quiz).await.unwrap();

        assert_eq!(repo.get_quiz(quiz.id()).await.unwrap(), quiz);
        assert!(matches!(
            repo.insert_quiz(&quiz).await,
            Err(StorageError::Conflict)
        ));
        assert!(matches!(
            repo.get_quiz(QuizId::generate()).await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn commit_bumps_versions_and_stores_everything() {
        let repo = InMemoryRepository::new();
        let quiz = build_quiz(UserId::generate());
        repo.insert_quiz(&quiz).await.unwrap();

        repo.commit_evaluation(&commit_for(&quiz)).await.unwrap();

        let user = quiz.user_id();
        assert!(repo.get_quiz(quiz.id()).await.unwrap().is_completed());
        assert_eq!(repo.get_profile(user).await.unwrap().unwrap().version(), 1);
        let progress = repo
            .get_progress(user, quiz.certification_id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(progress.version(), 1);
        assert_eq!(
            repo.earned_achievement_kinds(user).await.unwrap(),
            HashSet::from([AchievementKind::Sharpshooter])
        );
    }

    #[tokio::test]
    async fn stale_commit_is_rejected_without_writes() {
        let repo = InMemoryRepository::new();
        let user = UserId::generate();
        let first = build_quiz(user);
        let second = build_quiz(user);
        repo.insert_quiz(&first).await.unwrap();
        repo.insert_quiz(&second).await.unwrap();

        repo.commit_evaluation(&commit_for(&first)).await.unwrap();

        // Built from version-0 snapshots, which are now stale.
        let mut stale = commit_for(&second);
        stale.achievements.clear();
        assert!(matches!(
            repo.commit_evaluation(&stale).await,
            Err(StorageError::Conflict)
        ));
        assert!(!repo.get_quiz(second.id()).await.unwrap().is_completed());
    }

    #[tokio::test]
    async fn completed_quiz_cannot_be_committed_twice() {
        let repo = InMemoryRepository::new();
        let quiz = build_quiz(UserId::generate());
        repo.insert_quiz(&quiz).await.unwrap();
        let commit = commit_for(&quiz);
        repo.commit_evaluation(&commit).await.unwrap();

        let mut again = commit.clone();
        again.profile = repo.get_profile(quiz.user_id()).await.unwrap().unwrap();
        again.achievements.clear();
        assert!(matches!(
            repo.commit_evaluation(&again).await,
            Err(StorageError::Conflict)
        ));
    }

    #[tokio::test]
    async fn list_quizzes_filters_and_pages() {
        let repo = InMemoryRepository::new();
        let user = UserId::generate();
        let quizzes: Vec<_> = (0..3).map(|_| build_quiz(user)).collect();
        for quiz in &quizzes {
            repo.insert_quiz(quiz).await.unwrap();
        }
        repo.insert_quiz(&build_quiz(UserId::generate())).await.unwrap();

        assert_eq!(repo.list_quizzes(user, None, 10, 0).await.unwrap().len(), 3);
        assert_eq!(repo.list_quizzes(user, None, 2, 2).await.unwrap().len(), 1);
        let one_cert = repo
            .list_quizzes(user, Some(quizzes[1].certification_id()), 10, 0)
            .await
            .unwrap();
        assert_eq!(one_cert.len(), 1);
        assert_eq!(one_cert[0].id(), quizzes[1].id());
    }

    #[tokio::test]
    async fn load_or_create_defaults_are_unsaved() {
        let repo = InMemoryRepository::new();
        let user = UserId::generate();
        let cert = CertificationId::generate();

        let progress = repo
            .load_or_create_progress(user, cert, Difficulty::Medium)
            .await
            .unwrap();
        assert_eq!(progress.current_difficulty(), Difficulty::Medium);
        assert_eq!(progress.version(), 0);
        assert!(repo.get_progress(user, cert).await.unwrap().is_none());

        let profile = repo.load_or_create_profile(user).await.unwrap();
        assert_eq!(profile.level(), 1);
        assert!(repo.get_profile(user).await.unwrap().is_none());
    }
}
