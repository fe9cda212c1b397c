use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use quiz_core::domains::WeakDomain;
use quiz_core::model::{
    Achievement, AchievementKind, CertificationId, Difficulty, UserId, UserProgress,
};
use storage::repository::ProgressRepository;

use crate::error::ProgressServiceError;

/// Achievements shown on the dashboard.
pub const RECENT_ACHIEVEMENTS: usize = 5;

//
// ─── VIEWS ─────────────────────────────────────────────────────────────────────
//

/// One certification track with derived accuracy and weak domains.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSummary {
    pub certification_id: CertificationId,
    pub total_xp: u64,
    pub total_quizzes: u32,
    pub total_questions_answered: u32,
    pub correct_answers: u32,
    pub accuracy: f64,
    pub current_difficulty: Difficulty,
    pub weak_domains: Vec<WeakDomain>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&UserProgress> for ProgressSummary {
    fn from(progress: &UserProgress) -> Self {
        Self {
            certification_id: progress.certification_id(),
            total_xp: progress.total_xp(),
            total_quizzes: progress.total_quizzes(),
            total_questions_answered: progress.total_questions_answered(),
            correct_answers: progress.correct_answers(),
            accuracy: progress.accuracy(),
            current_difficulty: progress.current_difficulty(),
            weak_domains: progress.weak_domains(),
            updated_at: progress.updated_at(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AchievementView {
    #[serde(rename = "type")]
    pub kind: AchievementKind,
    pub name: String,
    pub description: String,
    pub earned_at: DateTime<Utc>,
}

impl From<&Achievement> for AchievementView {
    fn from(achievement: &Achievement) -> Self {
        Self {
            kind: achievement.kind(),
            name: achievement.name().to_owned(),
            description: achievement.description().to_owned(),
            earned_at: achievement.earned_at(),
        }
    }
}

/// A user's overall standing across every certification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub total_xp: u64,
    pub level: u32,
    pub current_streak: u32,
    pub last_quiz_date: Option<NaiveDate>,
    pub total_quizzes: u32,
    pub total_questions: u32,
    pub average_accuracy: f64,
    pub recent_achievements: Vec<AchievementView>,
    pub progresses: Vec<ProgressSummary>,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Read-only views over profiles, certification progress, and achievements.
#[derive(Clone)]
pub struct ProgressService {
    progress: Arc<dyn ProgressRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(progress: Arc<dyn ProgressRepository>) -> Self {
        Self { progress }
    }

    /// Totals across certifications plus the latest achievements.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::ProfileNotFound` if the user has never
    /// completed a quiz, and `ProgressServiceError::Storage` for repository failures.
    pub async fn dashboard(&self, user_id: UserId) -> Result<Dashboard, ProgressServiceError> {
        let profile = self
            .progress
            .get_profile(user_id)
            .await?
            .ok_or(ProgressServiceError::ProfileNotFound)?;
        let progresses = self.progress.list_progress(user_id).await?;
        let achievements = self.progress.list_achievements(user_id).await?;

        let total = |count: fn(&UserProgress) -> u32| {
            progresses.iter().map(count).fold(0, u32::saturating_add)
        };
        let total_quizzes = total(UserProgress::total_quizzes);
        let total_questions = total(UserProgress::total_questions_answered);
        let correct = total(UserProgress::correct_answers);
        let average_accuracy = if total_questions == 0 {
            0.0
        } else {
            f64::from(correct) / f64::from(total_questions) * 100.0
        };

        Ok(Dashboard {
            total_xp: profile.total_xp(),
            level: profile.level(),
            current_streak: profile.current_streak(),
            last_quiz_date: profile.last_quiz_date(),
            total_quizzes,
            total_questions,
            average_accuracy,
            recent_achievements: achievements
                .iter()
                .take(RECENT_ACHIEVEMENTS)
                .map(AchievementView::from)
                .collect(),
            progresses: progresses.iter().map(ProgressSummary::from).collect(),
        })
    }

    /// Progress on one certification. A user who has not started it gets an
    /// empty easy-tier row, which is not persisted.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn certification_progress(
        &self,
        user_id: UserId,
        certification_id: CertificationId,
    ) -> Result<ProgressSummary, ProgressServiceError> {
        let progress = self
            .progress
            .load_or_create_progress(user_id, certification_id, Difficulty::Easy)
            .await?;
        Ok(ProgressSummary::from(&progress))
    }

    /// Every achievement the user holds, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn achievements(
        &self,
        user_id: UserId,
    ) -> Result<Vec<AchievementView>, ProgressServiceError> {
        let achievements = self.progress.list_achievements(user_id).await?;
        Ok(achievements.iter().map(AchievementView::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::domains::DomainStats;
    use quiz_core::model::UserProfile;
    use storage::repository::{InMemoryRepository, StorageError};

    struct Veteran {
        user_id: UserId,
    }

    #[async_trait::async_trait]
    impl ProgressRepository for Veteran {
        async fn get_progress(
            &self,
            _user_id: UserId,
            _certification_id: CertificationId,
        ) -> Result<Option<UserProgress>, StorageError> {
            Ok(None)
        }

        async fn list_progress(&self, user_id: UserId) -> Result<Vec<UserProgress>, StorageError> {
            let track = || {
                UserProgress::from_persisted(
                    user_id,
                    CertificationId::generate(),
                    0,
                    u32::MAX - 1,
                    u32::MAX - 1,
                    u32::MAX / 4,
                    Difficulty::Hard,
                    DomainStats::new(),
                    None,
                    1,
                )
                .unwrap()
            };
            Ok(vec![track(), track()])
        }

        async fn get_profile(&self, user_id: UserId) -> Result<Option<UserProfile>, StorageError> {
            Ok((user_id == self.user_id).then(|| UserProfile::new(user_id)))
        }

        async fn list_achievements(
            &self,
            _user_id: UserId,
        ) -> Result<Vec<Achievement>, StorageError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn dashboard_requires_a_profile() {
        let svc = ProgressService::new(Arc::new(InMemoryRepository::new()));
        let err = svc.dashboard(UserId::generate()).await.unwrap_err();
        assert!(matches!(err, ProgressServiceError::ProfileNotFound));
    }

    #[tokio::test]
    async fn cold_certification_starts_easy_and_empty() {
        let repo = InMemoryRepository::new();
        let svc = ProgressService::new(Arc::new(repo.clone()));
        let user = UserId::generate();
        let cert = CertificationId::generate();

        let summary = svc.certification_progress(user, cert).await.unwrap();
        assert_eq!(summary.current_difficulty, Difficulty::Easy);
        assert_eq!(summary.total_quizzes, 0);
        assert_eq!(summary.accuracy, 0.0);
        assert!(summary.weak_domains.is_empty());
        assert!(repo.get_progress(user, cert).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn achievements_are_empty_for_new_users() {
        let svc = ProgressService::new(Arc::new(InMemoryRepository::new()));
        assert!(svc.achievements(UserId::generate()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn dashboard_totals_saturate_instead_of_overflowing() {
        let user_id = UserId::generate();
        let svc = ProgressService::new(Arc::new(Veteran { user_id }));

        let dashboard = svc.dashboard(user_id).await.unwrap();
        assert_eq!(dashboard.total_quizzes, u32::MAX);
        assert_eq!(dashboard.total_questions, u32::MAX);
        assert!(dashboard.average_accuracy > 49.0 && dashboard.average_accuracy < 51.0);
        assert_eq!(dashboard.progresses.len(), 2);
    }
}
