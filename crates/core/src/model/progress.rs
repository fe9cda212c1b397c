use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::domains::{self, DomainStats, WeakDomain};
use crate::grading::GradedQuestion;
use crate::model::ids::{CertificationId, UserId};
use crate::model::tier::Difficulty;
use crate::scoring::ScoreSummary;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("correct answers ({correct}) exceed questions answered ({answered})")]
    CorrectExceedsAnswered { answered: u32, correct: u32 },
}

/// Learner progress on one certification track.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProgress {
    user_id: UserId,
    certification_id: CertificationId,
    total_xp: u64,
    total_quizzes: u32,
    total_questions_answered: u32,
    correct_answers: u32,
    current_difficulty: Difficulty,
    domains: DomainStats,
    updated_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    version: u64,
}

impl UserProgress {
    /// Empty progress row, starting at the given tier.
    #[must_use]
    pub fn new(
        user_id: UserId,
        certification_id: CertificationId,
        starting_difficulty: Difficulty,
    ) -> Self {
        Self {
            user_id,
            certification_id,
            total_xp: 0,
            total_quizzes: 0,
            total_questions_answered: 0,
            correct_answers: 0,
            current_difficulty: starting_difficulty,
            domains: DomainStats::new(),
            updated_at: None,
            version: 0,
        }
    }

    /// Rehydrate a progress row from storage.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::CorrectExceedsAnswered` if the counters are inconsistent.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        user_id: UserId,
        certification_id: CertificationId,
        total_xp: u64,
        total_quizzes: u32,
        total_questions_answered: u32,
        correct_answers: u32,
        current_difficulty: Difficulty,
        domains: DomainStats,
        updated_at: Option<DateTime<Utc>>,
        version: u64,
    ) -> Result<Self, ProgressError> {
        if correct_answers > total_questions_answered {
            return Err(ProgressError::CorrectExceedsAnswered {
                answered: total_questions_answered,
                correct: correct_answers,
            });
        }
        Ok(Self {
            user_id,
            certification_id,
            total_xp,
            total_quizzes,
            total_questions_answered,
            correct_answers,
            current_difficulty,
            domains,
            updated_at,
            version,
        })
    }

    /// Fold one evaluated quiz into the totals and the domain map.
    ///
    /// Returns the recomputed weak-domain set.
    pub fn record_quiz(
        &mut self,
        summary: &ScoreSummary,
        graded: &[GradedQuestion],
        at: DateTime<Utc>,
    ) -> Vec<WeakDomain> {
        self.total_xp = self.total_xp.saturating_add(u64::from(summary.xp_earned));
        self.total_quizzes = self.total_quizzes.saturating_add(1);
        self.total_questions_answered = self.total_questions_answered.saturating_add(summary.total);
        self.correct_answers = self.correct_answers.saturating_add(summary.score);
        self.updated_at = Some(at);
        domains::update(&mut self.domains, graded)
    }

    pub fn set_current_difficulty(&mut self, difficulty: Difficulty) {
        self.current_difficulty = difficulty;
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn certification_id(&self) -> CertificationId {
        self.certification_id
    }

    #[must_use]
    pub fn total_xp(&self) -> u64 {
        self.total_xp
    }

    #[must_use]
    pub fn total_quizzes(&self) -> u32 {
        self.total_quizzes
    }

    #[must_use]
    pub fn total_questions_answered(&self) -> u32 {
        self.total_questions_answered
    }

    #[must_use]
    pub fn correct_answers(&self) -> u32 {
        self.correct_answers
    }

    /// `correct / answered * 100`, recomputed on every call; 0 before any answer.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        if self.total_questions_answered == 0 {
            return 0.0;
        }
        f64::from(self.correct_answers) / f64::from(self.total_questions_answered) * 100.0
    }

    #[must_use]
    pub fn current_difficulty(&self) -> Difficulty {
        self.current_difficulty
    }

    #[must_use]
    pub fn domains(&self) -> &DomainStats {
        &self.domains
    }

    #[must_use]
    pub fn weak_domains(&self) -> Vec<WeakDomain> {
        self.domains.weak_domains()
    }

    #[must_use]
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Optimistic-concurrency token; 0 means "never stored".
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[must_use]
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionId;
    use crate::time::fixed_now;

    fn graded(domain: &str, is_correct: bool) -> GradedQuestion {
        GradedQuestion {
            question_id: QuestionId::generate(),
            domain: domain.into(),
            difficulty: Difficulty::Medium,
            is_correct,
        }
    }

    #[test]
    fn accuracy_is_zero_without_answers() {
        let progress =
            UserProgress::new(UserId::generate(), CertificationId::generate(), Difficulty::Easy);
        assert_eq!(progress.accuracy(), 0.0);
        assert!(progress.weak_domains().is_empty());
    }

    #[test]
    fn record_quiz_accumulates_totals() {
        let mut progress =
            UserProgress::new(UserId::generate(), CertificationId::generate(), Difficulty::Medium);

        let first = [graded("EC2", true), graded("EC2", true), graded("VPC", false)];
        let weak = progress.record_quiz(&ScoreSummary::new(2, 3, 40).unwrap(), &first, fixed_now());
        assert_eq!(weak.len(), 1);

        let second = [graded("VPC", true), graded("VPC", true)];
        let weak = progress.record_quiz(&ScoreSummary::new(2, 2, 40).unwrap(), &second, fixed_now());
        assert!(weak.is_empty());

        assert_eq!(progress.total_quizzes(), 2);
        assert_eq!(progress.total_questions_answered(), 5);
        assert_eq!(progress.correct_answers(), 4);
        assert_eq!(progress.total_xp(), 80);
        assert!((progress.accuracy() - 80.0).abs() < f64::EPSILON);
        assert_eq!(progress.updated_at(), Some(fixed_now()));
    }

    #[test]
    fn inconsistent_counters_are_rejected() {
        let err = UserProgress::from_persisted(
            UserId::generate(),
            CertificationId::generate(),
            0,
            1,
            3,
            4,
            Difficulty::Easy,
            DomainStats::new(),
            None,
            1,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ProgressError::CorrectExceedsAnswered {
                answered: 3,
                correct: 4
            }
        );
    }
}
