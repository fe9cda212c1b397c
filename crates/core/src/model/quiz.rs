use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::model::ids::{CertificationId, QuestionId, QuizId, UserId};
use crate::model::question::{QuestionDraft, QuestionError, QuestionOutcome, QuestionRecord};
use crate::model::tier::Difficulty;
use crate::scoring::ScoreSummary;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz must contain at least one question")]
    NoQuestions,

    #[error("quiz has already been evaluated")]
    AlreadyEvaluated,

    #[error("question {index} is invalid: {source}")]
    InvalidQuestion {
        index: usize,
        #[source]
        source: QuestionError,
    },

    #[error("duplicate question id: {0}")]
    DuplicateQuestion(QuestionId),

    #[error("expected {expected} question outcomes, got {got}")]
    OutcomeCountMismatch { expected: usize, got: usize },

    #[error("score summary and completion time must be set together")]
    InconsistentCompletion,
}

/// Quiz as produced by the generator: owner, target, tier, and unanswered questions.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QuizDraft {
    pub user_id: UserId,
    pub certification_id: CertificationId,
    #[serde(default)]
    pub difficulty: Difficulty,
    pub questions: Vec<QuestionDraft>,
}

/// One quiz instance. Evaluated at most once; after that it is read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizAttempt {
    id: QuizId,
    user_id: UserId,
    certification_id: CertificationId,
    difficulty: Difficulty,
    questions: Vec<QuestionRecord>,
    created_at: DateTime<Utc>,
    summary: Option<ScoreSummary>,
    completed_at: Option<DateTime<Utc>>,
}

impl QuizAttempt {
    /// Create an unevaluated quiz.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NoQuestions` for an empty list and
    /// `QuizError::DuplicateQuestion` if two questions share an id.
    pub fn new(
        id: QuizId,
        user_id: UserId,
        certification_id: CertificationId,
        difficulty: Difficulty,
        questions: Vec<QuestionRecord>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::NoQuestions);
        }
        let mut seen = HashSet::with_capacity(questions.len());
        for question in &questions {
            if !seen.insert(question.id()) {
                return Err(QuizError::DuplicateQuestion(question.id()));
            }
        }

        Ok(Self {
            id,
            user_id,
            certification_id,
            difficulty,
            questions,
            created_at,
            summary: None,
            completed_at: None,
        })
    }

    /// Validate a generator draft, allocating fresh quiz and question ids.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidQuestion` wrapping the first failing question
    /// (including unknown question types), or `QuizError::NoQuestions`.
    pub fn from_draft(draft: QuizDraft, created_at: DateTime<Utc>) -> Result<Self, QuizError> {
        let questions = draft
            .questions
            .into_iter()
            .enumerate()
            .map(|(index, q)| {
                QuestionRecord::from_draft(QuestionId::generate(), q)
                    .map_err(|source| QuizError::InvalidQuestion { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(
            QuizId::generate(),
            draft.user_id,
            draft.certification_id,
            draft.difficulty,
            questions,
            created_at,
        )
    }

    /// Rehydrate a quiz from storage.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` if the question list is invalid or only one of
    /// `summary`/`completed_at` is present.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: QuizId,
        user_id: UserId,
        certification_id: CertificationId,
        difficulty: Difficulty,
        questions: Vec<QuestionRecord>,
        created_at: DateTime<Utc>,
        summary: Option<ScoreSummary>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Self, QuizError> {
        if summary.is_some() != completed_at.is_some() {
            return Err(QuizError::InconsistentCompletion);
        }
        let mut quiz = Self::new(id, user_id, certification_id, difficulty, questions, created_at)?;
        quiz.summary = summary;
        quiz.completed_at = completed_at;
        Ok(quiz)
    }

    #[must_use]
    pub fn id(&self) -> QuizId {
        self.id
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
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn questions(&self) -> &[QuestionRecord] {
        &self.questions
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn summary(&self) -> Option<ScoreSummary> {
        self.summary
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    #[must_use]
    pub fn question(&self, id: QuestionId) -> Option<&QuestionRecord> {
        self.questions.iter().find(|q| q.id() == id)
    }

    /// Record the evaluation: one outcome per question (in quiz order), the
    /// aggregate score, and the completion time.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::AlreadyEvaluated` if the quiz was completed before, or
    /// `QuizError::OutcomeCountMismatch` if outcomes or totals do not line up
    /// with the question list. The quiz is left untouched on error.
    pub fn complete(
        &mut self,
        outcomes: Vec<QuestionOutcome>,
        summary: ScoreSummary,
        completed_at: DateTime<Utc>,
    ) -> Result<(), QuizError> {
        if self.is_completed() {
            return Err(QuizError::AlreadyEvaluated);
        }
        let expected = self.questions.len();
        if outcomes.len() != expected {
            return Err(QuizError::OutcomeCountMismatch {
                expected,
                got: outcomes.len(),
            });
        }
        if usize::try_from(summary.total).ok() != Some(expected) {
            return Err(QuizError::OutcomeCountMismatch {
                expected,
                got: usize::try_from(summary.total).unwrap_or(usize::MAX),
            });
        }

        for (question, outcome) in self.questions.iter_mut().zip(outcomes) {
            question.set_outcome(outcome);
        }
        self.summary = Some(summary);
        self.completed_at = Some(completed_at);
        Ok(())
    }
}
