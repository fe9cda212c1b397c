//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{QuestionError, QuestionId, QuizError};
use quiz_core::scoring::ScoreError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `EvaluationService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EvaluationError {
    #[error("quiz not found")]
    QuizNotFound,

    #[error("quiz has already been evaluated")]
    QuizAlreadyEvaluated,

    #[error("no answer submitted for question {0}")]
    MissingAnswer(QuestionId),

    #[error("unknown question type: {0}")]
    UnknownQuestionType(String),

    #[error("quiz has no questions")]
    EmptyQuiz,

    /// Every attempt lost the race against a concurrent evaluation. Safe to retry.
    #[error("evaluation conflicted with concurrent updates {attempts} times")]
    ConcurrentUpdate { attempts: u32 },

    #[error(transparent)]
    Quiz(QuizError),

    #[error(transparent)]
    Score(ScoreError),

    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for EvaluationError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidQuestion(QuestionError::UnknownType(kind)) => {
                EvaluationError::UnknownQuestionType(kind)
            }
            other => EvaluationError::Storage(other),
        }
    }
}

impl From<QuizError> for EvaluationError {
    fn from(err: QuizError) -> Self {
        match err {
            QuizError::AlreadyEvaluated => EvaluationError::QuizAlreadyEvaluated,
            QuizError::NoQuestions => EvaluationError::EmptyQuiz,
            other => EvaluationError::Quiz(other),
        }
    }
}

impl From<ScoreError> for EvaluationError {
    fn from(err: ScoreError) -> Self {
        match err {
            ScoreError::Empty => EvaluationError::EmptyQuiz,
            other => EvaluationError::Score(other),
        }
    }
}

/// Errors emitted by `QuizService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizServiceError {
    #[error("quiz not found")]
    NotFound,
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error("user profile not found")]
    ProfileNotFound,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
