#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod evaluation;
pub mod progress_service;
pub mod quiz_service;

pub use quiz_core::Clock;
pub use storage::sqlite::PoolSettings;

pub use app_services::AppServices;
pub use error::{AppServicesError, EvaluationError, ProgressServiceError, QuizServiceError};
pub use evaluation::{
    DEFAULT_MAX_ATTEMPTS, EvaluationResult, EvaluationService, QuestionResult, UnlockedAchievement,
};
pub use progress_service::{AchievementView, Dashboard, ProgressService, ProgressSummary};
pub use quiz_service::{
    DEFAULT_HISTORY_LIMIT, QuestionDetail, QuizDetail, QuizHistoryItem, QuizService, QuizStats,
};
