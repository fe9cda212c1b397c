mod plan;
mod service;
mod view;

// Public API of the evaluation subsystem.
pub use crate::error::EvaluationError;
pub use service::{DEFAULT_MAX_ATTEMPTS, EvaluationService};
pub use view::{EvaluationResult, QuestionResult, UnlockedAchievement};
