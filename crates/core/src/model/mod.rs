mod achievement;
mod answer;
mod ids;
mod profile;
mod progress;
mod question;
mod quiz;
mod tier;

pub use ids::{CertificationId, ParseIdError, QuestionId, QuizId, UserId};
pub use tier::{Difficulty, ParseDifficultyError};

pub use achievement::{Achievement, AchievementKind, ParseAchievementKindError};
pub use answer::{AnswerKey, SubmittedAnswer, SubmittedAnswers};
pub use profile::{UserProfile, XP_PER_LEVEL, level_for_xp, next_streak};
pub use progress::{ProgressError, UserProgress};
pub use question::{QuestionDraft, QuestionError, QuestionOutcome, QuestionRecord, QuestionType};
pub use quiz::{QuizAttempt, QuizDraft, QuizError};
