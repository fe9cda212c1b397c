use chrono::{DateTime, Utc};
use serde::Serialize;

use quiz_core::model::{AchievementKind, Difficulty, QuestionId, QuizId, SubmittedAnswer};

/// Per-question feedback returned to the learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionResult {
    pub question_id: QuestionId,
    pub is_correct: bool,
    pub user_answer: SubmittedAnswer,
    pub correct_answer: SubmittedAnswer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub xp_earned: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnlockedAchievement {
    #[serde(rename = "type")]
    pub kind: AchievementKind,
    pub name: String,
    pub description: String,
}

impl From<AchievementKind> for UnlockedAchievement {
    fn from(kind: AchievementKind) -> Self {
        Self {
            kind,
            name: kind.display_name().to_owned(),
            description: kind.description().to_owned(),
        }
    }
}

/// Everything the caller learns from one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationResult {
    pub quiz_id: QuizId,
    pub score: u32,
    pub total_questions: u32,
    pub percentage: u32,
    pub xp_earned: u32,
    pub completed_at: DateTime<Utc>,
    pub results: Vec<QuestionResult>,
    pub weak_domains: Vec<String>,
    pub next_difficulty: Difficulty,
    pub newly_unlocked_achievements: Vec<UnlockedAchievement>,
    pub total_xp: u64,
    pub level: u32,
    pub current_streak: u32,
}
