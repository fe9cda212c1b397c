//! Score aggregation and XP.

use serde::Serialize;
use thiserror::Error;

use crate::grading::GradedQuestion;
use crate::model::Difficulty;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScoreError {
    #[error("cannot score a quiz with no questions")]
    Empty,

    #[error("score {score} exceeds total {total}")]
    ScoreExceedsTotal { score: u32, total: u32 },

    #[error("quiz has too many questions to score: {len}")]
    TooManyQuestions { len: usize },
}

/// Aggregate result of one evaluated quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreSummary {
    pub score: u32,
    pub total: u32,
    pub percentage: u32,
    pub xp_earned: u32,
}

impl ScoreSummary {
    /// Build a summary, deriving the percentage.
    ///
    /// # Errors
    ///
    /// Returns `ScoreError::Empty` for `total == 0` and
    /// `ScoreError::ScoreExceedsTotal` if `score > total`.
    pub fn new(score: u32, total: u32, xp_earned: u32) -> Result<Self, ScoreError> {
        if total == 0 {
            return Err(ScoreError::Empty);
        }
        if score > total {
            return Err(ScoreError::ScoreExceedsTotal { score, total });
        }
        Ok(Self {
            score,
            total,
            percentage: percentage(score, total),
            xp_earned,
        })
    }
}

/// `round(score / total * 100)` with halves rounding up; 0 when `total == 0`.
#[must_use]
pub fn percentage(score: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let (score, total) = (u64::from(score), u64::from(total));
    let pct = (score * 200 + total) / (total * 2);
    u32::try_from(pct).unwrap_or(u32::MAX)
}

/// XP for one question.
#[must_use]
pub fn xp_for(difficulty: Difficulty, is_correct: bool) -> u32 {
    if is_correct { difficulty.base_xp() } else { 0 }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizScore {
    pub summary: ScoreSummary,
    /// XP per question, in input order.
    pub per_question_xp: Vec<u32>,
}

/// Sum up a graded quiz.
///
/// # Errors
///
/// Returns `ScoreError::Empty` when `graded` is empty.
pub fn aggregate(graded: &[GradedQuestion]) -> Result<QuizScore, ScoreError> {
    let total = u32::try_from(graded.len())
        .map_err(|_| ScoreError::TooManyQuestions { len: graded.len() })?;

    let per_question_xp: Vec<u32> = graded
        .iter()
        .map(|q| xp_for(q.difficulty, q.is_correct))
        .collect();
    let score = graded.iter().filter(|q| q.is_correct).count();
    let score = u32::try_from(score).map_err(|_| ScoreError::TooManyQuestions { len: graded.len() })?;
    let xp_earned = per_question_xp
        .iter()
        .fold(0u32, |acc, xp| acc.saturating_add(*xp));

    Ok(QuizScore {
        summary: ScoreSummary::new(score, total, xp_earned)?,
        per_question_xp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionId;

    fn graded(difficulty: Difficulty, is_correct: bool) -> GradedQuestion {
        GradedQuestion {
            question_id: QuestionId::generate(),
            domain: "General".into(),
            difficulty,
            is_correct,
        }
    }

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(percentage(4, 5), 80);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(0, 7), 0);
        assert_eq!(percentage(7, 7), 100);
    }

    #[test]
    fn empty_quiz_cannot_be_scored() {
        assert_eq!(aggregate(&[]).unwrap_err(), ScoreError::Empty);
    }

    #[test]
    fn medium_quiz_four_of_five() {
        let mut qs: Vec<_> = (0..4).map(|_| graded(Difficulty::Medium, true)).collect();
        qs.push(graded(Difficulty::Medium, false));

        let score = aggregate(&qs).unwrap();
        assert_eq!(
            score.summary,
            ScoreSummary {
                score: 4,
                total: 5,
                percentage: 80,
                xp_earned: 80
            }
        );
        assert_eq!(score.per_question_xp, vec![20, 20, 20, 20, 0]);
    }

    #[test]
    fn xp_uses_each_question_tier() {
        let qs = [
            graded(Difficulty::Easy, true),
            graded(Difficulty::Hard, true),
            graded(Difficulty::Hard, false),
        ];
        let score = aggregate(&qs).unwrap();
        assert_eq!(score.summary.xp_earned, 40);
        assert_eq!(score.summary.percentage, 67);
    }

    #[test]
    fn summary_rejects_score_above_total() {
        assert_eq!(
            ScoreSummary::new(3, 2, 0),
            Err(ScoreError::ScoreExceedsTotal { score: 3, total: 2 })
        );
    }
}
