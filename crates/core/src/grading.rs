//! Answer grading.
//!
//! Grading is pure and infallible: malformed but present input is simply
//! incorrect. Absent answers are the caller's concern.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::model::{AnswerKey, Difficulty, QuestionId, QuestionRecord, SubmittedAnswer};

/// Parse the loose boolean spellings accepted for true/false questions.
#[must_use]
pub fn parse_bool(raw: &str) -> Option<bool> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("true") || raw == "1" {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") || raw == "0" {
        Some(false)
    } else {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeResult {
    pub is_correct: bool,
    pub normalized_answer: SubmittedAnswer,
}

/// Per-question input to scoring and domain analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradedQuestion {
    pub question_id: QuestionId,
    pub domain: String,
    pub difficulty: Difficulty,
    pub is_correct: bool,
}

impl GradedQuestion {
    #[must_use]
    pub fn new(question: &QuestionRecord, is_correct: bool) -> Self {
        Self {
            question_id: question.id(),
            domain: question.domain().to_owned(),
            difficulty: question.difficulty(),
            is_correct,
        }
    }
}

fn fold(s: &str) -> String {
    s.trim().to_lowercase()
}

fn choice_set<'a>(items: impl IntoIterator<Item = &'a String>) -> BTreeSet<String> {
    items.into_iter().map(|s| fold(s)).collect()
}

/// Grade one submitted answer against its key.
#[must_use]
pub fn grade(key: &AnswerKey, submitted: &SubmittedAnswer) -> GradeResult {
    match key {
        AnswerKey::SingleSelect(expected) => match submitted {
            SubmittedAnswer::Text(text) => {
                let trimmed = text.trim();
                GradeResult {
                    is_correct: fold(trimmed) == fold(expected),
                    normalized_answer: SubmittedAnswer::Text(trimmed.to_owned()),
                }
            }
            other => GradeResult {
                is_correct: false,
                normalized_answer: other.clone(),
            },
        },

        AnswerKey::MultiSelect(expected) => {
            let given: Vec<String> = match submitted {
                SubmittedAnswer::Choices(items) => items.clone(),
                SubmittedAnswer::Text(text) => vec![text.clone()],
                SubmittedAnswer::Flag(_) | SubmittedAnswer::Other(_) => {
                    return GradeResult {
                        is_correct: false,
                        normalized_answer: submitted.clone(),
                    };
                }
            };
            let normalized: BTreeSet<String> = given
                .iter()
                .map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty())
                .collect();
            GradeResult {
                is_correct: choice_set(&normalized) == choice_set(expected),
                normalized_answer: SubmittedAnswer::Choices(normalized.into_iter().collect()),
            }
        }

        AnswerKey::TrueFalse(expected) => {
            let parsed = match submitted {
                SubmittedAnswer::Flag(flag) => Some(*flag),
                SubmittedAnswer::Text(text) => parse_bool(text),
                SubmittedAnswer::Other(Value::Number(n)) => match n.as_u64() {
                    Some(0) => Some(false),
                    Some(1) => Some(true),
                    _ => None,
                },
                SubmittedAnswer::Choices(_) | SubmittedAnswer::Other(_) => None,
            };
            match parsed {
                Some(flag) => GradeResult {
                    is_correct: flag == *expected,
                    normalized_answer: SubmittedAnswer::Flag(flag),
                },
                None => GradeResult {
                    is_correct: false,
                    normalized_answer: submitted.clone(),
                },
            }
        }
    }
}
