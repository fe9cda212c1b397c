use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::grading::parse_bool;
use crate::model::ids::QuestionId;
use crate::model::question::{QuestionError, QuestionType};

//
// ─── ANSWER KEY ────────────────────────────────────────────────────────────────
//

/// Reference answer of a question. The variant doubles as the question type,
/// so grading can match every supported type exhaustively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerKey {
    SingleSelect(String),
    MultiSelect(Vec<String>),
    TrueFalse(bool),
}

impl AnswerKey {
    #[must_use]
    pub fn question_type(&self) -> QuestionType {
        match self {
            AnswerKey::SingleSelect(_) => QuestionType::SingleSelect,
            AnswerKey::MultiSelect(_) => QuestionType::MultiSelect,
            AnswerKey::TrueFalse(_) => QuestionType::TrueFalse,
        }
    }

    /// Build a key from the raw `(question_type, correct_answer)` pair produced by
    /// the quiz generator or read back from storage.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::UnknownType` for an unsupported type string and
    /// `QuestionError::MalformedKey` when the answer does not fit the type.
    pub fn from_parts(question_type: &str, raw: &Value) -> Result<Self, QuestionError> {
        let kind: QuestionType = question_type.parse()?;
        let malformed = |reason: &'static str| QuestionError::MalformedKey {
            question_type: kind,
            reason,
        };

        match kind {
            QuestionType::SingleSelect => match raw {
                Value::String(s) if !s.trim().is_empty() => Ok(AnswerKey::SingleSelect(s.clone())),
                _ => Err(malformed("expected a non-empty string")),
            },
            QuestionType::MultiSelect => {
                let Value::Array(items) = raw else {
                    return Err(malformed("expected a list of strings"));
                };
                let mut choices = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(s) if !s.trim().is_empty() => choices.push(s.clone()),
                        _ => return Err(malformed("expected a list of strings")),
                    }
                }
                if choices.is_empty() {
                    return Err(malformed("expected at least one correct choice"));
                }
                Ok(AnswerKey::MultiSelect(choices))
            }
            QuestionType::TrueFalse => {
                let flag = match raw {
                    Value::Bool(b) => Some(*b),
                    Value::String(s) => parse_bool(s),
                    Value::Number(n) => match n.as_u64() {
                        Some(0) => Some(false),
                        Some(1) => Some(true),
                        _ => None,
                    },
                    _ => None,
                };
                flag.map(AnswerKey::TrueFalse)
                    .ok_or_else(|| malformed("expected a boolean"))
            }
        }
    }

    /// JSON form stored alongside the question type.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            AnswerKey::SingleSelect(s) => Value::String(s.clone()),
            AnswerKey::MultiSelect(choices) => {
                Value::Array(choices.iter().cloned().map(Value::String).collect())
            }
            AnswerKey::TrueFalse(b) => Value::Bool(*b),
        }
    }

    /// The key expressed in the same shape a learner would submit.
    #[must_use]
    pub fn expected(&self) -> SubmittedAnswer {
        match self {
            AnswerKey::SingleSelect(s) => SubmittedAnswer::Text(s.clone()),
            AnswerKey::MultiSelect(choices) => SubmittedAnswer::Choices(choices.clone()),
            AnswerKey::TrueFalse(b) => SubmittedAnswer::Flag(*b),
        }
    }
}

//
// ─── SUBMITTED ANSWER ──────────────────────────────────────────────────────────
//

/// A learner's raw answer. Shape depends on what the client sent, not on the
/// question type; mismatches are graded as incorrect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubmittedAnswer {
    Flag(bool),
    Text(String),
    Choices(Vec<String>),
    /// Any other JSON (numbers, objects, mixed lists), kept verbatim.
    Other(Value),
}

/// Answers keyed by question id, as submitted for one quiz.
pub type SubmittedAnswers = HashMap<QuestionId, SubmittedAnswer>;
